use onecrew_core::identity::ParticipantKind;
use onecrew_core::provider::ProfileData;

/// Parameters of a connect call.
///
/// `provider_user_id` and `token` come from the backend token response.
#[derive(Clone)]
pub struct ConnectRequest {
    pub provider_user_id: String,
    pub token: String,
    pub profile: ProfileData,
    pub api_key: Option<String>,
    /// Inferred from `provider_user_id` when absent.
    pub kind: Option<ParticipantKind>,
}

impl ConnectRequest {
    pub fn new(provider_user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            provider_user_id: provider_user_id.into(),
            token: token.into(),
            profile: ProfileData::default(),
            api_key: None,
            kind: None,
        }
    }

    pub fn with_profile(mut self, profile: ProfileData) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_kind(mut self, kind: ParticipantKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

impl std::fmt::Debug for ConnectRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectRequest")
            .field("provider_user_id", &self.provider_user_id)
            .field("token", &"<redacted>")
            .field("profile", &self.profile)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("kind", &self.kind)
            .finish()
    }
}
