use onecrew_core::identity::AttachedIdentity;
use serde::{Deserialize, Serialize};

/// Lifecycle state of the real-time session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Point-in-time view of the session, safe to hand to observers and the UI.
///
/// Credentials are never included; only whether one is configured.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionStatus {
    pub state: ConnectionState,
    pub attached: Option<AttachedIdentity>,
    /// Whether an API key is bound to the session or available as fallback.
    pub api_key_configured: bool,
    pub has_client: bool,
    /// The user id the provider client itself reports.
    pub client_user_id: Option<String>,
    pub connect_in_flight: bool,
}

impl SessionStatus {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}
