//! Token provider trait.
//!
//! Defines the interface to the backend that issues messaging credentials for
//! a domain identity. Issuance policy is owned by the backend.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::identity::DomainIdentity;

/// Credentials issued by the backend for one identity.
///
/// `provider_user_id` is trusted as-is; the session layer never derives it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCredentials {
    pub token: String,
    pub provider_user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for ChatCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCredentials")
            .field("token", &"<redacted>")
            .field("provider_user_id", &self.provider_user_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Service issuing messaging credentials.
///
/// # Security Note
///
/// Implementations must not log tokens or API keys.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Requests a fresh token for `identity`.
    ///
    /// # Errors
    ///
    /// Returns a `TokenProvider` error if the backend call fails.
    async fn issue_token(&self, identity: &DomainIdentity) -> Result<ChatCredentials>;
}
