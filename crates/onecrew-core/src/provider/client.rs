use std::sync::Arc;

use tokio::sync::broadcast;

use super::{ProfileData, ProviderEvent};
use crate::error::Result;

/// Factory for provider client handles.
///
/// A handle is bound to one API key for its whole life; the session layer
/// asks for a new one whenever the key changes.
pub trait ChatProvider: Send + Sync {
    /// Creates a client bound to `api_key`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the key is rejected locally.
    fn create_client(&self, api_key: &str) -> Result<Arc<dyn ProviderClient>>;
}

/// A live provider client handle.
#[async_trait::async_trait]
pub trait ProviderClient: Send + Sync {
    /// The API key this handle was created with.
    fn api_key(&self) -> &str;

    /// Opens a session for `user_id` using a backend-issued `token`.
    async fn connect_user(&self, user_id: &str, token: &str, profile: &ProfileData) -> Result<()>;

    /// Tears down the active session, if any.
    async fn disconnect_user(&self) -> Result<()>;

    /// The user id the client itself reports as connected.
    fn user_id(&self) -> Option<String>;

    /// Subscribes to the client's connection events.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}
