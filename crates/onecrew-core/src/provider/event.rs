use serde::{Deserialize, Serialize};

/// Events emitted by a provider client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProviderEvent {
    /// `connection.changed`
    #[serde(rename = "connection.changed")]
    ConnectionChanged { online: bool },
    /// `connection.recovered`
    #[serde(rename = "connection.recovered")]
    ConnectionRecovered,
    /// `error`
    #[serde(rename = "error")]
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
    },
}

impl ProviderEvent {
    /// The provider's own event name.
    pub fn name(&self) -> &'static str {
        match self {
            ProviderEvent::ConnectionChanged { .. } => "connection.changed",
            ProviderEvent::ConnectionRecovered => "connection.recovered",
            ProviderEvent::Error { .. } => "error",
        }
    }
}
