use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed vocabulary of recorded connection events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionEventType {
    ConnectCalled,
    ConnectSucceeded,
    ConnectFailed,
    DisconnectCalled,
    DisconnectSucceeded,
    DisconnectFailed,
    ProviderStateChanged,
    ProviderRecovered,
    ProviderError,
    ProfileSwitch,
}

impl ConnectionEventType {
    /// Error-class events carry a stack trace when one can be captured.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ConnectionEventType::ConnectFailed
                | ConnectionEventType::DisconnectFailed
                | ConnectionEventType::ProviderError
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionEventType::ConnectCalled => "connect-called",
            ConnectionEventType::ConnectSucceeded => "connect-succeeded",
            ConnectionEventType::ConnectFailed => "connect-failed",
            ConnectionEventType::DisconnectCalled => "disconnect-called",
            ConnectionEventType::DisconnectSucceeded => "disconnect-succeeded",
            ConnectionEventType::DisconnectFailed => "disconnect-failed",
            ConnectionEventType::ProviderStateChanged => "provider-state-changed",
            ConnectionEventType::ProviderRecovered => "provider-recovered",
            ConnectionEventType::ProviderError => "provider-error",
            ConnectionEventType::ProfileSwitch => "profile-switch",
        }
    }
}

impl std::fmt::Display for ConnectionEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEvent {
    /// Monotonic per-monitor sequence number.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: ConnectionEventType,
    pub details: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}
