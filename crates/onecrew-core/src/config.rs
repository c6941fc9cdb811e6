//! Messaging configuration model.

use serde::{Deserialize, Serialize};

use crate::identity::{DEFAULT_ID_PREFIX, IdentityTranslator};

/// Default bound of the connection event log.
pub const DEFAULT_MONITOR_CAPACITY: usize = 100;

/// Configuration for the real-time messaging session.
///
/// Every field has a default so a partial (or missing) config file is valid.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// API key used when the backend token response omits one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_api_key: Option<String>,
    /// Namespace prefix for provider user ids and channel ids.
    pub id_prefix: String,
    /// Number of connection events kept by the monitor.
    pub monitor_capacity: usize,
    /// Backend REST root used by the HTTP token provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    /// Path of the token endpoint, relative to `api_base_url`.
    pub token_path: String,
    pub request_timeout_secs: u64,
    /// Full attempts the profile switch makes before giving up.
    pub switch_attempts: u32,
    pub log_level: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            fallback_api_key: None,
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
            monitor_capacity: DEFAULT_MONITOR_CAPACITY,
            api_base_url: None,
            token_path: "/chat/token".to_string(),
            request_timeout_secs: 15,
            switch_attempts: 1,
            log_level: "info".to_string(),
        }
    }
}

impl ChatConfig {
    /// A translator using the configured prefix.
    pub fn translator(&self) -> IdentityTranslator {
        IdentityTranslator::new(self.id_prefix.clone())
    }

    /// Monitor capacity, never below one.
    pub fn effective_monitor_capacity(&self) -> usize {
        self.monitor_capacity.max(1)
    }

    /// Switch attempts, never below one.
    pub fn effective_switch_attempts(&self) -> u32 {
        self.switch_attempts.max(1)
    }

    /// A copy safe to print: the fallback key is masked.
    pub fn redacted(&self) -> Self {
        Self {
            fallback_api_key: self.fallback_api_key.as_ref().map(|_| "***".to_string()),
            ..self.clone()
        }
    }
}

impl std::fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted = self.redacted();
        f.debug_struct("ChatConfig")
            .field("fallback_api_key", &redacted.fallback_api_key)
            .field("id_prefix", &self.id_prefix)
            .field("monitor_capacity", &self.monitor_capacity)
            .field("api_base_url", &self.api_base_url)
            .field("token_path", &self.token_path)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("switch_attempts", &self.switch_attempts)
            .field("log_level", &self.log_level)
            .finish()
    }
}
