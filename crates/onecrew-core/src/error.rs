//! Error types for the OneCrew messaging core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the messaging session layer.
///
/// The type is `Clone` because a single connect outcome is delivered to every
/// caller that was coalesced onto the same in-flight attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatError {
    /// No usable provider credential (API key) could be resolved.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The provider rejected or failed the connect request.
    #[error("Connect failed: {message}")]
    Connect { message: String },

    /// The provider failed to tear down the active session.
    #[error("Disconnect failed: {message}")]
    Disconnect { message: String },

    /// The backend token endpoint failed.
    #[error("Token provider error: {0}")]
    TokenProvider(String),

    /// Any other error reported by the provider client.
    #[error("Provider error: {0}")]
    Provider(String),

    /// The identity bound to the session is not the one that was requested.
    #[error("Identity mismatch: expected '{expected}', got '{actual}'")]
    IdentityMismatch { expected: String, actual: String },

    /// IO error (configuration file access)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON"
        message: String,
    },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a Connect error
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
        }
    }

    /// Creates a Disconnect error
    pub fn disconnect(message: impl Into<String>) -> Self {
        Self::Disconnect {
            message: message.into(),
        }
    }

    /// Creates a TokenProvider error
    pub fn token_provider(message: impl Into<String>) -> Self {
        Self::TokenProvider(message.into())
    }

    /// Creates a Provider error
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }

    /// Creates an IdentityMismatch error
    pub fn identity_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::IdentityMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is a connect failure
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Connect { .. })
    }

    /// Check if this is a disconnect failure
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Disconnect { .. })
    }

    /// Check if this is an identity mismatch
    pub fn is_identity_mismatch(&self) -> bool {
        matches!(self, Self::IdentityMismatch { .. })
    }

    /// Whether a whole operation may reasonably be attempted again.
    ///
    /// Configuration errors and identity mismatches are deterministic and
    /// will fail the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::TokenProvider(_) | Self::Provider(_) | Self::Io { .. }
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ChatError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ChatError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for ChatError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Serialization {
                format: "JSON".to_string(),
                message: err.to_string(),
            }
        } else {
            Self::TokenProvider(err.to_string())
        }
    }
}

/// Conversion from anyhow::Error, used at the application edge
impl From<anyhow::Error> for ChatError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, ChatError>`.
pub type Result<T> = std::result::Result<T, ChatError>;
