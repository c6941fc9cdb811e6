//! Domain layer for the OneCrew real-time messaging session.
//!
//! Holds the identity translator, the configuration model, the shared error
//! type and the traits the session layer uses to reach the provider SDK and
//! the backend token endpoint.

pub mod config;
pub mod error;
pub mod identity;
pub mod provider;
pub mod token;

// Re-export common error type
pub use error::{ChatError, Result};
