//! Messaging provider seam.
//!
//! The wire protocol belongs to the external provider SDK. This module only
//! describes the surface the session layer drives: create a client for an API
//! key, connect/disconnect a user on it, and follow its event stream.
//!
//! # Module Structure
//!
//! - `client`: `ChatProvider` and `ProviderClient` traits
//! - `event`: `ProviderEvent` emitted by a client
//! - `profile`: `ProfileData` presented to the provider on connect

mod client;
mod event;
mod profile;

// Re-export public API
pub use client::{ChatProvider, ProviderClient};
pub use event::ProviderEvent;
pub use profile::ProfileData;
