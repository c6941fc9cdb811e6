//! Infrastructure adapters for the OneCrew messaging session.
//!
//! # Module Structure
//!
//! - [`paths`]: Platform configuration directory resolution
//! - [`storage`]: Atomic TOML file access
//! - [`config_service`]: Cached configuration loading with environment overrides
//! - [`http_token_provider`]: Backend token endpoint client
//! - [`logging`]: `tracing` subscriber setup

pub mod config_service;
pub mod http_token_provider;
pub mod logging;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::http_token_provider::HttpTokenProvider;
pub use crate::paths::OneCrewPaths;
