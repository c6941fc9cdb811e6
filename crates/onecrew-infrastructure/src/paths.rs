//! Path resolution for OneCrew configuration files.
//!
//! ```text
//! <config_dir>/onecrew/     # e.g. ~/.config/onecrew on Linux
//! └── config.toml           # Messaging configuration
//! ```

use std::path::PathBuf;

use onecrew_core::error::{ChatError, Result};

const APP_DIR: &str = "onecrew";
const CONFIG_FILE: &str = "config.toml";

pub struct OneCrewPaths;

impl OneCrewPaths {
    /// Returns the OneCrew configuration directory.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the platform has no config directory
    /// (for example, no home directory is set).
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| ChatError::config("cannot determine the platform config directory"))
    }

    /// Returns the path to `config.toml`.
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// `config.toml` inside `base`, for callers (and tests) that relocate storage.
    pub fn config_file_in(base: impl Into<PathBuf>) -> PathBuf {
        base.into().join(CONFIG_FILE)
    }
}
