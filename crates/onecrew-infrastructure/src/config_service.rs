//! Configuration service.
//!
//! Loads [`ChatConfig`] from `config.toml` (see [`OneCrewPaths`]), applies
//! environment overrides, and caches the result.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use onecrew_core::config::ChatConfig;
use onecrew_core::error::Result;

use crate::paths::OneCrewPaths;
use crate::storage::TomlFile;

const LOG_TARGET: &str = "chat_config";

/// Overrides `fallback_api_key`.
pub const ENV_API_KEY: &str = "ONECREW_CHAT_API_KEY";
/// Overrides `api_base_url`.
pub const ENV_API_BASE_URL: &str = "ONECREW_API_BASE_URL";
/// Overrides `log_level`.
pub const ENV_LOG_LEVEL: &str = "ONECREW_LOG_LEVEL";

/// Loads and caches the messaging configuration.
#[derive(Clone)]
pub struct ConfigService {
    file: Arc<TomlFile<ChatConfig>>,
    cache: Arc<RwLock<Option<ChatConfig>>>,
}

impl ConfigService {
    /// A service backed by the platform config file.
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(OneCrewPaths::config_file()?))
    }

    /// A service backed by an explicit file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Arc::new(TomlFile::new(path)),
            cache: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Returns the effective configuration, loading it on first access.
    ///
    /// A missing file yields defaults; environment overrides are applied on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn get_config(&self) -> Result<ChatConfig> {
        if let Some(cached) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(cached.clone());
        }

        let loaded = self.load_uncached()?;
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = Some(loaded.clone());
        Ok(loaded)
    }

    /// Persists `config` and refreshes the cache.
    ///
    /// What is written is exactly `config`; environment overrides are not
    /// baked into the file.
    pub fn save(&self, config: &ChatConfig) -> Result<()> {
        self.file.save(config)?;
        tracing::info!(target: LOG_TARGET, "Saved config to {}", self.path().display());
        self.invalidate_cache();
        Ok(())
    }

    /// Forces the next [`get_config`](Self::get_config) to re-read the file.
    pub fn invalidate_cache(&self) {
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn load_uncached(&self) -> Result<ChatConfig> {
        let mut config = match self.file.load()? {
            Some(config) => config,
            None => {
                tracing::debug!(
                    target: LOG_TARGET,
                    "No config at {}, using defaults",
                    self.path().display()
                );
                ChatConfig::default()
            }
        };
        apply_env_overrides(&mut config, |name| std::env::var(name).ok());
        Ok(config)
    }
}

/// Applies `ONECREW_*` overrides read through `lookup`. Empty values are ignored.
pub fn apply_env_overrides(config: &mut ChatConfig, lookup: impl Fn(&str) -> Option<String>) {
    let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    if let Some(api_key) = lookup(ENV_API_KEY) {
        config.fallback_api_key = Some(api_key);
    }
    if let Some(url) = lookup(ENV_API_BASE_URL) {
        config.api_base_url = Some(url);
    }
    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        config.log_level = level;
    }
}
