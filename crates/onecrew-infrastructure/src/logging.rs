//! `tracing` subscriber setup.

use tracing_subscriber::EnvFilter;

/// Installs a global fmt subscriber filtered at `level`.
///
/// `RUST_LOG`, when set, takes precedence over `level`. Calling this again
/// after a subscriber is installed does nothing.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
