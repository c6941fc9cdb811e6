//! Application layer for the OneCrew messaging session.
//!
//! This crate owns the real-time session lifecycle: the connection session
//! manager, the diagnostic connection monitor, and the profile-switch
//! orchestrator that sequences identity changes through the manager.
//!
//! # Wiring
//!
//! ```ignore
//! let monitor = Arc::new(ConnectionMonitor::new(config.effective_monitor_capacity()));
//! let session = ConnectionSessionManager::new(provider, &config).with_observer(monitor.clone());
//! let switcher = ProfileSwitchOrchestrator::new(session.clone(), tokens, &config);
//! ```

pub mod monitor;
pub mod profile_switch;
pub mod session;

pub use monitor::{ConnectionEvent, ConnectionEventType, ConnectionMonitor, MonitorSnapshot};
pub use profile_switch::{ProfileSwitchOrchestrator, SwitchReport, SwitchTarget};
pub use session::{
    ConnectRequest, ConnectionObserver, ConnectionSessionManager, ConnectionState, SessionStatus,
};
