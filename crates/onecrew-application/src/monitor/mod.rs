//! Connection diagnostics.
//!
//! The monitor is a read-only observer of the session manager and of the
//! provider client's event stream. It keeps a bounded, timestamped event log
//! for answering "which identity is the session attached to, and how did it
//! get there".
//!
//! # Module Structure
//!
//! - `event`: `ConnectionEvent` and its fixed `ConnectionEventType` vocabulary
//! - `event_log`: The bounded ring buffer
//! - `connection_monitor`: `ConnectionMonitor`, the observer implementation

mod connection_monitor;
mod event;
mod event_log;

pub use connection_monitor::{ConnectionMonitor, MonitorExport, MonitorSnapshot};
pub use event::{ConnectionEvent, ConnectionEventType};
pub use event_log::EventLog;
