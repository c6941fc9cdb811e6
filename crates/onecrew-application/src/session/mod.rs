//! Real-time session services.
//!
//! This module contains the connection session manager and the types it
//! exposes to observers and callers.

mod manager;
mod observer;
mod request;
mod state;

pub use manager::ConnectionSessionManager;
pub use observer::ConnectionObserver;
pub use request::ConnectRequest;
pub use state::{ConnectionState, SessionStatus};

pub(crate) use observer::ObserverSet;
