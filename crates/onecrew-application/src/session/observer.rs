use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};

use onecrew_core::provider::ProviderEvent;
use serde_json::Value;
use tokio::sync::broadcast;

use super::SessionStatus;
use crate::monitor::ConnectionEventType;

/// Read-only observer of the session manager.
///
/// Implementations must not call back into the manager's connect or
/// disconnect from these hooks. A panic inside a hook is caught and dropped.
pub trait ConnectionObserver: Send + Sync {
    /// A lifecycle event at one of the manager's call sites.
    fn on_event(&self, event_type: ConnectionEventType, details: Value);

    /// The session state after a transition.
    fn on_status(&self, _status: &SessionStatus) {}

    /// A new provider client handle was created; `events` is its stream.
    fn on_client(&self, _events: broadcast::Receiver<ProviderEvent>) {}
}

/// Registered observers, each call wrapped in its own panic boundary.
#[derive(Default)]
pub(crate) struct ObserverSet {
    observers: RwLock<Vec<Arc<dyn ConnectionObserver>>>,
}

impl ObserverSet {
    pub(crate) fn add(&self, observer: Arc<dyn ConnectionObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    pub(crate) fn len(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn event(&self, event_type: ConnectionEventType, details: Value) {
        self.each(|observer| observer.on_event(event_type, details.clone()));
    }

    pub(crate) fn status(&self, status: &SessionStatus) {
        self.each(|observer| observer.on_status(status));
    }

    pub(crate) fn client(&self, events: &broadcast::Receiver<ProviderEvent>) {
        self.each(|observer| observer.on_client(events.resubscribe()));
    }

    fn each(&self, f: impl Fn(&dyn ConnectionObserver)) {
        // Snapshot the list so a hook never runs under the registry lock.
        let observers: Vec<Arc<dyn ConnectionObserver>> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for observer in observers {
            if catch_unwind(AssertUnwindSafe(|| f(observer.as_ref()))).is_err() {
                tracing::warn!(target: "chat_monitor", "Connection observer panicked; event dropped");
            }
        }
    }
}
