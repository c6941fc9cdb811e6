use std::backtrace::{Backtrace, BacktraceStatus};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use onecrew_core::config::DEFAULT_MONITOR_CAPACITY;
use onecrew_core::provider::ProviderEvent;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use super::{ConnectionEvent, ConnectionEventType, EventLog};
use crate::session::{ConnectionObserver, SessionStatus};

const LOG_TARGET: &str = "chat_monitor";

/// Point-in-time diagnostic view of the session and the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub captured_at: DateTime<Utc>,
    /// Last status published by the session manager.
    pub session: SessionStatus,
    /// Last `connection.changed` value seen from the provider.
    pub provider_online: Option<bool>,
    pub event_count: usize,
    pub capacity: usize,
    pub total_recorded: u64,
    pub evicted: u64,
    pub last_event_at: Option<DateTime<Utc>>,
}

/// Full diagnostic dump, as produced by [`ConnectionMonitor::export_json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorExport {
    pub snapshot: MonitorSnapshot,
    pub events: Vec<ConnectionEvent>,
}

struct MonitorState {
    log: EventLog,
    next_sequence: u64,
    session: SessionStatus,
    provider_online: Option<bool>,
}

impl MonitorState {
    fn record(&mut self, event_type: ConnectionEventType, details: Value, stack_trace: Option<String>) {
        let stack_trace = stack_trace.or_else(|| {
            if event_type.is_error() {
                capture_stack()
            } else {
                None
            }
        });

        let event = ConnectionEvent {
            sequence: self.next_sequence,
            timestamp: Utc::now(),
            event_type,
            details,
            stack_trace,
        };
        self.next_sequence += 1;
        self.log.push(event);
    }

    fn record_provider_event(&mut self, event: ProviderEvent) {
        match event {
            ProviderEvent::ConnectionChanged { online } => {
                self.provider_online = Some(online);
                self.record(
                    ConnectionEventType::ProviderStateChanged,
                    json!({ "online": online }),
                    None,
                );
            }
            ProviderEvent::ConnectionRecovered => {
                self.provider_online = Some(true);
                self.record(ConnectionEventType::ProviderRecovered, json!({}), None);
            }
            ProviderEvent::Error { message, stack } => {
                self.record(
                    ConnectionEventType::ProviderError,
                    json!({ "message": message }),
                    stack,
                );
            }
        }
    }
}

fn capture_stack() -> Option<String> {
    let backtrace = Backtrace::capture();
    match backtrace.status() {
        BacktraceStatus::Captured => Some(backtrace.to_string()),
        _ => None,
    }
}

/// Read-only diagnostic observer of the messaging session.
///
/// Register it on the session manager with
/// [`ConnectionSessionManager::with_observer`](crate::ConnectionSessionManager::with_observer).
/// Nothing here can fail outward: recording and querying never return errors
/// and never block the session beyond a short in-memory lock.
#[derive(Clone)]
pub struct ConnectionMonitor {
    state: Arc<Mutex<MonitorState>>,
}

impl ConnectionMonitor {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(MonitorState {
                log: EventLog::new(capacity),
                next_sequence: 0,
                session: SessionStatus::default(),
                provider_online: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records an event directly.
    pub fn record(&self, event_type: ConnectionEventType, details: Value) {
        self.lock().record(event_type, details, None);
    }

    /// The most recent `n` events, oldest first. Never more than the capacity.
    pub fn recent_events(&self, n: usize) -> Vec<ConnectionEvent> {
        self.lock().log.recent(n)
    }

    pub fn events_by_type(&self, event_type: ConnectionEventType) -> Vec<ConnectionEvent> {
        self.lock().log.by_type(event_type)
    }

    pub fn capacity(&self) -> usize {
        self.lock().log.capacity()
    }

    pub fn clear(&self) {
        self.lock().log.clear();
    }

    pub fn state_snapshot(&self) -> MonitorSnapshot {
        let state = self.lock();
        MonitorSnapshot {
            captured_at: Utc::now(),
            session: state.session.clone(),
            provider_online: state.provider_online,
            event_count: state.log.len(),
            capacity: state.log.capacity(),
            total_recorded: state.log.total_recorded(),
            evicted: state.log.evicted(),
            last_event_at: state.log.last().map(|event| event.timestamp),
        }
    }

    /// Snapshot plus every retained event.
    pub fn export(&self) -> MonitorExport {
        let snapshot = self.state_snapshot();
        let events = self.lock().log.recent(usize::MAX);
        MonitorExport { snapshot, events }
    }

    /// [`export`](Self::export) as pretty-printed JSON; `"{}"` if serialization fails.
    pub fn export_json(&self) -> String {
        match serde_json::to_string_pretty(&self.export()) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(target: LOG_TARGET, "Failed to export connection log: {}", err);
                "{}".to_string()
            }
        }
    }

    /// Follows a provider client's event stream until it closes.
    fn follow(&self, mut events: broadcast::Receiver<ProviderEvent>) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    "No async runtime; provider events will not be recorded"
                );
                return;
            }
        };

        let state = Arc::clone(&self.state);
        handle.spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        tracing::debug!(target: LOG_TARGET, "Provider event: {}", event.name());
                        state
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .record_provider_event(event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            target: LOG_TARGET,
                            "Monitor lagged behind provider stream; {} events dropped",
                            skipped
                        );
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::debug!(target: LOG_TARGET, "Provider event stream closed");
        });
    }
}

impl Default for ConnectionMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_MONITOR_CAPACITY)
    }
}

impl ConnectionObserver for ConnectionMonitor {
    fn on_event(&self, event_type: ConnectionEventType, details: Value) {
        self.lock().record(event_type, details, None);
    }

    fn on_status(&self, status: &SessionStatus) {
        self.lock().session = status.clone();
    }

    fn on_client(&self, events: broadcast::Receiver<ProviderEvent>) {
        self.follow(events);
    }
}
