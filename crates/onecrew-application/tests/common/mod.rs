#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use onecrew_application::{
    ConnectionEventType, ConnectionMonitor, ConnectionObserver, ConnectionSessionManager,
    SessionStatus,
};
use onecrew_core::config::ChatConfig;
use onecrew_core::error::{ChatError, Result};
use onecrew_core::identity::{DomainIdentity, to_provider_user_id};
use onecrew_core::provider::{ChatProvider, ProfileData, ProviderClient, ProviderEvent};
use onecrew_core::token::{ChatCredentials, TokenProvider};
use serde_json::Value;
use tokio::sync::broadcast;

/// Shared knobs and counters for the mock provider and token issuer.
#[derive(Default)]
pub struct Behaviour {
    pub clients_created: AtomicUsize,
    pub connect_calls: AtomicUsize,
    pub disconnect_calls: AtomicUsize,
    pub token_calls: AtomicUsize,
    /// Number of upcoming connects that fail.
    pub failing_connects: AtomicUsize,
    /// Number of upcoming token requests that fail.
    pub failing_tokens: AtomicUsize,
    pub fail_disconnect: AtomicBool,
    pub connect_delay_ms: AtomicU64,
    pub disconnect_delay_ms: AtomicU64,
    /// When set, `connect_user` panics after recording the call.
    pub panic_on_connect: AtomicBool,
    /// When set, the client reports this user id instead of the requested one.
    pub reported_user_override: Mutex<Option<String>>,
    /// Ordered record of provider and token calls.
    pub calls: Mutex<Vec<String>>,
}

impl Behaviour {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn push_call(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        self.connect_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_disconnect_delay(&self, delay: Duration) {
        self.disconnect_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

pub struct MockClient {
    api_key: String,
    behaviour: Arc<Behaviour>,
    user: Mutex<Option<String>>,
    events: broadcast::Sender<ProviderEvent>,
}

impl MockClient {
    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl ProviderClient for MockClient {
    fn api_key(&self) -> &str {
        &self.api_key
    }

    async fn connect_user(&self, user_id: &str, _token: &str, _profile: &ProfileData) -> Result<()> {
        self.behaviour.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.behaviour.push_call(format!("connect:{}", user_id));
        if self.behaviour.panic_on_connect.load(Ordering::SeqCst) {
            panic!("provider SDK crashed while connecting {}", user_id);
        }

        let delay = self.behaviour.connect_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if Behaviour::take_failure(&self.behaviour.failing_connects) {
            return Err(ChatError::connect("network unreachable"));
        }

        let reported = self
            .behaviour
            .reported_user_override
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| user_id.to_string());
        *self.user.lock().unwrap() = Some(reported);
        self.emit(ProviderEvent::ConnectionChanged { online: true });
        Ok(())
    }

    async fn disconnect_user(&self) -> Result<()> {
        self.behaviour.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.behaviour.disconnect_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        let user = self.user.lock().unwrap().take();
        self.behaviour
            .push_call(format!("disconnect:{}", user.unwrap_or_default()));

        if self.behaviour.fail_disconnect.load(Ordering::SeqCst) {
            return Err(ChatError::disconnect("socket already closed"));
        }
        self.emit(ProviderEvent::ConnectionChanged { online: false });
        Ok(())
    }

    fn user_id(&self) -> Option<String> {
        self.user.lock().unwrap().clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

pub struct MockProvider {
    pub behaviour: Arc<Behaviour>,
    pub clients: Mutex<Vec<Arc<MockClient>>>,
}

impl MockProvider {
    pub fn new(behaviour: Arc<Behaviour>) -> Self {
        Self {
            behaviour,
            clients: Mutex::new(Vec::new()),
        }
    }

    pub fn last_client(&self) -> Option<Arc<MockClient>> {
        self.clients.lock().unwrap().last().cloned()
    }
}

impl ChatProvider for MockProvider {
    fn create_client(&self, api_key: &str) -> Result<Arc<dyn ProviderClient>> {
        self.behaviour.clients_created.fetch_add(1, Ordering::SeqCst);
        let (events, _) = broadcast::channel(64);
        let client = Arc::new(MockClient {
            api_key: api_key.to_string(),
            behaviour: self.behaviour.clone(),
            user: Mutex::new(None),
            events,
        });
        self.clients.lock().unwrap().push(client.clone());
        Ok(client)
    }
}

/// Issues credentials following the local naming convention.
pub struct MockTokenProvider {
    pub behaviour: Arc<Behaviour>,
    pub api_key: Option<String>,
    pub overrides: Mutex<HashMap<DomainIdentity, ChatCredentials>>,
}

impl MockTokenProvider {
    pub fn new(behaviour: Arc<Behaviour>, api_key: Option<&str>) -> Self {
        Self {
            behaviour,
            api_key: api_key.map(str::to_string),
            overrides: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl TokenProvider for MockTokenProvider {
    async fn issue_token(&self, identity: &DomainIdentity) -> Result<ChatCredentials> {
        self.behaviour.token_calls.fetch_add(1, Ordering::SeqCst);
        self.behaviour.push_call(format!("token:{}", identity));

        if Behaviour::take_failure(&self.behaviour.failing_tokens) {
            return Err(ChatError::token_provider("backend returned 503"));
        }

        if let Some(credentials) = self.overrides.lock().unwrap().get(identity) {
            return Ok(credentials.clone());
        }

        Ok(ChatCredentials {
            token: format!("token-{}", identity.id),
            provider_user_id: to_provider_user_id(&identity.id, identity.kind),
            api_key: self.api_key.clone(),
        })
    }
}

/// Records every status the manager publishes.
#[derive(Default)]
pub struct StatusRecorder {
    pub statuses: Mutex<Vec<SessionStatus>>,
}

impl ConnectionObserver for StatusRecorder {
    fn on_event(&self, _event_type: ConnectionEventType, _details: Value) {}

    fn on_status(&self, status: &SessionStatus) {
        self.statuses.lock().unwrap().push(status.clone());
    }
}

pub struct Harness {
    pub behaviour: Arc<Behaviour>,
    pub provider: Arc<MockProvider>,
    pub monitor: Arc<ConnectionMonitor>,
    pub session: ConnectionSessionManager,
    pub config: ChatConfig,
}

impl Harness {
    pub fn new(config: ChatConfig) -> Self {
        let behaviour = Arc::new(Behaviour::default());
        let provider = Arc::new(MockProvider::new(behaviour.clone()));
        let monitor = Arc::new(ConnectionMonitor::new(config.effective_monitor_capacity()));
        let session =
            ConnectionSessionManager::new(provider.clone(), &config).with_observer(monitor.clone());
        Self {
            behaviour,
            provider,
            monitor,
            session,
            config,
        }
    }

    pub fn with_fallback_key(key: &str) -> Self {
        Self::new(ChatConfig {
            fallback_api_key: Some(key.to_string()),
            ..ChatConfig::default()
        })
    }

    pub fn count(&self, event_type: ConnectionEventType) -> usize {
        self.monitor.events_by_type(event_type).len()
    }
}

/// Yields until `condition` holds or the attempts run out.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    condition()
}
