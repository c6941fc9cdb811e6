use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use onecrew_core::config::ChatConfig;
use onecrew_core::error::{ChatError, Result};
use onecrew_core::identity::{AttachedIdentity, IdentityTranslator, ParticipantKind};
use onecrew_core::provider::{ChatProvider, ProviderClient};
use serde_json::{Value, json};

use super::{ConnectRequest, ConnectionObserver, ConnectionState, ObserverSet, SessionStatus};
use crate::monitor::ConnectionEventType;

const LOG_TARGET: &str = "chat_session";

type ConnectOutcome = Shared<BoxFuture<'static, Result<()>>>;
type TeardownOutcome = Shared<BoxFuture<'static, ()>>;

/// The connect attempt currently running against the provider.
#[derive(Clone)]
struct InFlightConnect {
    attempt: u64,
    provider_user_id: String,
    outcome: ConnectOutcome,
}

#[derive(Default)]
struct SessionInner {
    client: Option<Arc<dyn ProviderClient>>,
    /// Key the current (or next) client handle is bound to.
    api_key: Option<String>,
    attached: Option<AttachedIdentity>,
    state: ConnectionState,
    in_flight: Option<InFlightConnect>,
    /// Set while an explicit disconnect is tearing the session down.
    teardown: Option<TeardownOutcome>,
    next_attempt: u64,
}

enum ConnectStep {
    AlreadyConnected,
    Join(ConnectOutcome),
    WaitThenRetry(ConnectOutcome),
    AwaitTeardown(TeardownOutcome),
    Started(ConnectOutcome),
    Rejected(ChatError),
}

enum DisconnectStep {
    Noop,
    Wait(ConnectOutcome),
    Join(TeardownOutcome),
    Started(TeardownOutcome),
}

/// Work a spawned task owns in [`SessionInner`].
#[derive(Clone, Copy)]
enum Pending {
    Connect(u64),
    Teardown,
}

/// Releases a task's claim on the session if the task ends early.
///
/// A spawned connect or teardown normally clears its own marker. When the
/// task panics or is dropped by the runtime, this guard clears it instead and
/// leaves the session `Disconnected`. It only touches the marker it owns.
struct PendingGuard {
    inner: Arc<Mutex<SessionInner>>,
    pending: Pending,
    armed: bool,
}

impl PendingGuard {
    fn new(inner: Arc<Mutex<SessionInner>>, pending: Pending) -> Self {
        Self {
            inner,
            pending,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let released = match self.pending {
            Pending::Connect(attempt) => {
                let owned = inner
                    .in_flight
                    .as_ref()
                    .is_some_and(|in_flight| in_flight.attempt == attempt);
                if owned {
                    inner.in_flight = None;
                }
                owned
            }
            Pending::Teardown => inner.teardown.take().is_some(),
        };

        if released {
            inner.state = ConnectionState::Disconnected;
            inner.attached = None;
            tracing::error!(
                target: LOG_TARGET,
                "Session task ended abnormally; session reset to disconnected"
            );
        }
    }
}

/// Owns the provider client handle and the real-time session state.
///
/// `ConnectionSessionManager` is responsible for:
/// - Lazily creating the provider client, and recreating it when the API key changes
/// - Coalescing concurrent connect calls onto a single provider attempt
/// - Tearing down the previous identity before connecting a different one
/// - Reporting every lifecycle step to registered observers
///
/// Cloning is cheap and every clone shares the same session.
#[derive(Clone)]
pub struct ConnectionSessionManager {
    provider: Arc<dyn ChatProvider>,
    translator: IdentityTranslator,
    fallback_api_key: Option<String>,
    inner: Arc<Mutex<SessionInner>>,
    observers: Arc<ObserverSet>,
}

impl ConnectionSessionManager {
    /// Creates a disconnected session manager.
    ///
    /// # Arguments
    ///
    /// * `provider` - Factory for provider client handles
    /// * `config` - Supplies the fallback API key and the id prefix
    pub fn new(provider: Arc<dyn ChatProvider>, config: &ChatConfig) -> Self {
        Self {
            provider,
            translator: config.translator(),
            fallback_api_key: config
                .fallback_api_key
                .clone()
                .filter(|key| !key.is_empty()),
            inner: Arc::new(Mutex::new(SessionInner::default())),
            observers: Arc::new(ObserverSet::default()),
        }
    }

    /// Registers an observer and returns the manager.
    pub fn with_observer(self, observer: Arc<dyn ConnectionObserver>) -> Self {
        self.add_observer(observer);
        self
    }

    /// Registers an observer. It immediately receives the current status.
    pub fn add_observer(&self, observer: Arc<dyn ConnectionObserver>) {
        observer.on_status(&self.status());
        self.observers.add(observer);
        tracing::debug!(target: LOG_TARGET, "Observer registered ({} total)", self.observers.len());
    }

    // ============================================================================
    // Read accessors
    // ============================================================================

    pub fn is_connected(&self) -> bool {
        self.lock().state == ConnectionState::Connected
    }

    pub fn attached_identity(&self) -> Option<AttachedIdentity> {
        self.lock().attached.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.lock().state
    }

    /// Whether a connect could resolve an API key without one being supplied.
    pub fn api_key_configured(&self) -> bool {
        self.lock().api_key.is_some() || self.fallback_api_key.is_some()
    }

    pub fn status(&self) -> SessionStatus {
        let (mut status, client) = {
            let inner = self.lock();
            let status = SessionStatus {
                state: inner.state,
                attached: inner.attached.clone(),
                api_key_configured: inner.api_key.is_some() || self.fallback_api_key.is_some(),
                has_client: inner.client.is_some(),
                client_user_id: None,
                connect_in_flight: inner.in_flight.is_some(),
            };
            (status, inner.client.clone())
        };
        // The provider client is queried outside the session lock.
        status.client_user_id = client.and_then(|client| client.user_id());
        status
    }

    /// Returns the provider client handle, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no API key is bound and no fallback
    /// is configured, or whatever the provider returns when creating the
    /// client.
    pub fn client_handle(&self) -> Result<Arc<dyn ProviderClient>> {
        let api_key = {
            let inner = self.lock();
            if let Some(client) = &inner.client {
                return Ok(client.clone());
            }
            inner
                .api_key
                .clone()
                .or_else(|| self.fallback_api_key.clone())
                .ok_or_else(|| ChatError::config("no messaging API key available"))?
        };

        // Provider code runs outside the session lock.
        let created = self.provider.create_client(&api_key)?;

        let client = {
            let mut inner = self.lock();
            match &inner.client {
                Some(existing) if inner.api_key.as_deref() == Some(api_key.as_str()) => {
                    return Ok(existing.clone());
                }
                _ => {
                    inner.api_key = Some(api_key);
                    inner.client = Some(created.clone());
                    created
                }
            }
        };

        tracing::debug!(target: LOG_TARGET, "Created provider client handle");
        self.observers.client(&client.subscribe());
        Ok(client)
    }

    // ============================================================================
    // Lifecycle
    // ============================================================================

    /// Connects the session as `request.provider_user_id`.
    ///
    /// - Already connected as the same user with the same key: no-op.
    /// - A connect for the same user is in flight: waits for that attempt
    ///   and returns its outcome.
    /// - A connect for another user is in flight: waits for it to settle,
    ///   then runs its own attempt.
    /// - Connected as another user: that session is torn down first.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no API key can be resolved, and
    /// otherwise the provider's error unchanged. On error the session is
    /// left `Disconnected`.
    pub async fn connect(&self, request: ConnectRequest) -> Result<()> {
        let kind = request
            .kind
            .unwrap_or_else(|| self.infer_kind(&request.provider_user_id));

        self.observers.event(
            ConnectionEventType::ConnectCalled,
            json!({
                "provider_user_id": request.provider_user_id,
                "kind": kind,
                "api_key_supplied": request.api_key.is_some(),
            }),
        );

        loop {
            match self.plan_connect(&request, kind) {
                ConnectStep::AlreadyConnected => {
                    tracing::debug!(
                        target: LOG_TARGET,
                        "Already connected as {}, skipping",
                        request.provider_user_id
                    );
                    return Ok(());
                }
                ConnectStep::Join(outcome) => {
                    tracing::debug!(
                        target: LOG_TARGET,
                        "Joining in-flight connect for {}",
                        request.provider_user_id
                    );
                    return outcome.await;
                }
                ConnectStep::WaitThenRetry(outcome) => {
                    tracing::debug!(
                        target: LOG_TARGET,
                        "Waiting for in-flight connect of another identity before connecting {}",
                        request.provider_user_id
                    );
                    let _ = outcome.await;
                }
                ConnectStep::AwaitTeardown(teardown) => {
                    tracing::debug!(
                        target: LOG_TARGET,
                        "Waiting for disconnect to finish before connecting {}",
                        request.provider_user_id
                    );
                    teardown.await;
                }
                ConnectStep::Started(outcome) => {
                    self.publish_status();
                    return outcome.await;
                }
                ConnectStep::Rejected(err) => {
                    tracing::error!(target: LOG_TARGET, "Connect rejected: {}", err);
                    self.observers.event(
                        ConnectionEventType::ConnectFailed,
                        json!({
                            "provider_user_id": request.provider_user_id,
                            "error": err.to_string(),
                        }),
                    );
                    return Err(err);
                }
            }
        }
    }

    /// Tears down the active session.
    ///
    /// A no-op when already disconnected. A connect in flight is allowed to
    /// settle first, and a disconnect already in progress is joined. Connects
    /// issued during the teardown wait for it to finish. Provider failures
    /// are reported to observers and logged but never returned: teardown is
    /// best-effort.
    pub async fn disconnect(&self) {
        self.observers.event(
            ConnectionEventType::DisconnectCalled,
            json!({
                "reason": "explicit",
                "provider_user_id": self.attached_identity().map(|a| a.provider_user_id),
            }),
        );

        loop {
            match self.plan_disconnect() {
                DisconnectStep::Noop => {
                    tracing::debug!(target: LOG_TARGET, "Disconnect requested while disconnected");
                    return;
                }
                DisconnectStep::Wait(outcome) => {
                    let _ = outcome.await;
                }
                DisconnectStep::Join(teardown) => {
                    tracing::debug!(target: LOG_TARGET, "Joining in-progress disconnect");
                    teardown.await;
                    return;
                }
                DisconnectStep::Started(teardown) => {
                    teardown.await;
                    return;
                }
            }
        }
    }

    // ============================================================================
    // Internals
    // ============================================================================

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn translator(&self) -> &IdentityTranslator {
        &self.translator
    }

    /// Reports an event that is not tied to a manager call site.
    pub(crate) fn emit(&self, event_type: ConnectionEventType, details: Value) {
        self.observers.event(event_type, details);
    }

    fn publish_status(&self) {
        let status = self.status();
        self.observers.status(&status);
    }

    fn infer_kind(&self, provider_user_id: &str) -> ParticipantKind {
        self.translator
            .from_provider_user_id(provider_user_id)
            .map(|identity| identity.kind)
            .unwrap_or_default()
    }

    /// Decides, under the session lock, what this connect call does.
    fn plan_connect(&self, request: &ConnectRequest, kind: ParticipantKind) -> ConnectStep {
        let mut inner = self.lock();

        if let Some(in_flight) = &inner.in_flight {
            return if in_flight.provider_user_id == request.provider_user_id {
                ConnectStep::Join(in_flight.outcome.clone())
            } else {
                ConnectStep::WaitThenRetry(in_flight.outcome.clone())
            };
        }

        // The session is still marked connected until the teardown lands.
        if let Some(teardown) = &inner.teardown {
            return ConnectStep::AwaitTeardown(teardown.clone());
        }

        let api_key = match request
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| inner.api_key.clone())
            .or_else(|| self.fallback_api_key.clone())
        {
            Some(key) => key,
            None => {
                return ConnectStep::Rejected(ChatError::config(
                    "no messaging API key supplied and none configured",
                ));
            }
        };

        let same_identity = inner
            .attached
            .as_ref()
            .is_some_and(|attached| attached.provider_user_id == request.provider_user_id);
        if inner.state == ConnectionState::Connected
            && same_identity
            && inner.api_key.as_deref() == Some(api_key.as_str())
        {
            return ConnectStep::AlreadyConnected;
        }

        inner.state = ConnectionState::Connecting;
        inner.next_attempt += 1;
        let attempt = inner.next_attempt;

        let task = tokio::spawn(
            self.clone()
                .run_connect(request.clone(), kind, api_key, attempt),
        );
        let manager = self.clone();
        let provider_user_id = request.provider_user_id.clone();
        let outcome = async move {
            match task.await {
                Ok(result) => result,
                Err(join_error) => {
                    // The task's guard has already released the session.
                    let err = ChatError::internal(format!(
                        "connect task did not complete: {}",
                        join_error
                    ));
                    tracing::error!(target: LOG_TARGET, "Connect as {} aborted: {}", provider_user_id, err);
                    manager.observers.event(
                        ConnectionEventType::ConnectFailed,
                        json!({ "provider_user_id": provider_user_id, "error": err.to_string() }),
                    );
                    manager.publish_status();
                    Err(err)
                }
            }
        }
        .boxed()
        .shared();

        inner.in_flight = Some(InFlightConnect {
            attempt,
            provider_user_id: request.provider_user_id.clone(),
            outcome: outcome.clone(),
        });

        ConnectStep::Started(outcome)
    }

    /// The single connect attempt. Runs on its own task to completion.
    async fn run_connect(
        self,
        request: ConnectRequest,
        kind: ParticipantKind,
        api_key: String,
        attempt: u64,
    ) -> Result<()> {
        let guard = PendingGuard::new(Arc::clone(&self.inner), Pending::Connect(attempt));
        let result = self.perform_connect(&request, &api_key).await;
        guard.disarm();

        {
            let mut inner = self.lock();
            inner.in_flight = None;
            match &result {
                Ok(()) => {
                    inner.state = ConnectionState::Connected;
                    inner.attached = Some(AttachedIdentity::new(
                        request.provider_user_id.clone(),
                        kind,
                    ));
                }
                Err(_) => {
                    inner.state = ConnectionState::Disconnected;
                    inner.attached = None;
                }
            }
        }

        match &result {
            Ok(()) => {
                tracing::info!(
                    target: LOG_TARGET,
                    "Connected as {} ({})",
                    request.provider_user_id,
                    kind
                );
                self.observers.event(
                    ConnectionEventType::ConnectSucceeded,
                    json!({ "provider_user_id": request.provider_user_id, "kind": kind }),
                );
            }
            Err(err) => {
                tracing::error!(
                    target: LOG_TARGET,
                    "Connect as {} failed: {}",
                    request.provider_user_id,
                    err
                );
                self.observers.event(
                    ConnectionEventType::ConnectFailed,
                    json!({
                        "provider_user_id": request.provider_user_id,
                        "error": err.to_string(),
                    }),
                );
            }
        }
        self.publish_status();

        result
    }

    /// Decides, under the session lock, what this disconnect call does.
    fn plan_disconnect(&self) -> DisconnectStep {
        let mut inner = self.lock();

        if let Some(in_flight) = &inner.in_flight {
            return DisconnectStep::Wait(in_flight.outcome.clone());
        }
        if let Some(teardown) = &inner.teardown {
            return DisconnectStep::Join(teardown.clone());
        }
        if inner.state == ConnectionState::Disconnected {
            return DisconnectStep::Noop;
        }

        let task = tokio::spawn(
            self.clone()
                .run_disconnect(inner.client.clone(), inner.attached.clone()),
        );
        let manager = self.clone();
        let teardown = async move {
            if let Err(join_error) = task.await {
                tracing::error!(target: LOG_TARGET, "Disconnect task did not complete: {}", join_error);
                manager.observers.event(
                    ConnectionEventType::DisconnectFailed,
                    json!({ "error": format!("disconnect task did not complete: {}", join_error) }),
                );
                manager.publish_status();
            }
        }
        .boxed()
        .shared();

        inner.teardown = Some(teardown.clone());
        DisconnectStep::Started(teardown)
    }

    /// The explicit teardown. Runs on its own task to completion.
    async fn run_disconnect(
        self,
        client: Option<Arc<dyn ProviderClient>>,
        identity: Option<AttachedIdentity>,
    ) {
        let guard = PendingGuard::new(Arc::clone(&self.inner), Pending::Teardown);
        if let Some(client) = client {
            self.teardown(client, identity).await;
        }
        guard.disarm();

        {
            let mut inner = self.lock();
            inner.teardown = None;
            inner.attached = None;
            inner.state = ConnectionState::Disconnected;
        }
        self.publish_status();
    }

    async fn perform_connect(&self, request: &ConnectRequest, api_key: &str) -> Result<()> {
        let (key_changed, previous) = {
            let inner = self.lock();
            let key_changed = inner.api_key.as_deref() != Some(api_key);
            let previous = match (&inner.client, &inner.attached) {
                (Some(client), Some(attached)) => Some((client.clone(), attached.clone())),
                _ => None,
            };
            (key_changed, previous)
        };

        if let Some((client, attached)) = previous {
            let reason = if attached.provider_user_id != request.provider_user_id {
                "identity_switch"
            } else {
                "api_key_changed"
            };
            self.observers.event(
                ConnectionEventType::DisconnectCalled,
                json!({ "reason": reason, "provider_user_id": attached.provider_user_id }),
            );
            self.teardown(client, Some(attached)).await;
            self.lock().attached = None;
            self.publish_status();
        }

        if key_changed {
            let mut inner = self.lock();
            if inner.client.take().is_some() {
                tracing::info!(target: LOG_TARGET, "API key changed; discarding provider client handle");
            }
            inner.api_key = Some(api_key.to_string());
        }

        let client = self.client_handle()?;
        client
            .connect_user(&request.provider_user_id, &request.token, &request.profile)
            .await?;

        match client.user_id() {
            Some(actual) if actual == request.provider_user_id => Ok(()),
            actual => {
                if let Err(err) = client.disconnect_user().await {
                    tracing::warn!(
                        target: LOG_TARGET,
                        "Cleanup after identity mismatch failed: {}",
                        err
                    );
                }
                Err(ChatError::identity_mismatch(
                    request.provider_user_id.clone(),
                    actual.unwrap_or_else(|| "<none>".to_string()),
                ))
            }
        }
    }

    /// Best-effort provider teardown. Never fails.
    async fn teardown(&self, client: Arc<dyn ProviderClient>, identity: Option<AttachedIdentity>) {
        let provider_user_id = identity.map(|identity| identity.provider_user_id);

        match client.disconnect_user().await {
            Ok(()) => {
                tracing::info!(target: LOG_TARGET, "Disconnected {:?}", provider_user_id);
                self.observers.event(
                    ConnectionEventType::DisconnectSucceeded,
                    json!({ "provider_user_id": provider_user_id }),
                );
            }
            Err(err) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    "Disconnect of {:?} failed, continuing: {}",
                    provider_user_id,
                    err
                );
                self.observers.event(
                    ConnectionEventType::DisconnectFailed,
                    json!({ "provider_user_id": provider_user_id, "error": err.to_string() }),
                );
            }
        }
    }
}
