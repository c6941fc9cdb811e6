//! Profile-switch orchestration.
//!
//! Sequences an identity change through the session manager: tear down the
//! outgoing identity, fetch credentials for the incoming one, connect, and
//! verify the session ended up attached to the requested target.
//!
//! A failed switch is not rolled back. The session is left disconnected and
//! the caller keeps (or restores) its own previous UI state.

use std::sync::Arc;
use std::time::Instant;

use onecrew_core::config::ChatConfig;
use onecrew_core::error::{ChatError, Result};
use onecrew_core::identity::{AttachedIdentity, DomainIdentity};
use onecrew_core::provider::ProfileData;
use onecrew_core::token::TokenProvider;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::monitor::ConnectionEventType;
use crate::session::{ConnectRequest, ConnectionSessionManager};

const LOG_TARGET: &str = "profile_switch";

/// The identity to switch to and the presence data to attach with it.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchTarget {
    pub identity: DomainIdentity,
    pub profile: ProfileData,
}

impl SwitchTarget {
    pub fn new(identity: DomainIdentity, profile: ProfileData) -> Self {
        Self { identity, profile }
    }

    pub fn user(id: impl Into<String>, profile: ProfileData) -> Self {
        Self::new(DomainIdentity::user(id), profile)
    }

    /// A company identity; `profile` is built from the company record.
    pub fn company(id: impl Into<String>, profile: ProfileData) -> Self {
        Self::new(DomainIdentity::company(id), profile)
    }
}

/// Outcome of a successful switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchReport {
    pub switch_id: String,
    pub target: DomainIdentity,
    pub previous: Option<AttachedIdentity>,
    pub attached: AttachedIdentity,
    pub attempts: u32,
    pub elapsed_ms: u64,
    /// True when the target was already attached and nothing was done.
    pub skipped: bool,
}

/// Drives identity switches through a [`ConnectionSessionManager`].
pub struct ProfileSwitchOrchestrator {
    session: ConnectionSessionManager,
    tokens: Arc<dyn TokenProvider>,
    max_attempts: u32,
}

impl ProfileSwitchOrchestrator {
    /// # Arguments
    ///
    /// * `session` - The process-wide session manager
    /// * `tokens` - Backend token issuer
    /// * `config` - Supplies the number of attempts per switch
    pub fn new(
        session: ConnectionSessionManager,
        tokens: Arc<dyn TokenProvider>,
        config: &ChatConfig,
    ) -> Self {
        Self {
            session,
            tokens,
            max_attempts: config.effective_switch_attempts(),
        }
    }

    pub fn session(&self) -> &ConnectionSessionManager {
        &self.session
    }

    /// Switches the real-time session to `target`.
    ///
    /// # Errors
    ///
    /// Returns the last error seen. Only retryable errors are retried, up to
    /// the configured number of attempts.
    pub async fn switch_to(&self, target: SwitchTarget) -> Result<SwitchReport> {
        let switch_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        let previous = self.session.attached_identity();

        tracing::info!(
            target: LOG_TARGET,
            "[{}] Switching to {} (from {:?})",
            switch_id,
            target.identity,
            previous.as_ref().map(|p| p.provider_user_id.as_str())
        );
        self.session.emit(
            ConnectionEventType::ProfileSwitch,
            json!({
                "switch_id": switch_id,
                "phase": "started",
                "target": target.identity,
                "previous": previous,
            }),
        );

        if self.session.is_connected()
            && let Some(current) = previous.as_ref().filter(|p| self.is_same(p, &target.identity))
        {
            tracing::debug!(target: LOG_TARGET, "[{}] Target already attached", switch_id);
            let report = SwitchReport {
                switch_id,
                target: target.identity,
                previous: previous.clone(),
                attached: current.clone(),
                attempts: 0,
                elapsed_ms: elapsed_ms(started),
                skipped: true,
            };
            self.emit_outcome(&report.switch_id, "skipped", json!({ "attached": report.attached }));
            return Ok(report);
        }

        let mut attempts = 0;
        let outcome = loop {
            attempts += 1;
            match self.attempt(&target).await {
                Ok(attached) => break Ok(attached),
                Err(err) if attempts < self.max_attempts && err.is_retryable() => {
                    tracing::warn!(
                        target: LOG_TARGET,
                        "[{}] Attempt {}/{} failed, retrying: {}",
                        switch_id,
                        attempts,
                        self.max_attempts,
                        err
                    );
                }
                Err(err) => break Err(err),
            }
        };

        match outcome {
            Ok(attached) => {
                let report = SwitchReport {
                    switch_id,
                    target: target.identity,
                    previous,
                    attached,
                    attempts,
                    elapsed_ms: elapsed_ms(started),
                    skipped: false,
                };
                tracing::info!(
                    target: LOG_TARGET,
                    "[{}] Switched to {} in {}ms",
                    report.switch_id,
                    report.attached.provider_user_id,
                    report.elapsed_ms
                );
                self.emit_outcome(
                    &report.switch_id,
                    "completed",
                    json!({ "attached": report.attached, "attempts": attempts }),
                );
                Ok(report)
            }
            Err(err) => {
                tracing::error!(
                    target: LOG_TARGET,
                    "[{}] Switch to {} failed after {} attempt(s): {}",
                    switch_id,
                    target.identity,
                    attempts,
                    err
                );
                self.emit_outcome(
                    &switch_id,
                    "failed",
                    json!({ "error": err.to_string(), "attempts": attempts }),
                );
                Err(err)
            }
        }
    }

    async fn attempt(&self, target: &SwitchTarget) -> Result<AttachedIdentity> {
        // 1. Release the outgoing identity.
        if let Some(current) = self.session.attached_identity()
            && !self.is_same(&current, &target.identity)
        {
            self.session.disconnect().await;
        }

        // 2. Fresh credentials for the incoming identity.
        let credentials = self.tokens.issue_token(&target.identity).await?;

        // 3. Connect.
        let mut request = ConnectRequest::new(credentials.provider_user_id.clone(), credentials.token)
            .with_profile(target.profile.clone())
            .with_kind(target.identity.kind);
        if let Some(api_key) = credentials.api_key {
            request = request.with_api_key(api_key);
        }
        self.session.connect(request).await?;

        // 4. Verify.
        match self.session.attached_identity() {
            Some(attached)
                if attached.provider_user_id == credentials.provider_user_id
                    && attached.kind == target.identity.kind =>
            {
                Ok(attached)
            }
            other => Err(ChatError::identity_mismatch(
                credentials.provider_user_id,
                other
                    .map(|attached| attached.provider_user_id)
                    .unwrap_or_else(|| "<none>".to_string()),
            )),
        }
    }

    /// Whether `attached` is the session for `identity`.
    ///
    /// Backend ids outside the local namespace never match, so a switch
    /// away from them always disconnects first.
    fn is_same(&self, attached: &AttachedIdentity, identity: &DomainIdentity) -> bool {
        self.session
            .translator()
            .from_provider_user_id(&attached.provider_user_id)
            .is_some_and(|decoded| &decoded == identity)
    }

    fn emit_outcome(&self, switch_id: &str, phase: &str, mut details: serde_json::Value) {
        details["switch_id"] = json!(switch_id);
        details["phase"] = json!(phase);
        self.session.emit(ConnectionEventType::ProfileSwitch, details);
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
