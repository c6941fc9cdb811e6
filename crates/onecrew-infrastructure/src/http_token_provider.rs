//! [`TokenProvider`] backed by the OneCrew REST API.
//!
//! Request: `POST {api_base_url}{token_path}` with a JSON body
//! `{ "entity_id": ..., "entity_type": "user" | "company" }` and the caller's
//! backend session as a bearer token.
//!
//! Response: `{ "token": ..., "user_id": ..., "api_key": ... }`. The provider
//! user id may also arrive as `provider_user_id`; `api_key` is optional.

use std::time::Duration;

use async_trait::async_trait;
use onecrew_core::config::ChatConfig;
use onecrew_core::error::{ChatError, Result};
use onecrew_core::identity::{DomainIdentity, ParticipantKind};
use onecrew_core::token::{ChatCredentials, TokenProvider};
use serde::{Deserialize, Serialize};

const LOG_TARGET: &str = "chat_token";

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    entity_id: &'a str,
    entity_type: ParticipantKind,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
    #[serde(alias = "provider_user_id")]
    user_id: String,
    #[serde(default)]
    api_key: Option<String>,
}

impl From<TokenResponse> for ChatCredentials {
    fn from(response: TokenResponse) -> Self {
        Self {
            token: response.token,
            provider_user_id: response.user_id,
            api_key: response.api_key.filter(|key| !key.is_empty()),
        }
    }
}

/// Fetches messaging credentials from the backend over HTTP.
#[derive(Clone)]
pub struct HttpTokenProvider {
    client: reqwest::Client,
    endpoint: String,
    session_token: Option<String>,
}

impl HttpTokenProvider {
    /// # Arguments
    ///
    /// * `config` - Supplies `api_base_url`, `token_path` and the request timeout
    /// * `session_token` - Backend session used as the bearer credential
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `api_base_url` is not set, or if the
    /// HTTP client cannot be built.
    pub fn new(config: &ChatConfig, session_token: Option<String>) -> Result<Self> {
        let base = config
            .api_base_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ChatError::config("api_base_url is not configured"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| ChatError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: join_url(base, &config.token_path),
            session_token,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TokenProvider for HttpTokenProvider {
    async fn issue_token(&self, identity: &DomainIdentity) -> Result<ChatCredentials> {
        tracing::debug!(target: LOG_TARGET, "Requesting chat token for {}", identity);

        let mut request = self.client.post(&self.endpoint).json(&TokenRequest {
            entity_id: &identity.id,
            entity_type: identity.kind,
        });
        if let Some(session_token) = &self.session_token {
            request = request.bearer_auth(session_token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                target: LOG_TARGET,
                "Token request for {} failed with {}",
                identity,
                status
            );
            return Err(ChatError::token_provider(format!(
                "token endpoint returned {}: {}",
                status,
                body.trim()
            )));
        }

        let body: TokenResponse = response.json().await?;
        Ok(body.into())
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
