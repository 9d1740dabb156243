use std::time::Duration;

use async_trait::async_trait;
use daybrief_core::config::BackendConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::GatewayError;

/// Transport seam between the dispatcher and the backend.
///
/// The dispatcher only ever sees this trait, so tests can substitute an
/// in-memory implementation and never touch the network.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    async fn invoke(
        &self,
        endpoint: &str,
        parameters: &Map<String, Value>,
        timeout: Duration,
    ) -> Result<Value, GatewayError>;
}

/// HTTP client for the remote tool backend.
///
/// One POST per operation to `{base_url}{endpoint}` with a JSON body. No
/// retries here and no shared mutable state: the underlying reqwest client
/// is internally pooled and safe to clone across concurrent calls.
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
    api_key: Option<SecretString>,
    health_timeout: Duration,
}

impl BackendClient {
    pub fn from_config(config: &BackendConfig) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("daybrief/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| GatewayError::Construction(err.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            health_timeout: Duration::from_secs(config.health_timeout_secs),
        })
    }

    /// Probe the backend's `/health` endpoint.
    pub async fn health_check(&self) -> Result<(), GatewayError> {
        let endpoint = "/health";
        let url = format!("{}{endpoint}", self.base_url);

        let mut request = self.http.get(&url).timeout(self.health_timeout);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(|err| {
            normalize_send_error(err, endpoint, self.health_timeout.as_secs())
        })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(GatewayError::Remote {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                message: remote_message(&body),
            })
        }
    }
}

#[async_trait]
impl ToolTransport for BackendClient {
    async fn invoke(
        &self,
        endpoint: &str,
        parameters: &Map<String, Value>,
        timeout: Duration,
    ) -> Result<Value, GatewayError> {
        let url = format!("{}{endpoint}", self.base_url);
        debug!(endpoint, timeout_secs = timeout.as_secs(), "calling tool backend");

        let mut request = self.http.post(&url).json(parameters).timeout(timeout);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|err| normalize_send_error(err, endpoint, timeout.as_secs()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Remote {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                message: remote_message(&body),
            });
        }

        response.json::<Value>().await.map_err(|err| {
            if err.is_timeout() {
                GatewayError::Timeout { endpoint: endpoint.to_string(), timeout_secs: timeout.as_secs() }
            } else {
                GatewayError::Transport {
                    endpoint: endpoint.to_string(),
                    message: format!("response body was not valid JSON: {err}"),
                }
            }
        })
    }
}

fn normalize_send_error(err: reqwest::Error, endpoint: &str, timeout_secs: u64) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout { endpoint: endpoint.to_string(), timeout_secs }
    } else {
        GatewayError::Transport { endpoint: endpoint.to_string(), message: err.to_string() }
    }
}

/// Pull the most specific message out of an error body: the backend sends
/// `{"error": ...}` or `{"detail": ...}` payloads; anything else is kept
/// verbatim but truncated.
fn remote_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<Value>(body) {
        for field in ["error", "message", "detail"] {
            if let Some(text) = parsed.get(field).and_then(Value::as_str) {
                return text.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    let mut message: String = trimmed.chars().take(200).collect();
    if trimmed.chars().count() > 200 {
        message.push_str("...");
    }
    message
}
