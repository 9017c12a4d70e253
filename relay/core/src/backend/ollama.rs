//! Ollama Backend Implementation
//!
//! LLM backend for Ollama (local LLM server).
//!
//! # Ollama API
//!
//! - `/api/chat` - Chat completions, streamed as one JSON object per line
//! - `/api/tags` - List available models
//!
//! The chat call carries no overall timeout: a generation runs until the
//! backend reports `done` or the caller goes away. Only the metadata calls
//! are bounded.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, error, info, warn};

use super::traits::{ByteStream, ChatRequest, LlmBackend, ModelInfo};
use crate::config::BackendSettings;
use crate::error::RelayError;

/// Timeout for the reachability probe
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for establishing a TCP connection to the backend
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Ollama backend client
#[derive(Clone)]
pub struct OllamaBackend {
    /// Base URL, e.g. `http://localhost:11434`
    base_url: String,
    /// Timeout for model listing
    models_timeout: Duration,
    /// HTTP client
    http_client: reqwest::Client,
}

impl OllamaBackend {
    /// Create a new Ollama backend
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_base_url(format!("http://{}:{}", host.into(), port))
    }

    /// Create a backend for an explicit base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let http_client = or_plain_client(
            reqwest::Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .build(),
        );

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            models_timeout: Duration::from_secs(3),
            http_client,
        }
    }

    /// Create from backend settings
    #[must_use]
    pub fn from_settings(settings: &BackendSettings) -> Self {
        Self::with_base_url(settings.base_url()).with_models_timeout(settings.models_timeout)
    }

    /// Set the model listing timeout
    #[must_use]
    pub fn with_models_timeout(mut self, timeout: Duration) -> Self {
        self.models_timeout = timeout;
        self
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get chat endpoint URL
    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    /// Get tags endpoint URL
    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url)
    }
}

/// The configured client, or a plain one when the builder failed
fn or_plain_client<E: std::fmt::Display>(built: Result<reqwest::Client, E>) -> reqwest::Client {
    built.unwrap_or_else(|e| {
        warn!(
            error = %e,
            connect_timeout_secs = CONNECT_TIMEOUT.as_secs(),
            "Failed to build Ollama HTTP client, continuing without a connect timeout"
        );
        reqwest::Client::new()
    })
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self::new("localhost", 11434)
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(self.tags_url())
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<ByteStream, RelayError> {
        info!(model = %request.model, "Calling Ollama chat API");

        let response = self
            .http_client
            .post(self.chat_url())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Error calling Ollama API");
                RelayError::from_transport(&e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "Ollama API error");
            return Err(RelayError::from_status(status.as_u16(), body, &request.model));
        }

        debug!(status = status.as_u16(), "Ollama stream opened");

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| RelayError::StreamRead(e.to_string())));
        Ok(Box::pin(stream))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, RelayError> {
        let response = self
            .http_client
            .get(self.tags_url())
            .timeout(self.models_timeout)
            .send()
            .await
            .map_err(|e| RelayError::from_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::BackendStatus {
                status: status.as_u16(),
                body: format!("Failed to fetch models: {body}"),
            });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RelayError::Request(e.to_string()))?;

        let models = data
            .get("models")
            .and_then(|m| m.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| {
                        let name = m.get("name")?.as_str()?.to_string();
                        Some(ModelInfo { name })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(models)
    }
}
