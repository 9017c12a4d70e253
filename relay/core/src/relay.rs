//! Relay
//!
//! Entry point used by the daemon: validate a [`GenerationRequest`], open
//! the backend stream and hand back a cancellable [`RelayStream`].

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::backend::LlmBackend;
use crate::error::RelayError;
use crate::models::{available_models, ModelList};
use crate::request::{GenerationRequest, DEFAULT_MODEL};
use crate::streaming::{spawn_relay, RelayStream};

/// Default number of fragments buffered between backend and caller
pub const DEFAULT_RELAY_BUFFER: usize = 32;

/// Streaming relay in front of an [`LlmBackend`]
#[derive(Clone)]
pub struct Relay {
    backend: Arc<dyn LlmBackend>,
    default_model: String,
    buffer: usize,
}

impl Relay {
    /// Create a relay for a backend
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            default_model: DEFAULT_MODEL.to_string(),
            buffer: DEFAULT_RELAY_BUFFER,
        }
    }

    /// Set the model used when a request names none
    #[must_use]
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the fragment buffer size
    #[must_use]
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    /// The model used when a request names none
    #[must_use]
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Open a relay stream for a request
    ///
    /// Validation happens before any backend call. A transport failure comes
    /// back as [`RelayError::BackendUnavailable`] carrying a fallback answer
    /// for the caller's question.
    ///
    /// # Errors
    ///
    /// Returns the classified [`RelayError`] when the request is invalid or
    /// the backend refuses it, and [`RelayError::StreamAborted`] when `cancel`
    /// has already fired.
    pub async fn open(
        &self,
        request: &GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<RelayStream, RelayError> {
        request.validate()?;
        if cancel.is_cancelled() {
            return Err(RelayError::StreamAborted);
        }

        let chat = request.to_chat_request(&self.default_model);
        info!(
            model = %chat.model,
            backend = self.backend.name(),
            document_len = request.document_text.len(),
            "Opening relay"
        );

        let upstream = self
            .backend
            .chat_stream(&chat)
            .await
            .map_err(|e| e.with_fallback(&chat.model, &request.question))?;

        debug!(model = %chat.model, "Backend accepted request, relaying");
        Ok(spawn_relay(upstream, cancel, self.buffer))
    }

    /// List models, falling back to the static list
    pub async fn available_models(&self) -> ModelList {
        available_models(self.backend.as_ref()).await
    }

    /// Whether the backend is reachable
    pub async fn backend_healthy(&self) -> bool {
        self.backend.health_check().await
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("backend", &self.backend.name())
            .field("default_model", &self.default_model)
            .field("buffer", &self.buffer)
            .finish()
    }
}
