//! LLM Backend Traits
//!
//! Trait definition and wire types for the model backend. The relay only
//! depends on [`LlmBackend`], so tests can substitute a scripted backend.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Raw response body of a streaming backend call
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, RelayError>> + Send>>;

/// Role of a chat message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System instructions
    System,
    /// The user's turn
    User,
    /// The model's turn
    Assistant,
}

/// One message in a backend chat request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote the message
    pub role: ChatRole,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// A system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// A user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Generation options under the backend's own names
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling threshold
    pub top_p: f32,
    /// Maximum tokens to generate
    pub num_predict: u32,
    /// Presence penalty
    pub presence_penalty: f32,
    /// Frequency penalty
    pub frequency_penalty: f32,
}

/// Body of `POST /api/chat`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model id
    pub model: String,
    /// System message followed by the user message
    pub messages: Vec<ChatMessage>,
    /// Whether the backend should stream NDJSON
    pub stream: bool,
    /// Generation options
    pub options: ChatOptions,
}

/// Information about an available model
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelInfo {
    /// Model identifier
    pub name: String,
}

/// LLM Backend trait
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Get the backend name (e.g., "Ollama")
    fn name(&self) -> &str;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Send a chat request with streaming enabled
    ///
    /// Returns the raw response body once the backend has answered with a
    /// success status. Non-success statuses are classified into
    /// [`RelayError`] variants.
    async fn chat_stream(&self, request: &ChatRequest) -> Result<ByteStream, RelayError>;

    /// List available models
    async fn list_models(&self) -> Result<Vec<ModelInfo>, RelayError>;
}
