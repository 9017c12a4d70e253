//! LLM Backend Integration
//!
//! This module provides abstracted access to the model backend through a
//! common trait interface, plus the Ollama wire types.
//!
//! # Usage
//!
//! ```ignore
//! use relay_core::backend::{LlmBackend, OllamaBackend};
//! use relay_core::GenerationRequest;
//!
//! let backend = OllamaBackend::new("localhost", 11434);
//! let chat = GenerationRequest::new("Doc", "Question?").to_chat_request("llama2");
//! let bytes = backend.chat_stream(&chat).await?;
//! ```

mod ollama;
mod traits;

pub use ollama::OllamaBackend;
pub use traits::{
    ByteStream, ChatMessage, ChatOptions, ChatRequest, ChatRole, LlmBackend, ModelInfo,
};
