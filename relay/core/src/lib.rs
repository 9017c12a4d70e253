//! Relay Core - Streaming document chat relay for a local Ollama server
//!
//! This crate contains everything the relay daemon needs, independent of the
//! HTTP framework that exposes it. A surface (browser page, terminal client)
//! sends a [`GenerationRequest`] carrying the extracted document text and a
//! question; the [`Relay`] forwards it to the model backend with streaming
//! enabled and re-emits the answer as plain text fragments.
//!
//! # Architecture
//!
//! ```text
//!   Surface                      Relay                         Ollama
//!   ───────                      ─────                         ──────
//!   GenerationRequest ──▶ validate + build ChatRequest ──▶ POST /api/chat
//!                                                              │
//!                          LineBuffer ◀── NDJSON bytes ◀───────┘
//!                              │
//!                        ChunkDecoder (message.content, done)
//!                              │
//!   text fragments  ◀──── RelayStream (mpsc, cancellable)
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: LLM backend abstraction and the Ollama client
//! - [`config`]: TOML + environment configuration for the relay
//! - [`document`]: PDF text extraction and degraded document content
//! - [`error`]: Relay error taxonomy and the JSON error body
//! - [`fallback`]: Human-readable fallback texts
//! - [`models`]: Model listing with a static fallback list
//! - [`relay`]: The [`Relay`] that opens a stream for a request
//! - [`request`]: The caller-facing [`GenerationRequest`]
//! - [`streaming`]: Line buffering, chunk decoding and the relay stream

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod document;
pub mod error;
pub mod fallback;
pub mod models;
pub mod relay;
pub mod request;
pub mod streaming;

pub use backend::{
    ByteStream, ChatMessage, ChatOptions, ChatRequest, ChatRole, LlmBackend, ModelInfo,
    OllamaBackend,
};
pub use config::{
    default_config_path, load_config, load_config_from_path, BackendSettings, ConfigError,
    ConfigOverrides, ConfigSource, RelayConfig, RelayToml, ServerSettings,
};
pub use document::{
    content_summary, extract_document, is_full_content, split_text_into_chunks, DegradedDocument,
    DocumentResponse, ExtractedDocument, FileInfo,
};
pub use error::{ErrorBody, RelayError};
pub use models::{available_models, ModelList, FALLBACK_MODELS};
pub use relay::{Relay, DEFAULT_RELAY_BUFFER};
pub use request::{
    GenerationParameters, GenerationRequest, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT,
};
pub use streaming::{spawn_relay, BackendChunk, ChunkDecoder, Decoded, LineBuffer, RelayStream};
