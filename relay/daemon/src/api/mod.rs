//! HTTP API
//!
//! Routes exposed to surfaces:
//!
//! | Route | Handler |
//! |-------|---------|
//! | `POST /api/chat` | [`chat::chat`], plain text stream or JSON error |
//! | `GET /api/models` | [`models::list_models`] |
//! | `POST /api/pdf` | [`document::upload_document`] |
//! | `GET /health` | [`health::health`] |

pub mod chat;
pub mod document;
pub mod health;
pub mod models;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use relay_core::{OllamaBackend, Relay, RelayConfig};

use crate::registry::ActiveRelays;

/// State shared by all handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// The relay in front of the model backend
    pub relay: Arc<Relay>,
    /// Live relay streams
    pub relays: ActiveRelays,
    /// Cancelled when the daemon shuts down; every relay token is a child
    pub shutdown: CancellationToken,
    /// Largest accepted PDF upload in bytes
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Create state around a relay
    #[must_use]
    pub fn new(relay: Relay, max_upload_bytes: usize, shutdown: CancellationToken) -> Self {
        Self {
            relay: Arc::new(relay),
            relays: ActiveRelays::new(),
            shutdown,
            max_upload_bytes,
        }
    }

    /// Create state for an Ollama backend described by `config`
    #[must_use]
    pub fn from_config(config: &RelayConfig, shutdown: CancellationToken) -> Self {
        let backend = OllamaBackend::from_settings(&config.backend);
        let relay = Relay::new(Arc::new(backend))
            .with_default_model(config.backend.default_model.clone())
            .with_buffer(config.server.relay_buffer);
        Self::new(relay, config.server.max_upload_bytes, shutdown)
    }
}

/// Build the router with CORS and request tracing
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let upload_limit = state.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health))
        .route("/api/chat", post(chat::chat))
        .route("/api/models", get(models::list_models))
        .route(
            "/api/pdf",
            post(document::upload_document).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
