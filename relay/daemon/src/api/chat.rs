//! `POST /api/chat`
//!
//! Answers with a `text/plain` body that grows as the backend generates.
//! Failures before the first byte are JSON: `{error}`, or
//! `{error, fallbackResponse}` when the backend is unreachable.

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use futures::Stream;
use tracing::{info, warn};

use relay_core::{ErrorBody, GenerationRequest, RelayError, RelayStream};

use super::AppState;
use crate::registry::RelayGuard;

/// Content type of a relayed answer
pub const TEXT_STREAM_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Relay a generation request
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected chat request body");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody::new(rejection.body_text())),
            )
                .into_response();
        }
    };

    let model = request.model_or(state.relay.default_model()).to_string();
    let cancel = state.shutdown.child_token();

    match state.relay.open(&request, cancel.clone()).await {
        Ok(stream) => {
            let guard = state.relays.register(model, cancel);
            let body = Body::from_stream(TrackedStream {
                inner: stream,
                _guard: guard,
            });
            ([(header::CONTENT_TYPE, TEXT_STREAM_CONTENT_TYPE)], body).into_response()
        }
        Err(e) => {
            cancel.cancel();
            error_response(&e)
        }
    }
}

/// JSON response for a relay error
pub fn error_response(err: &RelayError) -> Response {
    if err.is_degraded() {
        warn!(error = %err, "Backend unavailable");
    } else {
        info!(error = %err, status = err.status_code().as_u16(), "Chat request failed");
    }
    (err.status_code(), Json(err.to_body())).into_response()
}

/// Relay stream that holds its registry entry until the body is dropped
struct TrackedStream {
    inner: RelayStream,
    _guard: RelayGuard,
}

impl Stream for TrackedStream {
    type Item = Result<Bytes, RelayError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
