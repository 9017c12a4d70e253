//! Relay Errors
//!
//! Every failure the relay can report, and how each one is surfaced to a
//! caller. Errors that still allow a degraded answer (an unreachable backend)
//! carry that answer with them so the surface can render it like a normal
//! reply.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fallback;

/// Errors produced while validating, forwarding or relaying a request
#[derive(Debug, Error)]
pub enum RelayError {
    /// Document text or question missing; no backend call was made
    #[error("Missing required fields: pdfContent and query")]
    MissingFields,

    /// The backend could not be reached at the transport level
    ///
    /// Converted into [`RelayError::BackendUnavailable`] with a fallback
    /// answer once the caller's question is known.
    #[error("Cannot connect to Ollama: {reason}")]
    ConnectionFailed {
        /// Transport error description
        reason: String,
    },

    /// The backend is down or behind a failing gateway
    #[error("{}", unavailable_message(.fallback_response.is_some()))]
    BackendUnavailable {
        /// Answer text the surface can render in place of a streamed reply
        fallback_response: Option<String>,
    },

    /// The requested model is not installed in the backend
    #[error("Model '{model}' not found. Please make sure it's installed in Ollama.")]
    ModelNotFound {
        /// The model id that was requested
        model: String,
    },

    /// The backend answered with an internal server error
    #[error("Ollama server error. Please check that Ollama is running correctly.")]
    BackendInternal {
        /// Body text returned by the backend
        body: String,
    },

    /// Any other non-success status from the backend
    #[error("Ollama API error: {status} - {body}")]
    BackendStatus {
        /// HTTP status code
        status: u16,
        /// Body text returned by the backend
        body: String,
    },

    /// One backend line could not be parsed (never fatal to the stream)
    #[error("Failed to parse backend line: {reason}")]
    StreamParse {
        /// The offending line
        line: String,
        /// Parser error description
        reason: String,
    },

    /// Reading the backend stream failed mid-flight
    #[error("Stream read error: {0}")]
    StreamRead(String),

    /// The stream was cancelled by the caller
    #[error("Stream aborted")]
    StreamAborted,

    /// The request to the backend could not be built or sent
    #[error("Failed to get response from Ollama: {0}")]
    Request(String),
}

fn unavailable_message(with_fallback: bool) -> &'static str {
    if with_fallback {
        "Cannot connect to Ollama. Please make sure Ollama is running on your system."
    } else {
        "Cannot connect to Ollama. Please make sure Ollama is running."
    }
}

impl RelayError {
    /// Classify a non-success backend status
    ///
    /// 404 names the model, 500 is an internal error, 0/502/503 mean the
    /// backend is unavailable; everything else keeps status and body.
    pub fn from_status(status: u16, body: impl Into<String>, model: &str) -> Self {
        let body = body.into();
        match status {
            404 => Self::ModelNotFound {
                model: model.to_string(),
            },
            500 => Self::BackendInternal { body },
            0 | 502 | 503 => Self::BackendUnavailable {
                fallback_response: None,
            },
            status => Self::BackendStatus { status, body },
        }
    }

    /// Classify a transport error from the HTTP client
    #[must_use]
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_connect() {
            Self::ConnectionFailed {
                reason: err.to_string(),
            }
        } else {
            Self::Request(err.to_string())
        }
    }

    /// Attach the fallback answer for a connection failure
    ///
    /// Other variants are returned unchanged.
    #[must_use]
    pub fn with_fallback(self, model: &str, question: &str) -> Self {
        match self {
            Self::ConnectionFailed { reason } => {
                tracing::warn!(reason = %reason, model = %model, "Backend unreachable, answering with fallback");
                Self::BackendUnavailable {
                    fallback_response: Some(fallback::unreachable_backend_answer(model, question)),
                }
            }
            other => other,
        }
    }

    /// HTTP status the relay answers with for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingFields => StatusCode::BAD_REQUEST,
            Self::ModelNotFound { .. } => StatusCode::NOT_FOUND,
            Self::ConnectionFailed { .. } | Self::BackendUnavailable { .. } => {
                StatusCode::BAD_GATEWAY
            }
            Self::BackendInternal { .. }
            | Self::BackendStatus { .. }
            | Self::StreamParse { .. }
            | Self::StreamRead(_)
            | Self::Request(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::StreamAborted => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Whether the backend is degraded rather than the request being wrong
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::BackendUnavailable { .. }
        )
    }

    /// JSON body the relay answers with for this error
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        let fallback_response = match self {
            Self::BackendUnavailable { fallback_response } => fallback_response.clone(),
            _ => None,
        };
        ErrorBody {
            error: self.to_string(),
            fallback_response,
        }
    }
}

/// JSON error body exchanged between relay and surface
///
/// Shapes: `{error}`, `{error, fallbackResponse}`, or a model-not-found
/// `{error: "Model '<id>' not found..."}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Error description
    pub error: String,
    /// Degraded answer to show instead of a streamed reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_response: Option<String>,
}

impl ErrorBody {
    /// Create an error body without fallback text
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            fallback_response: None,
        }
    }

    /// Extract the model id from a model-not-found error message
    #[must_use]
    pub fn missing_model(&self) -> Option<&str> {
        let rest = self.error.strip_prefix("Model '")?;
        let end = rest.find("' not found")?;
        Some(&rest[..end])
    }
}
