//! Client Errors

use std::path::PathBuf;

use thiserror::Error;

use crate::session::SessionState;

/// Errors surfaced by the client
#[derive(Debug, Error)]
pub enum ClientError {
    /// A question was submitted before any document text was loaded
    #[error("No document loaded. Upload a PDF before asking a question.")]
    NoDocument,

    /// The relay could not be reached or the connection failed
    #[error("Relay connection failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The relay answered with an error
    #[error("Relay error ({status}): {message}")]
    Relay {
        /// HTTP status
        status: u16,
        /// Error message from the relay
        message: String,
    },

    /// A local document could not be read
    #[error("Failed to read document {path}: {source}")]
    DocumentRead {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// A session was asked to make a transition its state machine forbids
    #[error("Invalid session transition from {from:?} to {to:?}")]
    InvalidTransition {
        /// Current state
        from: SessionState,
        /// Requested state
        to: SessionState,
    },
}
