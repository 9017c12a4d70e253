//! Stream Session
//!
//! One question's lifecycle, from submit to the committed answer:
//!
//! ```text
//! Idle ──▶ Sending ──▶ Streaming ──▶ Completed
//!             │            ├───────▶ Cancelled
//!             │            └───────▶ Failed
//!             ├──────────────────▶ Completed   (fallback answer)
//!             ├──────────────────▶ Cancelled
//!             └──────────────────▶ Failed
//! ```
//!
//! The session owns the accumulation buffer. Once a terminal state is
//! reached the buffer is frozen: later chunks are ignored.

use std::time::Instant;

use tracing::debug;

use crate::decode::Utf8Decoder;
use crate::error::ClientError;

/// Appended to a partial answer stopped by the user
pub const INTERRUPTION_MARKER: &str = "\n\n[Response stopped by user]";

/// Appended to a partial answer cut off by a read error
pub const ERROR_MARKER: &str = "\n\n[Response interrupted by an error]";

/// State of a stream session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing submitted yet
    #[default]
    Idle,
    /// Request sent, waiting for the relay's answer
    Sending,
    /// Reading the relayed stream
    Streaming,
    /// The answer was committed in full
    Completed,
    /// The user stopped the answer
    Cancelled,
    /// The request or the stream failed
    Failed,
}

impl SessionState {
    /// Whether the session has ended
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Whether `self → next` is a legal transition
    #[must_use]
    pub fn can_transition(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Sending)
                | (
                    Self::Sending,
                    Self::Streaming | Self::Completed | Self::Cancelled | Self::Failed
                )
                | (
                    Self::Streaming,
                    Self::Completed | Self::Cancelled | Self::Failed
                )
        )
    }
}

/// Buffer and state for one question
#[derive(Debug)]
pub struct StreamSession {
    state: SessionState,
    buffer: String,
    decoder: Utf8Decoder,
    started_at: Instant,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSession {
    /// Create an idle session
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            buffer: String::new(),
            decoder: Utf8Decoder::new(),
            started_at: Instant::now(),
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Text accumulated so far
    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Move to `next`
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidTransition`] for a transition the state
    /// machine does not allow.
    pub fn transition(&mut self, next: SessionState) -> Result<(), ClientError> {
        if !self.state.can_transition(next) {
            return Err(ClientError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(
            from = ?self.state,
            to = ?next,
            elapsed_ms = self.started_at.elapsed().as_millis(),
            "Session transition"
        );
        self.state = next;
        Ok(())
    }

    /// Append relayed bytes; returns whether the visible buffer changed
    ///
    /// Ignored outside [`SessionState::Streaming`].
    pub fn append(&mut self, bytes: &[u8]) -> bool {
        if self.state != SessionState::Streaming {
            return false;
        }
        let text = self.decoder.push(bytes);
        self.buffer.push_str(&text);
        !text.is_empty()
    }

    /// End of stream: the buffer is the final answer
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidTransition`] unless streaming.
    pub fn complete(&mut self) -> Result<String, ClientError> {
        self.transition(SessionState::Completed)?;
        self.flush_decoder();
        Ok(self.buffer.clone())
    }

    /// Commit a non-streamed answer (fallback text)
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidTransition`] unless sending.
    pub fn complete_with(&mut self, text: impl Into<String>) -> Result<String, ClientError> {
        self.transition(SessionState::Completed)?;
        self.buffer = text.into();
        Ok(self.buffer.clone())
    }

    /// User cancellation: buffer plus interruption marker
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidTransition`] once terminal.
    pub fn cancel(&mut self) -> Result<String, ClientError> {
        self.transition(SessionState::Cancelled)?;
        self.flush_decoder();
        self.buffer.push_str(INTERRUPTION_MARKER);
        Ok(self.buffer.clone())
    }

    /// Failure: buffer plus error marker, or `None` when nothing arrived
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidTransition`] once terminal.
    pub fn fail(&mut self) -> Result<Option<String>, ClientError> {
        self.transition(SessionState::Failed)?;
        self.flush_decoder();
        if self.buffer.is_empty() {
            return Ok(None);
        }
        self.buffer.push_str(ERROR_MARKER);
        Ok(Some(self.buffer.clone()))
    }

    /// Move bytes held back for an incomplete character into the buffer
    fn flush_decoder(&mut self) {
        self.buffer.push_str(&self.decoder.finish());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn streaming() -> StreamSession {
        let mut session = StreamSession::new();
        session.transition(SessionState::Sending).unwrap();
        session.transition(SessionState::Streaming).unwrap();
        session
    }

    #[test]
    fn test_happy_path() {
        let mut session = streaming();
        assert!(session.append(b"It "));
        assert!(session.append(b"is Y."));
        assert_eq!(session.complete().unwrap(), "It is Y.");
        assert_eq!(session.state(), SessionState::Completed);
    }

    #[test]
    fn test_cancel_commits_partial_with_marker() {
        let mut session = streaming();
        session.append(b"Partial ans");
        let committed = session.cancel().unwrap();
        assert_eq!(committed, format!("Partial ans{INTERRUPTION_MARKER}"));

        // Nothing is appended after cancellation
        assert!(!session.append(b"wer"));
        assert_eq!(session.buffer(), committed);
        assert!(session.complete().is_err());
    }

    #[test]
    fn test_fail_keeps_partial_only_when_present() {
        let mut session = streaming();
        assert_eq!(session.fail().unwrap(), None);

        let mut session = streaming();
        session.append(b"half");
        assert_eq!(
            session.fail().unwrap(),
            Some(format!("half{ERROR_MARKER}"))
        );
    }

    #[test]
    fn test_invalid_transitions() {
        let mut session = StreamSession::new();
        assert!(matches!(
            session.transition(SessionState::Streaming),
            Err(ClientError::InvalidTransition {
                from: SessionState::Idle,
                to: SessionState::Streaming
            })
        ));
        assert!(!SessionState::Completed.can_transition(SessionState::Sending));
        assert!(SessionState::Sending.can_transition(SessionState::Completed));
        assert!(SessionState::Cancelled.is_terminal());
        assert!(!SessionState::Streaming.is_terminal());
    }

    #[test]
    fn test_terminal_states_keep_pending_bytes() {
        let euro = "\u{20ac}".as_bytes();

        let mut session = streaming();
        session.append(b"cost ");
        assert!(!session.append(&euro[..2]));
        assert_eq!(
            session.cancel().unwrap(),
            format!("cost \u{fffd}{INTERRUPTION_MARKER}")
        );

        let mut session = streaming();
        session.append(&euro[..1]);
        assert_eq!(
            session.fail().unwrap(),
            Some(format!("\u{fffd}{ERROR_MARKER}"))
        );
    }

    #[test]
    fn test_split_multibyte_chunk() {
        let mut session = streaming();
        let bytes = "caf\u{e9}".as_bytes();
        assert!(session.append(&bytes[..4]));
        assert!(session.append(&bytes[4..]));
        assert_eq!(session.complete().unwrap(), "caf\u{e9}");
    }
}
