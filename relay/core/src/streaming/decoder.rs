//! Chunk Decoder
//!
//! Turns backend NDJSON into the plain text fragments a surface sees.
//!
//! Each complete line is one JSON object:
//!
//! ```text
//! {"message":{"role":"assistant","content":"It "},"done":false}
//! {"message":{"role":"assistant","content":"is Y."},"done":true}
//! ```
//!
//! Non-empty `message.content` values become fragments in order. Blank lines
//! produce nothing; lines that fail to parse are logged and dropped. Input
//! after the `done` line is ignored.

use serde::Deserialize;
use tracing::{trace, warn};

use super::line_buffer::LineBuffer;
use crate::error::RelayError;

/// One line of backend output
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct BackendChunk {
    /// Message delta, absent on some control lines
    #[serde(default)]
    pub message: Option<BackendMessage>,
    /// Whether generation has finished
    #[serde(default)]
    pub done: bool,
    /// Error reported in-band by the backend
    #[serde(default)]
    pub error: Option<String>,
}

/// Message part of a [`BackendChunk`]
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct BackendMessage {
    /// Text delta
    #[serde(default)]
    pub content: Option<String>,
}

impl BackendChunk {
    /// Parse one line
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::StreamParse`] when the line is not a chunk object.
    pub fn parse(line: &str) -> Result<Self, RelayError> {
        serde_json::from_str(line).map_err(|e| RelayError::StreamParse {
            line: line.to_string(),
            reason: e.to_string(),
        })
    }

    /// The text delta, if non-empty
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|m| m.content.as_deref())
            .filter(|c| !c.is_empty())
    }
}

/// Result of feeding bytes into a [`ChunkDecoder`]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Decoded {
    /// Text fragments, in backend order
    pub chunks: Vec<String>,
    /// Whether the backend signalled completion
    pub done: bool,
}

/// Incremental NDJSON decoder
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    lines: LineBuffer,
    finished: bool,
    dropped_lines: usize,
}

impl ChunkDecoder {
    /// Create a decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network read
    pub fn feed(&mut self, bytes: &[u8]) -> Decoded {
        if self.finished {
            return Decoded {
                chunks: Vec::new(),
                done: true,
            };
        }
        let lines = self.lines.push(bytes);
        self.decode_lines(lines)
    }

    /// Flush the unterminated tail once the backend has closed the stream
    pub fn finish(&mut self) -> Decoded {
        if self.finished {
            return Decoded {
                chunks: Vec::new(),
                done: true,
            };
        }
        let tail = self.lines.finish();
        self.decode_lines(tail.into_iter().collect())
    }

    /// Bytes of an unterminated line still waiting for its newline
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.lines.pending_len()
    }

    /// Number of lines dropped because they could not be parsed
    #[must_use]
    pub fn dropped_lines(&self) -> usize {
        self.dropped_lines
    }

    fn decode_lines(&mut self, lines: Vec<String>) -> Decoded {
        let mut decoded = Decoded::default();

        for line in lines {
            if line.trim().is_empty() {
                continue;
            }

            let chunk = match BackendChunk::parse(&line) {
                Ok(chunk) => chunk,
                Err(e) => {
                    self.dropped_lines += 1;
                    warn!(error = %e, "Dropping unparseable backend line");
                    continue;
                }
            };

            if let Some(error) = &chunk.error {
                warn!(error = %error, "Backend reported an error in-stream");
            }

            if let Some(content) = chunk.content() {
                trace!(len = content.len(), "Relaying chunk");
                decoded.chunks.push(content.to_string());
            }

            if chunk.done {
                self.finished = true;
                decoded.done = true;
                break;
            }
        }

        decoded
    }
}
