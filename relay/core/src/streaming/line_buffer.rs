//! Line Buffer
//!
//! Accumulates raw bytes across network reads and yields complete lines.
//! Decoding happens per complete line, so a multi-byte character split
//! between two reads is reassembled before it is interpreted.

/// Byte accumulator that splits on `\n`
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Create an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a read and drain every line it completes
    ///
    /// Lines are returned without their terminator (a trailing `\r` is also
    /// removed). Bytes after the last `\n` stay buffered.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            lines.push(decode_line(&self.pending[start..end]));
            start = end + 1;
        }
        self.pending.drain(..start);

        lines
    }

    /// Take the unterminated tail, if it holds anything but whitespace
    pub fn finish(&mut self) -> Option<String> {
        let tail = std::mem::take(&mut self.pending);
        let line = decode_line(&tail);
        if line.trim().is_empty() {
            None
        } else {
            Some(line)
        }
    }

    /// Number of buffered bytes not yet terminated by a newline
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
