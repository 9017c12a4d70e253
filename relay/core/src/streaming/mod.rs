//! Streaming Relay
//!
//! Converts the backend's NDJSON body into a stream of plain text
//! fragments.
//!
//! # Layers
//!
//! ```text
//! ByteStream ──▶ LineBuffer ──▶ ChunkDecoder ──▶ mpsc ──▶ RelayStream
//!  (raw reads)   (whole lines)  (content, done)          (Bytes fragments)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use relay_core::streaming::spawn_relay;
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let mut relay = spawn_relay(backend_body, cancel.clone(), 32);
//! while let Some(fragment) = relay.recv().await {
//!     print!("{}", String::from_utf8_lossy(&fragment?));
//! }
//! ```

mod decoder;
mod line_buffer;
mod stream;

pub use decoder::{BackendChunk, BackendMessage, ChunkDecoder, Decoded};
pub use line_buffer::LineBuffer;
pub use stream::{spawn_relay, RelayItem, RelayStream};
