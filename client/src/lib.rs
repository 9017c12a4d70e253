//! PDF Chat Client - Session controller for the document chat relay
//!
//! Loads a document through the relay, then asks questions about it and
//! renders the streamed answer as it arrives.
//!
//! # Module Overview
//!
//! - [`controller`]: The [`SessionController`] that runs one question at a time
//! - [`decode`]: Incremental UTF-8 decoding of relayed bytes
//! - [`document`]: The document text a session asks about
//! - [`error`]: Client error type
//! - [`messages`]: Conversation transcript
//! - [`session`]: Stream session state machine and answer buffer
//! - [`transport`]: HTTP access to the relay daemon

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod controller;
pub mod decode;
pub mod document;
pub mod error;
pub mod messages;
pub mod session;
pub mod transport;

pub use controller::{ChatSettings, Outcome, SessionController, CANCELLED_NOTICE};
pub use decode::Utf8Decoder;
pub use document::{read_local_file, LoadedDocument, LocalFile};
pub use error::ClientError;
pub use messages::{ConversationMessage, MessageId, MessageRole, Transcript};
pub use session::{SessionState, StreamSession, ERROR_MARKER, INTERRUPTION_MARKER};
pub use transport::{RelayClient, RelayReply, DEFAULT_RELAY_URL};
