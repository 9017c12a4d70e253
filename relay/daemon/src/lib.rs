//! Relay Daemon - HTTP surface of the document chat relay
//!
//! Exposes [`relay_core`] over HTTP with axum. Surfaces post a question
//! about a document and read the answer as a plain text stream.
//!
//! # Module Overview
//!
//! - [`api`]: Routes and handlers
//! - [`registry`]: Live relay tracking for health and shutdown
//! - [`server`]: Listener and graceful shutdown

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod registry;
pub mod server;

pub use api::{router, AppState};
pub use registry::{ActiveRelays, RelayGuard, RelayId, RelayStats};
pub use server::RelayServer;
