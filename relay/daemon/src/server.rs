//! Daemon Server Implementation
//!
//! Binds the HTTP listener and runs the router until shutdown:
//! - Serves the API on a TCP listener
//! - Cancels every live relay when shutdown begins, so streaming responses
//!   end instead of holding graceful shutdown open
//! - Waits for in-flight requests to drain
//!
//! ```text
//!    Surfaces ──HTTP──▶ RelayServer ──▶ Router ──▶ Relay ──▶ Ollama
//!                            │
//!                       ActiveRelays (one entry per live stream)
//! ```

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use relay_core::RelayConfig;

use crate::api::{router, AppState};

/// The relay daemon server
pub struct RelayServer {
    state: AppState,
}

impl RelayServer {
    /// Create a server for a loaded configuration
    #[must_use]
    pub fn new(config: &RelayConfig, shutdown: CancellationToken) -> Self {
        Self {
            state: AppState::from_config(config, shutdown),
        }
    }

    /// Create a server around prepared state
    #[must_use]
    pub fn with_state(state: AppState) -> Self {
        Self { state }
    }

    /// Bind `addr` and serve until the shutdown token fires
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or the server fails.
    pub async fn run(self, addr: std::net::SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to {addr}"))?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until the shutdown token fires
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr().context("Listener has no address")?;
        info!(addr = %local_addr, "Listening for connections");

        let shutdown = self.state.shutdown.clone();
        let relays = self.state.relays.clone();
        let app = router(self.state);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                let cancelled = relays.cancel_all();
                info!(cancelled, "Initiating graceful shutdown");
            })
            .await
            .context("Server error")?;

        info!("Shutdown complete");
        Ok(())
    }
}
