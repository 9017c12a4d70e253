//! Relay Daemon - Document chat relay for a local Ollama server
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (127.0.0.1:3000, Ollama on localhost:11434)
//! relay-daemon
//!
//! # Custom listen address and backend
//! relay-daemon --bind 0.0.0.0:8080 --ollama-host gpu-box
//!
//! # With config file
//! relay-daemon --config /etc/pdf-chat/relay.toml
//!
//! # Verbose logging
//! RUST_LOG=debug relay-daemon
//! ```
//!
//! # Signals
//!
//! - `SIGTERM` / `SIGINT`: Graceful shutdown, live relays are cancelled

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use relay_core::{default_config_path, load_config_from_path, ConfigOverrides};
use relay_daemon::RelayServer;

/// Relay Daemon - Streams document answers from a local Ollama server
#[derive(Parser, Debug)]
#[command(name = "relay-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Listen address
    #[arg(short = 'b', long, value_name = "ADDR")]
    bind: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "PDF_CHAT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Ollama host
    #[arg(long, value_name = "HOST")]
    ollama_host: Option<String>,

    /// Ollama port
    #[arg(long, value_name = "PORT")]
    ollama_port: Option<u16>,

    /// Model used when a request names none
    #[arg(short = 'm', long, value_name = "MODEL")]
    default_model: Option<String>,

    /// Largest accepted PDF upload in bytes
    #[arg(long, value_name = "BYTES")]
    max_upload_bytes: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "PDF_CHAT_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind: self.bind.clone(),
            ollama_host: self.ollama_host.clone(),
            ollama_port: self.ollama_port,
            default_model: self.default_model.clone(),
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "relay_daemon={level},relay_core={level},tower_http={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

/// Resolve when SIGINT or SIGTERM arrives
async fn wait_for_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for SIGINT")?;
                info!("Received SIGINT, initiating shutdown");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, initiating shutdown");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        info!("Received Ctrl-C, initiating shutdown");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging first
    init_logging(&args.log_level);

    info!("Relay daemon starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = args.config.clone().or_else(default_config_path);
    let mut config =
        load_config_from_path(config_path).context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;

    let addr = config.bind_addr()?;
    info!(
        bind = %addr,
        ollama = %config.backend.base_url(),
        default_model = %config.backend.default_model,
        source = %config.source(),
        "Configuration loaded"
    );
    if let Some(ref path) = config.config_file_path {
        info!(path = ?path, "Config file");
    }

    // Setup signal handling
    let shutdown = CancellationToken::new();
    let shutdown_on_signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_signal().await {
            error!(error = %e, "Signal handling failed, shutting down");
        }
        shutdown_on_signal.cancel();
    });

    let server = RelayServer::new(&config, shutdown);
    let result = server.run(addr).await;

    match result {
        Ok(()) => {
            info!("Relay daemon stopped cleanly");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Daemon stopped with error");
            Err(e)
        }
    }
}
