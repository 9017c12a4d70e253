//! TOML Configuration File Support
//!
//! Centralized configuration loading for the relay, from a TOML file at
//! `~/.config/pdf-chat/relay.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Environment Variables
//!
//! | Variable | Setting |
//! |----------|---------|
//! | `OLLAMA_HOST` | backend host (`host` or `host:port`, `http://` or `https://` optional) |
//! | `OLLAMA_PORT` | backend port |
//! | `PDF_CHAT_BIND` | listen address |
//! | `PDF_CHAT_DEFAULT_MODEL` | model used when a request names none |
//! | `PDF_CHAT_MODELS_TIMEOUT_MS` | model listing timeout |
//! | `PDF_CHAT_MAX_UPLOAD_BYTES` | largest accepted PDF upload |
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:3000"
//! max_upload_bytes = 20971520
//! relay_buffer = 32
//!
//! [backend]
//! scheme = "http"
//! host = "localhost"
//! port = 11434
//! default_model = "llama2"
//! models_timeout_ms = 3000
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::relay::DEFAULT_RELAY_BUFFER;
use crate::request::DEFAULT_MODEL;

// =============================================================================
// Error Types
// =============================================================================

/// Configuration loading failures
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Layer that last changed the configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Server section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerToml {
    /// Listen address, e.g. `127.0.0.1:3000`
    pub bind: Option<String>,

    /// Largest accepted PDF upload in bytes
    pub max_upload_bytes: Option<usize>,

    /// Fragments buffered per relay before backend reads pause
    pub relay_buffer: Option<usize>,
}

/// Backend section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendToml {
    /// `http` or `https`
    pub scheme: Option<String>,

    /// Ollama host
    pub host: Option<String>,

    /// Ollama port
    pub port: Option<u16>,

    /// Model used when a request names none
    pub default_model: Option<String>,

    /// Model listing timeout in milliseconds
    pub models_timeout_ms: Option<u64>,
}

/// Contents of `relay.toml`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayToml {
    /// Server configuration section
    pub server: ServerToml,

    /// Backend configuration section
    pub backend: BackendToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// HTTP server settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerSettings {
    /// Listen address
    pub bind: String,
    /// Largest accepted PDF upload in bytes
    pub max_upload_bytes: usize,
    /// Fragments buffered per relay
    pub relay_buffer: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            max_upload_bytes: 20 * 1024 * 1024,
            relay_buffer: DEFAULT_RELAY_BUFFER,
        }
    }
}

/// Model backend settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendSettings {
    /// `http` or `https`
    pub scheme: String,
    /// Ollama host
    pub host: String,
    /// Ollama port
    pub port: u16,
    /// Model used when a request names none
    pub default_model: String,
    /// Model listing timeout
    pub models_timeout: Duration,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            default_model: DEFAULT_MODEL.to_string(),
            models_timeout: Duration::from_secs(3),
        }
    }
}

impl BackendSettings {
    /// Base URL of the backend, e.g. `http://localhost:11434`
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Centralized configuration for the relay
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug, Default)]
pub struct RelayConfig {
    /// Server settings
    pub server: ServerSettings,

    /// Backend settings
    pub backend: BackendSettings,

    /// Config file that was read, if any
    pub config_file_path: Option<PathBuf>,

    /// Where the effective configuration came from
    source: ConfigSource,
}

impl RelayConfig {
    /// Built-in defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest-priority layer that contributed a value
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// The listen address
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] when `bind` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server.bind.parse().map_err(|e| {
            ConfigError::ValidationError(format!("bind address '{}': {e}", self.server.bind))
        })
    }

    /// Check values that would only fail later at runtime
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if !matches!(self.backend.scheme.as_str(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "backend scheme '{}' must be http or https",
                self.backend.scheme
            )));
        }
        if self.backend.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "backend host must not be empty".to_string(),
            ));
        }
        if self.backend.port == 0 {
            return Err(ConfigError::ValidationError(
                "backend port must not be 0".to_string(),
            ));
        }
        if self.backend.default_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default model must not be empty".to_string(),
            ));
        }
        if self.server.relay_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "relay_buffer must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// `$XDG_CONFIG_HOME/pdf-chat/relay.toml`, when a config directory exists
///
/// Returns `$XDG_CONFIG_HOME/pdf-chat/relay.toml` or
/// `~/.config/pdf-chat/relay.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("pdf-chat").join("relay.toml"))
}

/// Load the relay configuration from the default path and the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<RelayConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<RelayConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration, reading environment variables through `lookup`
fn load_config_with_env(
    path: Option<PathBuf>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<RelayConfig, ConfigError> {
    let mut config = RelayConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: RelayToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, lookup);

    Ok(config)
}

/// Copy the values present in a parsed TOML file onto `config`
fn apply_toml_config(config: &mut RelayConfig, toml: &RelayToml) {
    // Server settings
    if let Some(ref bind) = toml.server.bind {
        config.server.bind.clone_from(bind);
    }
    if let Some(size) = toml.server.max_upload_bytes {
        config.server.max_upload_bytes = size;
    }
    if let Some(buffer) = toml.server.relay_buffer {
        config.server.relay_buffer = buffer;
    }

    // Backend settings
    if let Some(ref scheme) = toml.backend.scheme {
        config.backend.scheme.clone_from(scheme);
    }
    if let Some(ref host) = toml.backend.host {
        config.backend.host.clone_from(host);
    }
    if let Some(port) = toml.backend.port {
        config.backend.port = port;
    }
    if let Some(ref model) = toml.backend.default_model {
        config.backend.default_model.clone_from(model);
    }
    if let Some(ms) = toml.backend.models_timeout_ms {
        config.backend.models_timeout = Duration::from_millis(ms);
    }
}

/// Overlay the relay's environment variables, read through `lookup`
fn apply_env_config(config: &mut RelayConfig, lookup: impl Fn(&str) -> Option<String>) {
    // Backend settings from environment
    if let Some(host) = lookup("OLLAMA_HOST") {
        let (scheme, host, port) = split_host(&host);
        if let Some(scheme) = scheme {
            config.backend.scheme = scheme.to_string();
        }
        if !host.is_empty() {
            config.backend.host = host;
            config.source = ConfigSource::Env;
        }
        if let Some(port) = port {
            config.backend.port = port;
        }
    }
    if let Some(port) = lookup("OLLAMA_PORT") {
        if let Ok(p) = port.parse::<u16>() {
            config.backend.port = p;
            config.source = ConfigSource::Env;
        }
    }
    if let Some(model) = lookup("PDF_CHAT_DEFAULT_MODEL") {
        config.backend.default_model = model;
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = lookup("PDF_CHAT_MODELS_TIMEOUT_MS") {
        if let Ok(ms) = timeout.parse::<u64>() {
            config.backend.models_timeout = Duration::from_millis(ms);
            config.source = ConfigSource::Env;
        }
    }

    // Server settings from environment
    if let Some(bind) = lookup("PDF_CHAT_BIND") {
        config.server.bind = bind;
        config.source = ConfigSource::Env;
    }
    if let Some(size) = lookup("PDF_CHAT_MAX_UPLOAD_BYTES") {
        if let Ok(s) = size.parse::<usize>() {
            config.server.max_upload_bytes = s;
            config.source = ConfigSource::Env;
        }
    }
}

/// Split an `OLLAMA_HOST` value into optional scheme, host and optional port
///
/// Accepts `host`, `host:port` and either form with an `http://` or
/// `https://` prefix.
fn split_host(value: &str) -> (Option<&'static str>, String, Option<u16>) {
    let value = value.trim();
    let (scheme, value) = if let Some(rest) = value.strip_prefix("https://") {
        (Some("https"), rest)
    } else if let Some(rest) = value.strip_prefix("http://") {
        (Some("http"), rest)
    } else {
        (None, value)
    };
    let value = value.trim_end_matches('/');

    match value.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => match port.parse::<u16>() {
            Ok(port) => (scheme, host.to_string(), Some(port)),
            Err(_) => (scheme, value.to_string(), None),
        },
        _ => (scheme, value.to_string(), None),
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Command-line values that win over file and environment
///
/// Applied last, after [`load_config`] or [`load_config_from_path`].
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Listen address override
    pub bind: Option<String>,

    /// Ollama host override
    pub ollama_host: Option<String>,

    /// Ollama port override
    pub ollama_port: Option<u16>,

    /// Default model override
    pub default_model: Option<String>,

    /// Max upload size override
    pub max_upload_bytes: Option<usize>,
}

impl ConfigOverrides {
    /// No overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set listen address override
    #[must_use]
    pub fn with_bind(mut self, bind: String) -> Self {
        self.bind = Some(bind);
        self
    }

    /// Set Ollama host override
    #[must_use]
    pub fn with_ollama_host(mut self, host: String) -> Self {
        self.ollama_host = Some(host);
        self
    }

    /// Set Ollama port override
    #[must_use]
    pub fn with_ollama_port(mut self, port: u16) -> Self {
        self.ollama_port = Some(port);
        self
    }

    /// Set default model override
    #[must_use]
    pub fn with_default_model(mut self, model: String) -> Self {
        self.default_model = Some(model);
        self
    }

    /// Set max upload size override
    #[must_use]
    pub fn with_max_upload_bytes(mut self, size: usize) -> Self {
        self.max_upload_bytes = Some(size);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut RelayConfig) {
        if self.bind.is_some()
            || self.ollama_host.is_some()
            || self.ollama_port.is_some()
            || self.default_model.is_some()
            || self.max_upload_bytes.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref bind) = self.bind {
            config.server.bind.clone_from(bind);
        }
        if let Some(ref host) = self.ollama_host {
            config.backend.host.clone_from(host);
        }
        if let Some(port) = self.ollama_port {
            config.backend.port = port;
        }
        if let Some(ref model) = self.default_model {
            config.backend.default_model.clone_from(model);
        }
        if let Some(size) = self.max_upload_bytes {
            config.server.max_upload_bytes = size;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
