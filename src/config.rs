//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. Built-in defaults
//! 2. User config: `~/.config/cypher-ogm/config.toml` (XDG) or platform config dir
//! 3. Project config: `.cypher-ogm.toml`
//! 4. Environment variables: `CYPHER_OGM_*` (nested keys separated by `__`)
//!
//! # Example
//!
//! ```toml
//! [connection]
//! uri = "https://graph.internal:7473"
//! username = "neo4j"
//! password = "secret"
//!
//! [execution]
//! database = "replays"
//! error_mode = "hide"
//! cypher_max_retries = 10
//! ```
//!
//! `CYPHER_OGM_EXECUTION__ERROR_MODE=throw` overrides the file value.

use std::ops::Deref;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// Transport settings for the HTTP driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Base URI of the database HTTP endpoint, e.g. `http://localhost:7474`.
    pub uri: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Skip TLS certificate verification.
    pub no_ssl_verify: bool,
    /// Per-request timeout.
    pub timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:7474".to_string(),
            username: None,
            password: None,
            no_ssl_verify: false,
            timeout_ms: 30_000,
        }
    }
}

/// What the batch executor does with per-statement errors once a batch has
/// finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Raise the first error (by batch position).
    #[default]
    Throw,
    /// Return the result set with errors embedded.
    Hide,
}

/// Values consumed by the execution engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Target database name; the driver picks its default when unset.
    pub database: Option<String>,
    pub error_mode: ErrorMode,
    /// Retry statements that fail with a transient error code.
    pub retry_cypher_errors: bool,
    /// Retry budget shared by every statement in one batch.
    pub cypher_max_retries: u32,
    /// Upper bound of the randomized backoff between statement retries.
    pub cypher_retry_max_interval_ms: u64,
    /// Attempts allowed per statement after a connection failure.
    pub request_max_retries: u32,
    /// Fixed sleep between connection retries.
    pub request_retry_interval_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            database: None,
            error_mode: ErrorMode::Throw,
            retry_cypher_errors: true,
            cypher_max_retries: 40,
            cypher_retry_max_interval_ms: 50,
            request_max_retries: 0,
            request_retry_interval_ms: 250,
        }
    }
}

impl Config {
    /// Load config with layered resolution (defaults → user → project → env).
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// The layered figment used by [`Config::load`].
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            // Layer 1: User config
            .merge(Toml::file(Self::user_config_path()))
            // Layer 2: Project config
            .merge(Toml::file(".cypher-ogm.toml"))
            // Layer 3: Environment variables (highest priority)
            .merge(Env::prefixed("CYPHER_OGM_").split("__"))
    }

    /// User config path: ~/.config/cypher-ogm/config.toml (XDG) or platform config dir.
    fn user_config_path() -> std::path::PathBuf {
        // Prefer XDG config location (~/.config) on all platforms
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("cypher-ogm").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        dirs::config_dir()
            .map(|p| p.join("cypher-ogm").join("config.toml"))
            .unwrap_or_default()
    }
}
