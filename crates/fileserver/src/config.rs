//! Server configuration
//!
//! Values come from the environment (optionally seeded from a `.env` file by
//! the binary). Every key has a default so an empty environment still boots.

use std::path::PathBuf;
use std::time::Duration;

/// Default download token lifetime (4 hours)
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 4 * 60 * 60;

/// Default interval between expired-token sweeps
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} has invalid value '{value}'")]
    InvalidValue { key: &'static str, value: String },
    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
    #[error("file root {path} is not a directory: {reason}")]
    FilesRoot { path: PathBuf, reason: String },
}

/// Server configuration structure
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served to clients
    pub files_root: PathBuf,
    /// Credential store location
    pub database_url: String,
    /// Download token lifetime (`tokenTTL`)
    pub token_ttl: Duration,
    /// Bind download tokens to the issuing client's address
    pub bind_client_ip: bool,
    pub sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            files_root: PathBuf::from("./shared_files"),
            database_url: accounts::DEFAULT_DATABASE_URL.to_string(),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
            bind_client_ip: true,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

impl ServerConfig {
    /// Build configuration from environment variables
    ///
    /// Recognized keys: `SERVER_HOST`, `SERVER_PORT`, `FILES_ROOT`,
    /// `DATABASE_URL`, `TOKEN_TTL` (seconds), `BIND_CLIENT_IP`,
    /// `SWEEP_INTERVAL` (seconds).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("SERVER_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            config.port = parse_value("SERVER_PORT", &port)?;
        }
        if let Some(root) = lookup("FILES_ROOT") {
            config.files_root = PathBuf::from(root);
        }
        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(ttl) = lookup("TOKEN_TTL") {
            config.token_ttl = Duration::from_secs(parse_nonzero("TOKEN_TTL", &ttl)?);
        }
        if let Some(bind) = lookup("BIND_CLIENT_IP") {
            config.bind_client_ip = parse_bool("BIND_CLIENT_IP", &bind)?;
        }
        if let Some(interval) = lookup("SWEEP_INTERVAL") {
            config.sweep_interval =
                Duration::from_secs(parse_nonzero("SWEEP_INTERVAL", &interval)?);
        }

        Ok(config)
    }

    /// Canonical absolute path of the file root
    pub fn canonical_files_root(&self) -> Result<PathBuf, ConfigError> {
        let root = self
            .files_root
            .canonicalize()
            .map_err(|e| ConfigError::FilesRoot {
                path: self.files_root.clone(),
                reason: e.to_string(),
            })?;

        if !root.is_dir() {
            return Err(ConfigError::FilesRoot {
                path: self.files_root.clone(),
                reason: "not a directory".to_string(),
            });
        }
        Ok(root)
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn parse_nonzero(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    match parse_value::<u64>(key, value)? {
        0 => Err(ConfigError::Zero { key }),
        n => Ok(n),
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}
