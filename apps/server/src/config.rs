//! # Server Configuration
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`AGENCY_*`)
//! 2. Config file (`server.toml`)
//! 3. Defaults (this file)
//!
//! The config file is the one given with `--config` or `AGENCY_CONFIG`,
//! otherwise `server.toml` in the platform config directory when it exists.
//!
//! Configuration is read-only after startup; handlers share it behind an
//! `Arc`.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use agency_core::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// File name looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "server.toml";

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    pub port: u16,

    /// SQLite file; `:memory:` for a throwaway database
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// Page size when the request gives none
    pub default_page_size: u32,

    /// Upper bound for `per_page`
    pub max_page_size: u32,

    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,

    /// JSON log lines instead of the human-readable format
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_path: PathBuf::from("agency.db"),
            max_connections: 5,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            log_filter: "agency_server=info,agency_db=info".to_string(),
            json_logs: false,
        }
    }
}

impl ServerConfig {
    /// Loads defaults, then the config file, then `AGENCY_*` variables, and
    /// validates the result.
    ///
    /// An explicit path (argument or `AGENCY_CONFIG`) must exist; the
    /// platform default is skipped when missing.
    pub fn load(explicit_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let explicit_path = explicit_path.or_else(|| env::var_os("AGENCY_CONFIG").map(PathBuf::from));

        let mut config = match explicit_path {
            Some(path) => ServerConfig::from_file(&path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => ServerConfig::from_file(&path)?,
                None => ServerConfig::default(),
            },
        };

        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Applies `AGENCY_*` overrides read through `lookup`.
    ///
    /// ## Variables
    /// - `AGENCY_HOST`, `AGENCY_PORT`
    /// - `AGENCY_DATABASE_PATH`, `AGENCY_MAX_CONNECTIONS`
    /// - `AGENCY_DEFAULT_PAGE_SIZE`, `AGENCY_MAX_PAGE_SIZE`
    /// - `AGENCY_LOG`, `AGENCY_JSON_LOGS`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("AGENCY_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("AGENCY_PORT") {
            self.port = parse_var("AGENCY_PORT", &port)?;
        }
        if let Some(path) = lookup("AGENCY_DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(max) = lookup("AGENCY_MAX_CONNECTIONS") {
            self.max_connections = parse_var("AGENCY_MAX_CONNECTIONS", &max)?;
        }
        if let Some(size) = lookup("AGENCY_DEFAULT_PAGE_SIZE") {
            self.default_page_size = parse_var("AGENCY_DEFAULT_PAGE_SIZE", &size)?;
        }
        if let Some(size) = lookup("AGENCY_MAX_PAGE_SIZE") {
            self.max_page_size = parse_var("AGENCY_MAX_PAGE_SIZE", &size)?;
        }
        if let Some(filter) = lookup("AGENCY_LOG") {
            self.log_filter = filter;
        }
        if let Some(json) = lookup("AGENCY_JSON_LOGS") {
            self.json_logs = parse_var("AGENCY_JSON_LOGS", &json)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid("max_connections must be at least 1".to_string()));
        }
        if self.max_page_size == 0 {
            return Err(ConfigError::Invalid("max_page_size must be at least 1".to_string()));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "default_page_size must be between 1 and {}",
                self.max_page_size
            )));
        }
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database_path must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("host".to_string()))
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == ":memory:"
    }
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "parts-agency", "agency-server")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
