//! Service Configuration
//!
//! A single JSON document read once at process start. Every field has a
//! default, so `{}` is a complete configuration for an in-memory server.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cli::{CliError, CliResult};
use crate::session::MAX_TTL_HOURS;

/// Top-level configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Relational backend; `None` keeps all state in process memory
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub log: LogConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to (default: "127.0.0.1")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 9090)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins; empty means permissive
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Seconds in-flight requests get to finish after a shutdown signal
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

/// PostgreSQL connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_host")]
    pub host: String,

    #[serde(default = "default_db_port")]
    pub port: u16,

    pub username: String,

    #[serde(default)]
    pub password: String,

    pub dbname: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Session token and cookie settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Random bytes per token before hex encoding
    #[serde(default = "default_token_bytes")]
    pub token_bytes: usize,

    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,
}

/// Logging settings; `RUST_LOG` overrides `filter`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,

    #[serde(default)]
    pub json: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9090
}

fn default_shutdown_grace_secs() -> u64 {
    30
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_max_connections() -> u32 {
    5
}

fn default_cookie_name() -> String {
    "session_token".to_string()
}

fn default_token_bytes() -> usize {
    32
}

fn default_ttl_hours() -> i64 {
    24
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            token_bytes: default_token_bytes(),
            ttl_hours: default_ttl_hours(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        Self::from_json(&content)
    }

    /// Parse and validate a configuration document
    pub fn from_json(content: &str) -> CliResult<Self> {
        let config: AppConfig = serde_json::from_str(content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.server.port == 0 {
            return Err(CliError::config_error("server.port must be > 0"));
        }

        if self.session.token_bytes < 16 {
            return Err(CliError::config_error("session.token_bytes must be >= 16"));
        }

        if self.session.ttl_hours < 1 || self.session.ttl_hours > MAX_TTL_HOURS {
            return Err(CliError::config_error(format!(
                "session.ttl_hours must be between 1 and {}",
                MAX_TTL_HOURS
            )));
        }

        if self.session.cookie_name.trim().is_empty() {
            return Err(CliError::config_error("session.cookie_name must not be empty"));
        }

        if let Some(db) = &self.database {
            if db.dbname.trim().is_empty() {
                return Err(CliError::config_error("database.dbname must not be empty"));
            }
            if db.max_connections == 0 {
                return Err(CliError::config_error("database.max_connections must be > 0"));
            }
        }

        Ok(())
    }

    /// Copy of this config safe to print
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let Some(db) = copy.database.as_mut() {
            if !db.password.is_empty() {
                db.password = "********".to_string();
            }
        }
        copy
    }
}
