//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `SQLFRAME_*` environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::frame::ResultFormat;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub sqlite: SqliteConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Query execution configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Name given to every result frame
    #[serde(default = "default_frame_name")]
    pub frame_name: String,

    /// Deadline for a single database call
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Format used when a query declares none
    #[serde(default = "default_format")]
    pub default_format: String,
}

fn default_frame_name() -> String {
    "response".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_format() -> String {
    "time series".to_string()
}

impl QueryConfig {
    /// Parsed default format; unrecognized values fall back to time series
    pub fn default_result_format(&self) -> ResultFormat {
        ResultFormat::from_declared(&self.default_format)
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            frame_name: default_frame_name(),
            timeout_secs: default_timeout(),
            default_format: default_format(),
        }
    }
}

/// SQLite executor configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Database file; an in-memory database is used when unset
    pub path: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("sqlframe").join("config.toml")),
            Some(PathBuf::from("/etc/sqlframe/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Query overrides
        if let Some(name) = lookup("SQLFRAME_FRAME_NAME") {
            self.query.frame_name = name;
        }
        if let Some(timeout) = lookup("SQLFRAME_QUERY_TIMEOUT_SECS") {
            match timeout.parse() {
                Ok(secs) => self.query.timeout_secs = secs,
                Err(_) => tracing::warn!("Ignoring invalid SQLFRAME_QUERY_TIMEOUT_SECS: {}", timeout),
            }
        }
        if let Some(format) = lookup("SQLFRAME_DEFAULT_FORMAT") {
            self.query.default_format = format;
        }

        // SQLite overrides
        if let Some(path) = lookup("SQLFRAME_SQLITE_PATH") {
            self.sqlite.path = Some(path);
        }

        // Logging overrides
        if let Some(level) = lookup("SQLFRAME_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("SQLFRAME_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# sqlframe Configuration
#
# Environment variables override these settings:
# - SQLFRAME_FRAME_NAME
# - SQLFRAME_QUERY_TIMEOUT_SECS
# - SQLFRAME_DEFAULT_FORMAT
# - SQLFRAME_SQLITE_PATH
# - SQLFRAME_LOG_LEVEL
# - SQLFRAME_LOG_FORMAT

[query]
# Name of every result frame
frame_name = "response"

# Deadline for a single database call (seconds)
timeout_secs = 30

# Format used when a query declares none: "table" or "time series"
default_format = "time series"

[sqlite]
# Database file used by `sqlframe run`; in-memory when unset
# path = "/var/lib/sqlframe/metrics.db"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/sqlframe/sqlframe.log"
"#
    .to_string()
}
