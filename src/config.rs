// ⚙️ Configuration
//
// Defaults < JSON file < environment (PERIODS_DB, PERIODS_LOG, PERIODS_BUSY_TIMEOUT_MS)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

pub const ENV_DATABASE: &str = "PERIODS_DB";
pub const ENV_LOG_LEVEL: &str = "PERIODS_LOG";
pub const ENV_BUSY_TIMEOUT: &str = "PERIODS_BUSY_TIMEOUT_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file
    pub database_path: PathBuf,

    /// How long a connection waits on a locked database before failing
    pub busy_timeout_ms: u64,

    /// trace | debug | info | warn | error
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from("periods.db"),
            busy_timeout_ms: 5_000,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from an optional JSON file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Apply overrides from a key lookup (the environment in production)
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DATABASE) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(raw) = lookup(ENV_BUSY_TIMEOUT) {
            self.busy_timeout_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_BUSY_TIMEOUT.to_string(),
                value: raw.clone(),
            })?;
        }

        self.level()?;
        Ok(self)
    }

    /// Parsed tracing level
    pub fn level(&self) -> Result<Level, ConfigError> {
        self.log_level.parse().map_err(|_| ConfigError::InvalidValue {
            key: "log_level".to_string(),
            value: self.log_level.clone(),
        })
    }
}
