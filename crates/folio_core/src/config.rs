//! Runtime configuration for embedding processes.
//!
//! Values come from the environment; anything unset falls back to
//! defaults that keep the core usable without setup (in-memory database,
//! logging disabled).

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::logging::{default_log_level, init_logging};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Env var holding the SQLite database path.
pub const ENV_DB_PATH: &str = "FOLIO_DB_PATH";
/// Env var holding the log level (`trace|debug|info|warn|error`).
pub const ENV_LOG_LEVEL: &str = "FOLIO_LOG_LEVEL";
/// Env var holding the absolute log directory.
pub const ENV_LOG_DIR: &str = "FOLIO_LOG_DIR";

/// Core configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite file. `None` selects a private in-memory database.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// Absolute directory for rolling logs. `None` leaves logging off.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let defaults = Self::default();
        Self {
            db_path: read(ENV_DB_PATH).map(PathBuf::from),
            log_level: read(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_dir: read(ENV_LOG_DIR).map(PathBuf::from),
        }
    }

    /// Starts file logging when a log directory is configured.
    ///
    /// Returns `Ok(false)` when logging stays disabled.
    pub fn init_logging(&self) -> Result<bool, String> {
        match &self.log_dir {
            Some(log_dir) => init_logging(&self.log_level, log_dir).map(|()| true),
            None => Ok(false),
        }
    }

    /// Opens the configured database with migrations applied.
    pub fn open_db(&self) -> DbResult<Connection> {
        match &self.db_path {
            Some(path) => open_db(path),
            None => open_db_in_memory(),
        }
    }
}
