//! Environment-driven startup configuration.

use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on. Listen address is always `0.0.0.0`.
    pub port: u16,
    /// Base directory for the `sled` database.
    pub db_path: PathBuf,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid PORT: {0}")]
    InvalidPort(String),

    #[error("Could not determine a default database path for this platform")]
    NoDefaultDbPath,
}

impl Config {
    /// Build configuration from the environment, falling back to the
    /// same defaults as the original server: port 8000 and an
    /// OS-appropriate per-user data directory.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("PORT") {
            Ok(value) => value.parse().map_err(|_| ConfigError::InvalidPort(value))?,
            Err(_) => 8000,
        };

        let db_path = match env::var("ASNS_DB_PATH") {
            Ok(value) => PathBuf::from(value),
            Err(_) => default_db_path()?,
        };

        Ok(Self { port, db_path })
    }
}

fn default_db_path() -> Result<PathBuf, ConfigError> {
    let home = dirs_home().ok_or(ConfigError::NoDefaultDbPath)?;

    if cfg!(target_os = "windows") {
        Ok(env::var("APPDATA").map(PathBuf::from).unwrap_or(home).join("asns"))
    } else if cfg!(target_os = "macos") {
        Ok(home.join("Library/Application Support/asns"))
    } else {
        Ok(home.join(".asns"))
    }
}

fn dirs_home() -> Option<PathBuf> {
    env::var_os("HOME").map(PathBuf::from)
}
