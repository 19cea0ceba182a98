mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, DatabaseConfig, FeedConfig, LogConfig};
pub use database::{Database, EventRow};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/townsquare[-dev]/` based on TOWNSQUARE_ENV.
///
/// Set TOWNSQUARE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TOWNSQUARE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("townsquare-dev")
    } else {
        base_dir.join("townsquare")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
