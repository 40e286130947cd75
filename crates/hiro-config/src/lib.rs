//! Hiro Configuration System
//!
//! Provides configuration management for Hiro test runs:
//! - Project configuration (hiro.toml)
//! - Global user configuration (~/.hiro/config.toml)
//! - Configuration precedence and merging
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Global config (~/.hiro/config.toml)
//! 2. Project config (./hiro.toml)
//! 3. Environment variables (HIRO_*)
//! 4. Explicit arguments from the caller
//!
//! # Example
//!
//! ```no_run
//! use hiro_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("polling every {:?}", config.poll_interval());
//! ```

pub mod global;
pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Default scheduler poll period in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Upper bound accepted for the poll period (one minute)
pub const MAX_POLL_INTERVAL_MS: u64 = 60_000;

/// Name of the project configuration file
pub const PROJECT_CONFIG_FILE: &str = "hiro.toml";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Check a poll period against the accepted range
pub fn validate_poll_interval(field: &str, millis: u64) -> ConfigResult<()> {
    if millis == 0 || millis > MAX_POLL_INTERVAL_MS {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!(
                "must be between 1 and {} milliseconds, got {}",
                MAX_POLL_INTERVAL_MS, millis
            ),
        });
    }
    Ok(())
}

// Re-export main types
pub use global::GlobalConfig;
pub use loader::{Config, ConfigLoader};
pub use project::{ProjectConfig, ReporterConfig, RunnerConfig};
