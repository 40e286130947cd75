//! Errors raised by the runner API itself
//!
//! Failures of user code are not errors: they are captured as
//! [`Failure`](crate::boundary::Failure) values and reported through events.

use hiro_config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HiroError {
    #[error("A run is already in progress")]
    AlreadyRunning,

    #[error("'{name}' is reserved and cannot name a {kind} in suite '{suite}'")]
    ReservedName {
        suite: String,
        name: String,
        kind: &'static str,
    },

    #[error("Poll interval must be greater than zero")]
    InvalidPollInterval,

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for runner operations
pub type HiroResult<T> = Result<T, HiroError>;
