//! Error types for bmpsyncd operations.
//!
//! All errors implement `std::error::Error` via `thiserror`. A dropped
//! write against a disabled table is *not* an error; it is reported as
//! [`crate::WriteOutcome::Disabled`].

use thiserror::Error;

/// Result type alias for bmpsyncd operations.
pub type Result<T> = std::result::Result<T, BmpSyncError>;

/// Errors that can occur while mirroring BMP state into Redis.
#[derive(Error, Debug)]
pub enum BmpSyncError {
    /// Redis is unreachable or the session was lost and could not be
    /// re-established. Not retried at this layer; the caller decides.
    #[error("Redis connection error: {0}")]
    ConnectionError(String),

    /// Redis is reachable but rejected an individual operation.
    #[error("Redis command error: {0}")]
    CommandError(String),

    /// An unrecognized table name or invalid configuration value.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl BmpSyncError {
    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::ConnectionError(message.into())
    }

    /// Creates a command error.
    pub fn command(message: impl Into<String>) -> Self {
        Self::CommandError(message.into())
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }
}
