// Central Error Type for the Registrar

use std::time::Duration;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::domain::ConfigError),

    #[error("{operation} timed out after {}s", .after.as_secs_f64())]
    ConnectionTimeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Execution error: {0}")]
    Execution(#[from] crate::port::ExecutionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, AppError::ConnectionTimeout { .. })
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion lives in the infra crates
// (orphan rule), each mapping to AppError::Database(String)
