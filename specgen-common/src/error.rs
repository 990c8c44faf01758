//! Common error types for specgen

use thiserror::Error;

/// Common result type for specgen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared by configuration loading and logger construction
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or parameter value
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
