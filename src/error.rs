//! Error types for radiobot
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for radiobot
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Voice gateway errors (join, session lookup, presence)
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Streaming subsystem errors (start or stop of a stream)
    #[error("Stream error: {0}")]
    Stream(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using the radiobot Error
pub type Result<T> = std::result::Result<T, Error>;
