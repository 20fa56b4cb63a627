//! Common error types for MGC

use thiserror::Error;

/// Common result type for MGC operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the MGC crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audio container/codec could not be read
    #[error("Decode error: {0}")]
    Decode(String),

    /// DSP stage produced no usable result
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Model bundle is missing, malformed, or incompatible
    #[error("Model error: {0}")]
    Model(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
