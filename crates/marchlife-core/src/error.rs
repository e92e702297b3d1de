//! Error types for marchlife.

use thiserror::Error;

/// The main error type for marchlife operations.
#[derive(Error, Debug)]
pub enum MarchlifeError {
    /// A grid dimension was zero or negative.
    #[error("invalid grid extent: {axis} = {value} (every dimension must be > 0)")]
    InvalidExtent {
        /// Name of the offending axis (`width`, `height` or `depth`).
        axis: &'static str,
        /// The rejected value.
        value: i64,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Data size mismatch.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// A draw was requested before any extraction pass completed.
    #[error("no extracted surface available - run an extraction pass before rendering")]
    NoSurface,

    /// Device backend error.
    #[error("render error: {0}")]
    Render(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for marchlife operations.
pub type Result<T> = std::result::Result<T, MarchlifeError>;
