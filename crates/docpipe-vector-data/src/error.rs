//! Error types for vector index operations

use thiserror::Error;

/// Result type alias for vector index operations
pub type VectorDataResult<T> = Result<T, VectorDataError>;

/// Errors that can occur during vector index operations
#[derive(Error, Debug)]
pub enum VectorDataError {
    /// Index backend is unavailable or the connection failed
    #[error("Vector index unavailable: {0}")]
    Unavailable(String),

    /// Query or point vector has the wrong dimension
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Collection operations failed
    #[error("Collection operation failed: {0}")]
    Collection(String),

    /// Backend-specific failure
    #[error("Vector index error: {0}")]
    Storage(String),

    /// Payload could not be encoded or decoded
    #[error("Payload error: {0}")]
    Payload(String),
}

impl From<serde_json::Error> for VectorDataError {
    fn from(e: serde_json::Error) -> Self {
        Self::Payload(e.to_string())
    }
}
