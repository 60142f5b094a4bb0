//! Error types for embedding generation

use thiserror::Error;

/// Result type alias for embedding operations
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Errors that can occur during embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Provider failed to produce embeddings (timeouts, 5xx, overload)
    #[error("Embedding provider error: {0}")]
    Provider(String),

    /// Provider returned a vector of unexpected width
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Provider returned the wrong number of vectors
    #[error("Embedding count mismatch: sent {sent} texts, got {received} vectors")]
    CountMismatch { sent: usize, received: usize },

    /// Provider misconfiguration
    #[error("Embedding configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(e: reqwest::Error) -> Self {
        Self::Provider(e.to_string())
    }
}
