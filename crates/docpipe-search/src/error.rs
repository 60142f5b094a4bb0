//! Error types for the search facade

use thiserror::Error;

/// Result type alias for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors surfaced by the search facade
#[derive(Error, Debug)]
pub enum SearchError {
    /// Request failed validation (empty query, limit out of range)
    #[error("invalid search request: {0}")]
    InvalidRequest(String),

    /// Query embedding could not be generated
    #[error("failed to embed query: {0}")]
    Embedding(String),

    /// Vector index failure after retries
    #[error("vector index error: {0}")]
    Index(String),

    /// The whole search exceeded its deadline
    #[error("search timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
}

impl From<docpipe_embeddings::EmbeddingError> for SearchError {
    fn from(e: docpipe_embeddings::EmbeddingError) -> Self {
        Self::Embedding(e.to_string())
    }
}

impl From<docpipe_vector_data::VectorDataError> for SearchError {
    fn from(e: docpipe_vector_data::VectorDataError) -> Self {
        Self::Index(e.to_string())
    }
}
