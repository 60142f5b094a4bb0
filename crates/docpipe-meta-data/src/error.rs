//! Error types for metadata-store operations

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for metadata operations
pub type MetaDataResult<T> = Result<T, MetaDataError>;

/// Errors that can occur against the metadata store
#[derive(Error, Debug)]
pub enum MetaDataError {
    /// Row does not exist
    #[error("Not found: {entity} {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// Document status write violated the permitted transition graph
    #[error("Invalid document status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// UNIQUE (document_id, chunk_index) violation; the chunk already
    /// exists, so handlers treat this as idempotent success
    #[error("Chunk index {chunk_index} already exists for document {document_id}")]
    DuplicateChunk {
        document_id: Uuid,
        chunk_index: i32,
    },

    /// Connection or pool failure
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Query execution failure
    #[error("Database error: {0}")]
    Database(String),

    /// Row payload could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl MetaDataError {
    /// True when the error reports already-applied work rather than a
    /// failure
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateChunk { .. })
    }
}

impl From<sqlx::Error> for MetaDataError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Connection(e.to_string())
            }
            _ => Self::Database(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for MetaDataError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
