//! Error types for blob storage operations

use thiserror::Error;

/// Result type alias for blob operations
pub type BlobDataResult<T> = Result<T, BlobDataError>;

/// Errors that can occur against the blob store
#[derive(Error, Debug)]
pub enum BlobDataError {
    /// No object at the given path
    #[error("Blob not found: {path}")]
    NotFound { path: String },

    /// Path could not be interpreted by the backend
    #[error("Invalid blob path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// Backend failure (unreachable, permission, partial write)
    #[error("Blob storage error: {0}")]
    Storage(String),
}

impl From<object_store::Error> for BlobDataError {
    fn from(e: object_store::Error) -> Self {
        match e {
            object_store::Error::NotFound { path, .. } => Self::NotFound { path },
            other => Self::Storage(other.to_string()),
        }
    }
}
