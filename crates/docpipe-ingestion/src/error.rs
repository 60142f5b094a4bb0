//! Error taxonomy for the pipeline and the ingestion boundary

use thiserror::Error;

use docpipe_blob_data::BlobDataError;
use docpipe_embeddings::EmbeddingError;
use docpipe_extraction::ExtractionError;
use docpipe_meta_data::MetaDataError;
use docpipe_vector_data::VectorDataError;

/// Stage handler error, classified for the retry skeleton
///
/// `Invalid` and `Internal` are terminal on first sight; only `Transient`
/// enters the backoff loop.
#[derive(Error, Debug)]
pub enum StageError {
    /// Bad input (unsupported format, empty content): retrying the same
    /// bytes cannot help
    #[error("invalid input: {0}")]
    Invalid(String),

    /// Infrastructure hiccup (timeouts, 5xx, deadlocks): retriable with
    /// backoff
    #[error("transient: {0}")]
    Transient(String),

    /// Broken expectation inside the pipeline (missing row, shape
    /// mismatch): terminal, needs a human
    #[error("internal: {0}")]
    Internal(String),
}

impl StageError {
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<ExtractionError> for StageError {
    fn from(e: ExtractionError) -> Self {
        match e {
            // Wrong file type can never succeed
            ExtractionError::UnsupportedFormat { .. } => Self::Invalid(e.to_string()),
            // Decoder crashes get the benefit of the doubt and the backoff
            ExtractionError::DecodeError { .. } => Self::Transient(e.to_string()),
        }
    }
}

impl From<BlobDataError> for StageError {
    fn from(e: BlobDataError) -> Self {
        match e {
            // A blob we expected to have written ourselves is gone
            BlobDataError::NotFound { .. } | BlobDataError::InvalidPath { .. } => {
                Self::Internal(e.to_string())
            }
            BlobDataError::Storage(_) => Self::Transient(e.to_string()),
        }
    }
}

impl From<VectorDataError> for StageError {
    fn from(e: VectorDataError) -> Self {
        match e {
            VectorDataError::DimensionMismatch { .. } | VectorDataError::Payload(_) => {
                Self::Internal(e.to_string())
            }
            _ => Self::Transient(e.to_string()),
        }
    }
}

impl From<EmbeddingError> for StageError {
    fn from(e: EmbeddingError) -> Self {
        match e {
            EmbeddingError::Provider(_) => Self::Transient(e.to_string()),
            _ => Self::Internal(e.to_string()),
        }
    }
}

impl From<MetaDataError> for StageError {
    fn from(e: MetaDataError) -> Self {
        match e {
            // Callers that can treat duplicates as idempotent success
            // intercept before converting
            MetaDataError::DuplicateChunk { .. } => Self::Internal(e.to_string()),
            MetaDataError::NotFound { .. } | MetaDataError::InvalidTransition { .. } => {
                Self::Internal(e.to_string())
            }
            MetaDataError::Connection(_) | MetaDataError::Database(_) => {
                Self::Transient(e.to_string())
            }
            MetaDataError::Serialization(_) => Self::Internal(e.to_string()),
        }
    }
}

/// Errors surfaced at the ingestion/search boundary
#[derive(Error, Debug)]
pub enum IngestError {
    /// Caller sent something unusable (bad extension, oversize, over the
    /// bulk cap)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The referenced entity does not exist for this caller
    #[error("not found: {0}")]
    NotFound(String),

    /// Credential did not resolve to a tenant
    #[error("unauthorized")]
    Unauthorized,

    /// Tenant exceeded its rate limit
    #[error("rate limited")]
    RateLimited,

    /// Anything the caller cannot fix
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<MetaDataError> for IngestError {
    fn from(e: MetaDataError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<BlobDataError> for IngestError {
    fn from(e: BlobDataError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<VectorDataError> for IngestError {
    fn from(e: VectorDataError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<crate::queues::QueueError> for IngestError {
    fn from(e: crate::queues::QueueError) -> Self {
        Self::Internal(e.to_string())
    }
}
