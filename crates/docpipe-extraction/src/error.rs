//! Error types for text extraction

use thiserror::Error;

/// Result type alias for extraction operations
pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// Errors that can occur while turning file bytes into text
///
/// Both variants are non-retriable: retrying the same bytes cannot change
/// the outcome.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// No extractor is registered for the file's extension
    #[error("Unsupported file type: {extension}")]
    UnsupportedFormat { extension: String },

    /// The bytes could not be decoded into text
    #[error("Failed to decode {filename}: {reason}")]
    DecodeError { filename: String, reason: String },
}
