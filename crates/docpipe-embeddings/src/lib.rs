//! Embedding capability for docpipe

pub mod embedding;
pub mod error;

pub use embedding::{
    DefaultEmbeddingService, EmbeddingProvider, EmbeddingService, HttpEmbeddingProvider,
    MockEmbeddingProvider,
};
pub use error::{EmbeddingError, EmbeddingResult};
