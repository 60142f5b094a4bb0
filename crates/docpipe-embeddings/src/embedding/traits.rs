//! Trait abstractions for embedding generation

use async_trait::async_trait;

use crate::EmbeddingResult;

/// Trait for embedding generation providers
///
/// Abstracts over where vectors come from (remote service, in-process
/// model, test double); every provider produces fixed-width vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a batch of texts, one vector per input in
    /// input order
    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>>;

    /// Width of every produced vector
    fn embedding_dimension(&self) -> usize;

    /// Name of the underlying model
    fn model_name(&self) -> &str;
}

/// Service coordinating embedding generation
///
/// Splits large inputs into provider-sized batches and validates shape.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Generate embeddings for the given texts
    async fn generate_embeddings(&self, texts: Vec<&str>) -> EmbeddingResult<Vec<Vec<f32>>>;

    /// Width of every produced vector
    fn dimension(&self) -> usize;
}
