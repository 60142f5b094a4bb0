//! Embedding service with provider-sized batching

use std::sync::Arc;

use async_trait::async_trait;

use crate::embedding::traits::{EmbeddingProvider, EmbeddingService};
use crate::error::{EmbeddingError, EmbeddingResult};

/// Default embedding service
///
/// Splits inputs into batches of at most `batch_size` texts, calls the
/// provider per batch, and stitches the results back together in order.
pub struct DefaultEmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl DefaultEmbeddingService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
        }
    }
}

#[async_trait]
impl EmbeddingService for DefaultEmbeddingService {
    async fn generate_embeddings(&self, texts: Vec<&str>) -> EmbeddingResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let mut batch_vectors = self.provider.embed_batch(batch).await?;
            if batch_vectors.len() != batch.len() {
                return Err(EmbeddingError::CountMismatch {
                    sent: batch.len(),
                    received: batch_vectors.len(),
                });
            }
            vectors.append(&mut batch_vectors);
        }

        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.provider.embedding_dimension()
    }
}
