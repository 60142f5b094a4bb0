//! Deterministic embedding provider for tests and local development
//!
//! Hashes tokens into buckets and normalizes, so identical texts embed
//! identically, overlapping texts land near each other, and no model is
//! needed. Failures can be scripted to exercise retry paths.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::embedding::traits::EmbeddingProvider;
use crate::error::{EmbeddingError, EmbeddingResult};

/// Hash-bucket embedding provider
pub struct MockEmbeddingProvider {
    dimension: usize,
    /// Fail this many leading calls with a transient provider error
    fail_first: usize,
    calls: AtomicUsize,
}

impl MockEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail_first: 0,
            calls: AtomicUsize::new(0),
        }
    }

    /// Make the first `n` calls fail with a transient error, then succeed
    pub const fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    /// Total number of `embed_batch` invocations so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text.to_lowercase().split(|c: char| !c.is_alphanumeric()) {
            if token.is_empty() {
                continue;
            }
            let mut hasher = std::hash::DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dimension;
            if let Some(slot) = vector.get_mut(bucket) {
                *slot += 1.0;
            }
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        if call < self.fail_first {
            return Err(EmbeddingError::Provider(
                "simulated transient embedding failure".into(),
            ));
        }

        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-hash-embedder"
    }
}
