//! Search service implementation
//!
//! Embeds the query, dispatches a tenant-filtered vector search, and
//! projects the hits. Resilience follows the pipeline's house style:
//! bounded retries with exponential backoff, a whole-operation timeout,
//! and a small LRU cache of recent results.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use tokio::time::{Duration, sleep};
use uuid::Uuid;

use docpipe_common::CorrelationId;
use docpipe_embeddings::EmbeddingService;
use docpipe_vector_data::{SearchHit, VectorStorage};

use crate::error::{SearchError, SearchResult};
use crate::search::SearchRequest;

type SearchCache = Mutex<lru::LruCache<String, Vec<SearchHit>>>;

const CACHE_CAPACITY: usize = 100;

/// Tenant-scoped semantic search
pub struct SearchService {
    embedder: Arc<dyn EmbeddingService>,
    vectors: Arc<dyn VectorStorage>,
    max_retries: usize,
    retry_delay: Duration,
    search_timeout: Duration,
    cache: SearchCache,
}

impl SearchService {
    pub fn new(embedder: Arc<dyn EmbeddingService>, vectors: Arc<dyn VectorStorage>) -> Self {
        Self::with_retry_config(
            embedder,
            vectors,
            3,
            Duration::from_millis(100),
            Duration::from_secs(30),
        )
    }

    /// Custom retry/timeout tuning
    #[allow(clippy::unwrap_used)]
    pub fn with_retry_config(
        embedder: Arc<dyn EmbeddingService>,
        vectors: Arc<dyn VectorStorage>,
        max_retries: usize,
        retry_delay: Duration,
        search_timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            vectors,
            max_retries,
            retry_delay,
            search_timeout,
            cache: Mutex::new(lru::LruCache::new(
                NonZeroUsize::new(CACHE_CAPACITY).unwrap(),
            )),
        }
    }

    /// Run a search for one tenant
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for out-of-bounds parameters, `Timeout` when the
    /// deadline passes, otherwise the last retry's error.
    #[tracing::instrument(skip(self, request), fields(tenant_id = %tenant_id, query = %request.query, limit = request.limit, correlation_id = tracing::field::Empty))]
    pub async fn search(
        &self,
        tenant_id: Uuid,
        request: &SearchRequest,
    ) -> SearchResult<Vec<SearchHit>> {
        request.validate()?;

        // One id per query, shared by every retry of it
        let correlation_id = CorrelationId::new();
        tracing::Span::current().record("correlation_id", correlation_id.to_string());

        let cache_key = format!(
            "{tenant_id}:{}:{}:{}",
            request.query, request.limit, request.score_threshold
        );
        #[allow(clippy::unwrap_used)]
        if let Some(cached) = self.cache.lock().unwrap().get(&cache_key) {
            tracing::debug!("Search cache hit");
            return Ok(cached.clone());
        }

        let mut attempt = 0;
        loop {
            match self.try_search(tenant_id, request, &correlation_id).await {
                Ok(hits) => {
                    #[allow(clippy::unwrap_used)]
                    self.cache.lock().unwrap().put(cache_key, hits.clone());
                    return Ok(hits);
                }
                Err(e @ SearchError::InvalidRequest(_)) => return Err(e),
                Err(e) if attempt < self.max_retries => {
                    let delay = self.retry_delay * 2_u32.saturating_pow(attempt as u32);
                    tracing::warn!(
                        correlation_id = %correlation_id,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Search attempt failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        correlation_id = %correlation_id,
                        attempts = attempt + 1,
                        error = %e,
                        "Search failed"
                    );
                    return Err(e);
                }
            }
        }
    }

    async fn try_search(
        &self,
        tenant_id: Uuid,
        request: &SearchRequest,
        correlation_id: &CorrelationId,
    ) -> SearchResult<Vec<SearchHit>> {
        let operation = async {
            let embeddings = self
                .embedder
                .generate_embeddings(vec![request.query.as_str()])
                .await?;
            let query_vector = embeddings
                .into_iter()
                .next()
                .ok_or_else(|| SearchError::Embedding("embedder returned no vector".into()))?;

            let hits = self
                .vectors
                .search(
                    query_vector,
                    tenant_id,
                    request.limit,
                    request.score_threshold,
                    correlation_id,
                )
                .await?;

            // The index already filtered by tenant; drop anything that
            // slipped through anyway rather than trust it
            let mut safe_hits = Vec::with_capacity(hits.len());
            for hit in hits {
                if hit.tenant_id == tenant_id {
                    safe_hits.push(hit);
                } else {
                    tracing::warn!(
                        correlation_id = %correlation_id,
                        expected_tenant = %tenant_id,
                        found_tenant = %hit.tenant_id,
                        chunk_id = %hit.chunk_id,
                        "Dropping cross-tenant hit from index response"
                    );
                }
            }

            Ok(safe_hits)
        };

        tokio::time::timeout(self.search_timeout, operation)
            .await
            .map_err(|_| SearchError::Timeout {
                timeout_ms: self.search_timeout.as_millis() as u64,
            })?
    }
}
