//! Shared harness for pipeline integration tests
//!
//! Composes the real handlers and queue with the in-memory store doubles,
//! a manual clock, and the deterministic embedder.
#![allow(dead_code)]

use std::sync::Arc;

use docpipe_blob_data::{BlobStore, ObjectBlobStore};
use docpipe_common::{Clock, ManualClock};
use docpipe_config::ApplicationConfig;
use docpipe_embeddings::{DefaultEmbeddingService, EmbeddingProvider, MockEmbeddingProvider};
use docpipe_extraction::ExtractorRegistry;
use docpipe_ingestion::{
    IngestionService, JobQueue, PipelineContext, TenantFairQueue, WorkerConfig, WorkerHost,
};
use docpipe_meta_data::{DocumentRepository, MockMetadataStore, Tenant};
use docpipe_search::SearchService;
use docpipe_vector_data::{MockVectorStorage, VectorStorage};

/// Embedding width used across the integration suite
pub const DIM: usize = 64;

pub struct Harness {
    pub repository: Arc<MockMetadataStore>,
    pub blobs: Arc<ObjectBlobStore>,
    pub vectors: Arc<MockVectorStorage>,
    pub provider: Arc<MockEmbeddingProvider>,
    pub queue: Arc<TenantFairQueue>,
    pub clock: Arc<ManualClock>,
    pub ctx: Arc<PipelineContext>,
    pub host: WorkerHost,
    pub service: IngestionService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(
            Arc::new(MockEmbeddingProvider::new(DIM)),
            ExtractorRegistry::default(),
        )
    }

    pub fn with(provider: Arc<MockEmbeddingProvider>, extractors: ExtractorRegistry) -> Self {
        let clock = Arc::new(ManualClock::epoch());
        let repository = Arc::new(MockMetadataStore::new(
            Arc::clone(&clock) as Arc<dyn Clock>
        ));
        let blobs = Arc::new(ObjectBlobStore::memory());
        let vectors = Arc::new(MockVectorStorage::new());
        let queue = Arc::new(TenantFairQueue::new());

        let embedder = Arc::new(DefaultEmbeddingService::new(
            Arc::clone(&provider) as Arc<dyn EmbeddingProvider>,
            100,
        ));

        let app_config = ApplicationConfig::default();
        let ctx = Arc::new(PipelineContext {
            repository: Arc::clone(&repository) as Arc<dyn DocumentRepository>,
            blobs: Arc::clone(&blobs) as Arc<dyn BlobStore>,
            vectors: Arc::clone(&vectors) as Arc<dyn VectorStorage>,
            embedder,
            extractors: Arc::new(extractors),
            queue: Arc::clone(&queue) as Arc<dyn JobQueue>,
            clock: Arc::clone(&clock) as Arc<dyn Clock>,
            config: app_config.ingestion.clone(),
        });

        let host = WorkerHost::new(
            Arc::clone(&ctx),
            WorkerConfig {
                poll_interval_ms: 10,
                extract_workers: 1,
                chunk_workers: 1,
                embed_workers: 1,
            },
        );

        let service = IngestionService::new(
            Arc::clone(&repository) as Arc<dyn DocumentRepository>,
            Arc::clone(&blobs) as Arc<dyn BlobStore>,
            Arc::clone(&vectors) as Arc<dyn VectorStorage>,
            Arc::clone(&queue) as Arc<dyn JobQueue>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            app_config.upload,
        );

        Self {
            repository,
            blobs,
            vectors,
            provider,
            queue,
            clock,
            ctx,
            host,
            service,
        }
    }

    pub async fn tenant(&self, name: &str) -> Tenant {
        self.service
            .create_tenant(name, 100, &format!("{name}-api-key"))
            .await
            .unwrap()
    }

    /// Search facade wired to this harness's index and embedder
    pub fn search_service(&self) -> SearchService {
        SearchService::new(
            Arc::new(DefaultEmbeddingService::new(
                Arc::new(MockEmbeddingProvider::new(DIM)) as Arc<dyn EmbeddingProvider>,
                100,
            )),
            Arc::clone(&self.vectors) as Arc<dyn VectorStorage>,
        )
    }
}
