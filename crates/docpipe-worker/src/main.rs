//! Pipeline worker daemon
//!
//! Wires the stores and stage worker pools from environment configuration
//! and runs until SIGINT, then drains gracefully (workers finish the item
//! in hand and stop dequeuing).

use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use tracing::info;

use docpipe_blob_data::{BlobStore, ObjectBlobStore};
use docpipe_common::{Clock, SystemClock, init_tracing, initialize_environment};
use docpipe_config::{ApplicationConfig, Validate};
use docpipe_embeddings::{
    DefaultEmbeddingService, EmbeddingProvider, HttpEmbeddingProvider, MockEmbeddingProvider,
};
use docpipe_extraction::ExtractorRegistry;
use docpipe_ingestion::{PipelineContext, TenantFairQueue, WorkerConfig, WorkerHost};
use docpipe_meta_data::{DocumentRepository, PgDocumentRepository, PoolConfig, PoolManager};
use docpipe_vector_data::{QdrantStorage, VectorStorage};

#[tokio::main]
async fn main() -> Result<()> {
    initialize_environment();
    init_tracing();

    let config = ApplicationConfig::from_env();
    config.validate().context("Invalid configuration")?;

    let pools = PoolManager::new(&config.database, PoolConfig::default())
        .await
        .context("Failed to connect to the metadata store")?;
    docpipe_meta_data::run_migrations(pools.write_pool()).await?;
    let repository: Arc<dyn DocumentRepository> = Arc::new(PgDocumentRepository::new(pools));

    let blobs: Arc<dyn BlobStore> =
        Arc::new(ObjectBlobStore::from_config(&config.blob).context("Failed to open blob store")?);

    let vectors: Arc<dyn VectorStorage> = Arc::new(
        QdrantStorage::new(&config.vector_storage)
            .await
            .context("Failed to connect to the vector index")?,
    );

    let provider: Arc<dyn EmbeddingProvider> = match &config.embedding.endpoint {
        Some(_) => Arc::new(HttpEmbeddingProvider::from_config(&config.embedding)?),
        None => {
            info!("No embedding endpoint configured, using the deterministic dev embedder");
            Arc::new(MockEmbeddingProvider::new(config.embedding.dimension))
        }
    };
    let embedder = Arc::new(DefaultEmbeddingService::new(
        provider,
        config.embedding.batch_size,
    ));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let ctx = Arc::new(PipelineContext {
        repository,
        blobs,
        vectors,
        embedder,
        extractors: Arc::new(ExtractorRegistry::default()),
        queue: Arc::new(TenantFairQueue::new()),
        clock,
        config: config.ingestion.clone(),
    });

    let host = WorkerHost::new(ctx, WorkerConfig::from_ingestion_config(&config.ingestion));
    let shutdown = host.shutdown_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, draining workers");
            shutdown.store(true, Ordering::Relaxed);
        }
    });

    host.run().await;
    Ok(())
}
