//! Stage worker pools
//!
//! One pool per stage, each worker looping dequeue -> handle. Handler
//! errors never escape a loop: the job and document rows were already
//! settled by the retry skeleton, so the loop logs and moves on. A shared
//! shutdown flag drains gracefully: workers finish the item in hand and
//! stop dequeuing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info};
use uuid::Uuid;

use docpipe_meta_data::JobKind;

use crate::error::StageError;
use crate::stages::{PipelineContext, handle_job};

/// Worker pool sizing and pacing
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Sleep between polls of an empty queue (milliseconds)
    pub poll_interval_ms: u64,
    /// Concurrent workers per stage
    pub extract_workers: usize,
    pub chunk_workers: usize,
    pub embed_workers: usize,
}

impl WorkerConfig {
    pub fn from_ingestion_config(config: &docpipe_config::IngestionConfig) -> Self {
        Self {
            poll_interval_ms: config.queue_poll_interval_ms,
            extract_workers: config.extract_workers,
            chunk_workers: config.chunk_workers,
            embed_workers: config.embed_workers,
        }
    }
}

/// Hosts the three stage worker pools
pub struct WorkerHost {
    ctx: Arc<PipelineContext>,
    config: WorkerConfig,
    shutdown: Arc<AtomicBool>,
}

impl WorkerHost {
    pub fn new(ctx: Arc<PipelineContext>, config: WorkerConfig) -> Self {
        Self {
            ctx,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag other holders can set to trigger graceful drain
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Run every worker until shutdown, then drain
    pub async fn run(&self) {
        info!(
            extract = self.config.extract_workers,
            chunk = self.config.chunk_workers,
            embed = self.config.embed_workers,
            "Pipeline workers starting"
        );

        let mut join_set = tokio::task::JoinSet::new();
        let pools = [
            (JobKind::Extract, self.config.extract_workers),
            (JobKind::Chunk, self.config.chunk_workers),
            (JobKind::Embed, self.config.embed_workers),
        ];

        for (kind, count) in pools {
            for worker_id in 0..count {
                let ctx = Arc::clone(&self.ctx);
                let shutdown = Arc::clone(&self.shutdown);
                let poll_interval = self.config.poll_interval_ms;

                join_set.spawn(async move {
                    worker_loop(kind, worker_id, ctx, shutdown, poll_interval).await;
                });
            }
        }

        while let Some(result) = join_set.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Worker task panicked");
            }
        }

        info!("Pipeline workers stopped");
    }

    /// Process at most one queued item of the given kind
    ///
    /// Step-by-step driver for tests and operational tooling. Returns the
    /// document id of the processed item, or `None` on an empty queue.
    ///
    /// # Errors
    ///
    /// Returns the stage error when the item's handling ended in failure;
    /// job and document rows have already been settled.
    pub async fn process_one(&self, kind: JobKind) -> Result<Option<Uuid>, StageError> {
        let item = self
            .ctx
            .queue
            .dequeue(kind)
            .await
            .map_err(|e| StageError::Transient(e.to_string()))?;

        match item {
            Some(job) => {
                let document_id = job.document_id;
                handle_job(&self.ctx, &job).await?;
                Ok(Some(document_id))
            }
            None => Ok(None),
        }
    }

    /// Drive every queue to empty, ignoring per-item failures
    ///
    /// Test helper: repeatedly processes items of all kinds until nothing
    /// is left. Failed items have their rows settled by the skeleton, so
    /// draining continues past them.
    pub async fn drain_until_idle(&self) {
        loop {
            let mut progressed = false;
            for kind in JobKind::ALL {
                loop {
                    match self.process_one(kind).await {
                        Ok(Some(_)) => progressed = true,
                        Ok(None) => break,
                        Err(_) => progressed = true,
                    }
                }
            }
            if !progressed {
                break;
            }
        }
    }
}

async fn worker_loop(
    kind: JobKind,
    worker_id: usize,
    ctx: Arc<PipelineContext>,
    shutdown: Arc<AtomicBool>,
    poll_interval_ms: u64,
) {
    debug!(kind = %kind, worker_id, "Worker starting");

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!(kind = %kind, worker_id, "Worker draining on shutdown signal");
            break;
        }

        match ctx.queue.dequeue(kind).await {
            Ok(Some(job)) => {
                let document_id = job.document_id;
                let correlation_id = job.correlation_id;
                if let Err(e) = handle_job(&ctx, &job).await {
                    // Rows already settled; nothing to do but log
                    error!(
                        correlation_id = %correlation_id,
                        kind = %kind,
                        worker_id,
                        document_id = %document_id,
                        error = %e,
                        "Job handling ended in failure"
                    );
                }
            }
            Ok(None) => {
                sleep(Duration::from_millis(poll_interval_ms)).await;
            }
            Err(e) => {
                error!(kind = %kind, worker_id, error = %e, "Failed to dequeue");
                sleep(Duration::from_millis(poll_interval_ms.saturating_mul(5))).await;
            }
        }
    }

    debug!(kind = %kind, worker_id, "Worker stopped");
}
