//! Stage handlers and the shared retry skeleton
//!
//! All three stages run the same lifecycle: insert a job row on the first
//! attempt, execute the stage action, and either complete the row or walk
//! the bounded exponential backoff. Retries happen in-process against the
//! same dequeued item; items are never re-enqueued between attempts.

pub mod chunk;
pub mod embed;
pub mod extract;

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use docpipe_blob_data::BlobStore;
use docpipe_common::Clock;
use docpipe_config::IngestionConfig;
use docpipe_embeddings::EmbeddingService;
use docpipe_extraction::ExtractorRegistry;
use docpipe_meta_data::{DocumentRepository, Job, JobKind, JobStatus};
use docpipe_vector_data::VectorStorage;

use crate::error::StageError;
use crate::orchestration;
use crate::queues::{JobPayload, JobQueue, QueuedJob};

/// Everything a stage handler needs, constructor-injected
pub struct PipelineContext {
    pub repository: Arc<dyn DocumentRepository>,
    pub blobs: Arc<dyn BlobStore>,
    pub vectors: Arc<dyn VectorStorage>,
    pub embedder: Arc<dyn EmbeddingService>,
    pub extractors: Arc<ExtractorRegistry>,
    pub queue: Arc<dyn JobQueue>,
    pub clock: Arc<dyn Clock>,
    pub config: IngestionConfig,
}

impl PipelineContext {
    /// Blob path of a document's extracted text
    pub fn text_path(tenant_id: Uuid, document_id: Uuid) -> String {
        format!("{tenant_id}/{document_id}/extracted_text.txt")
    }

    /// Blob path of one chunk's text
    pub fn chunk_path(tenant_id: Uuid, document_id: Uuid, chunk_id: Uuid) -> String {
        format!("{tenant_id}/{document_id}/chunks/{chunk_id}")
    }

    /// Blob path of one chunk's embedding artifact
    pub fn embedding_path(tenant_id: Uuid, document_id: Uuid, chunk_id: Uuid) -> String {
        format!("{tenant_id}/{document_id}/embeddings/{chunk_id}")
    }
}

/// Sleep duration before retry `attempt` (1-based): `base^attempt`, capped
fn backoff_delay(config: &IngestionConfig, attempt: u32) -> Duration {
    let seconds = config
        .retry_backoff_base_secs
        .powi(attempt as i32)
        .min(config.retry_backoff_cap_secs as f64);
    Duration::from_secs_f64(seconds.max(0.0))
}

/// Run one dequeued item through its stage with bounded retries
///
/// On success the job row ends `completed`. A non-retriable error, or a
/// transient error once `retry_count` exceeds `max_retries`, ends the row
/// `failed` and marks the document failed. The returned error is for the
/// worker loop's log line; all state effects have already been recorded.
pub async fn handle_job(ctx: &PipelineContext, job: &QueuedJob) -> Result<(), StageError> {
    let kind = job.kind();
    let job_id = Uuid::new_v4();
    let now = ctx.clock.now();

    // Job rows are created lazily, on the first processing attempt of a
    // dequeued item; retries update this row in place
    ctx.repository
        .insert_job(&Job {
            job_id,
            tenant_id: job.tenant_id,
            document_id: Some(job.document_id),
            kind,
            status: JobStatus::Processing,
            error_message: None,
            retry_count: 0,
            max_retries: ctx.config.max_retries as i32,
            created_at: now,
            updated_at: now,
        })
        .await?;

    if kind == JobKind::Extract {
        orchestration::on_extract_started(&ctx.repository, job.document_id).await?;
    }

    let mut retry_count: u32 = 0;
    loop {
        if retry_count > 0 {
            ctx.repository
                .set_job_retry(job_id, retry_count as i32)
                .await?;
        }

        tracing::info!(
            correlation_id = %job.correlation_id,
            kind = %kind,
            document_id = %job.document_id,
            tenant_id = %job.tenant_id,
            attempt = retry_count + 1,
            "Processing job"
        );

        let result = match &job.payload {
            JobPayload::Extract(payload) => extract::run(ctx, job, payload).await,
            JobPayload::Chunk(payload) => chunk::run(ctx, job, payload).await,
            JobPayload::Embed(payload) => embed::run(ctx, job, payload).await,
        };

        match result {
            Ok(()) => {
                ctx.repository
                    .set_job_status(job_id, JobStatus::Completed, None)
                    .await?;
                return Ok(());
            }
            Err(e) if !e.is_retriable() => {
                tracing::error!(
                    correlation_id = %job.correlation_id,
                    kind = %kind,
                    document_id = %job.document_id,
                    error = %e,
                    "Job failed"
                );
                ctx.repository
                    .set_job_status(job_id, JobStatus::Failed, Some(&e.to_string()))
                    .await?;
                orchestration::on_stage_failed(&ctx.repository, job.document_id).await;
                return Err(e);
            }
            Err(e) => {
                retry_count += 1;
                if retry_count > ctx.config.max_retries {
                    tracing::error!(
                        correlation_id = %job.correlation_id,
                        kind = %kind,
                        document_id = %job.document_id,
                        attempts = retry_count,
                        error = %e,
                        "Job failed after exhausting retries"
                    );
                    // Record the exhausted count, then close the row
                    ctx.repository
                        .set_job_retry(job_id, retry_count as i32)
                        .await?;
                    ctx.repository
                        .set_job_status(job_id, JobStatus::Failed, Some(&e.to_string()))
                        .await?;
                    orchestration::on_stage_failed(&ctx.repository, job.document_id).await;
                    return Err(e);
                }

                let delay = backoff_delay(&ctx.config, retry_count);
                tracing::warn!(
                    correlation_id = %job.correlation_id,
                    kind = %kind,
                    document_id = %job.document_id,
                    error = %e,
                    retry_count,
                    delay_secs = delay.as_secs_f64(),
                    "Transient failure, backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
