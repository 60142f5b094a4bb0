//! Extract stage: source blob -> extracted text blob
//!
//! Reads the uploaded file, dispatches to a format extractor by extension,
//! persists the text, records the text pointer on the document, and fans
//! out one chunk job. The blob write and metadata merge are
//! overwrite-safe; a duplicate downstream chunk job is absorbed by the
//! chunk stage's insert-if-absent.

use bytes::Bytes;

use crate::error::StageError;
use crate::queues::{ChunkPayload, ExtractPayload, JobPayload, QueuedJob};
use crate::stages::PipelineContext;

pub async fn run(
    ctx: &PipelineContext,
    job: &QueuedJob,
    payload: &ExtractPayload,
) -> Result<(), StageError> {
    let bytes = ctx.blobs.get(&payload.file_path).await?;

    let text = ctx.extractors.extract(&bytes, &payload.filename)?;

    let text_path = PipelineContext::text_path(job.tenant_id, job.document_id);
    ctx.blobs
        .put(&text_path, Bytes::from(text.clone().into_bytes()), "text/plain")
        .await?;

    ctx.repository
        .merge_document_metadata(
            job.document_id,
            serde_json::json!({
                "text_path": text_path,
                "text_length": text.chars().count(),
            }),
        )
        .await?;

    // Downstream fan-out only after every database effect is durable
    ctx.queue
        .enqueue(QueuedJob {
            tenant_id: job.tenant_id,
            document_id: job.document_id,
            priority: job.priority,
            correlation_id: job.correlation_id,
            payload: JobPayload::Chunk(ChunkPayload {
                text_path,
                filename: payload.filename.clone(),
            }),
        })
        .await
        .map_err(|e| StageError::Transient(e.to_string()))?;

    tracing::info!(
        correlation_id = %job.correlation_id,
        document_id = %job.document_id,
        filename = %payload.filename,
        text_chars = text.chars().count(),
        "Extracted text"
    );
    Ok(())
}
