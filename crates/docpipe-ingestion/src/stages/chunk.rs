//! Chunk stage: extracted text -> chunk rows + chunk blobs
//!
//! Segments the text, persists every chunk (blob then row), and only then
//! fans out one embed job per chunk row. Re-execution is absorbed by the
//! UNIQUE (document_id, chunk_index) constraint: a duplicate insert is
//! idempotent success for that chunk, and the embed fan-out is driven from
//! the rows actually in the store, so duplicates converge on the same set.

use bytes::Bytes;
use uuid::Uuid;

use docpipe_extraction::{ChunkingConfig, chunk_text};
use docpipe_meta_data::Chunk;

use crate::error::StageError;
use crate::queues::{ChunkPayload, EmbedPayload, JobPayload, QueuedJob};
use crate::stages::PipelineContext;

pub async fn run(
    ctx: &PipelineContext,
    job: &QueuedJob,
    payload: &ChunkPayload,
) -> Result<(), StageError> {
    let bytes = ctx.blobs.get(&payload.text_path).await?;
    let text = String::from_utf8_lossy(&bytes);

    let chunking = ChunkingConfig::from_tokens(
        ctx.config.chunk_size_tokens,
        ctx.config.chunk_overlap_tokens,
    );
    let pieces = chunk_text(&text, &chunking);

    if pieces.is_empty() {
        // A document with no extractable content terminates here
        return Err(StageError::Invalid("document produced no chunks".into()));
    }

    for piece in &pieces {
        let chunk_id = Uuid::new_v4();
        let chunk_path = PipelineContext::chunk_path(job.tenant_id, job.document_id, chunk_id);

        ctx.blobs
            .put(
                &chunk_path,
                Bytes::from(piece.text.clone().into_bytes()),
                "text/plain",
            )
            .await?;

        let insert = ctx
            .repository
            .insert_chunk(&Chunk {
                chunk_id,
                document_id: job.document_id,
                tenant_id: job.tenant_id,
                chunk_index: piece.index as i32,
                text: piece.text.clone(),
                embedding_path: None,
                created_at: ctx.clock.now(),
            })
            .await;

        match insert {
            Ok(()) => {}
            Err(e) if e.is_duplicate() => {
                // A previous execution already owns this index; drop the
                // blob we just wrote for the losing id
                tracing::debug!(
                    document_id = %job.document_id,
                    chunk_index = piece.index,
                    "Chunk already persisted, skipping"
                );
                let _ = ctx.blobs.delete(&chunk_path).await;
            }
            Err(e) => return Err(e.into()),
        }
    }

    // Fan out from the rows that actually exist, so duplicate executions
    // enqueue embeds for the surviving chunk ids
    let rows = ctx.repository.get_document_chunks(job.document_id).await?;
    for row in &rows {
        ctx.queue
            .enqueue(QueuedJob {
                tenant_id: job.tenant_id,
                document_id: job.document_id,
                priority: job.priority,
                correlation_id: job.correlation_id,
                payload: JobPayload::Embed(EmbedPayload {
                    chunk_id: row.chunk_id,
                    chunk_path: PipelineContext::chunk_path(
                        job.tenant_id,
                        job.document_id,
                        row.chunk_id,
                    ),
                    filename: payload.filename.clone(),
                }),
            })
            .await
            .map_err(|e| StageError::Transient(e.to_string()))?;
    }

    tracing::info!(
        correlation_id = %job.correlation_id,
        document_id = %job.document_id,
        filename = %payload.filename,
        chunk_count = rows.len(),
        "Chunked document"
    );
    Ok(())
}
