//! Embed stage: chunk text -> vector point + artifact + chunk row update
//!
//! Embeds one chunk, upserts its point (payload tenant taken from the
//! chunk row, preserving isolation), writes the Parquet artifact, records
//! the artifact path, and finally asks orchestration whether this was the
//! document's last outstanding chunk. Upsert and blob write are
//! replace-safe by id, so re-execution converges.

use bytes::Bytes;

use docpipe_vector_data::{PointPayload, VectorPoint};

use crate::artifact::{EmbeddingArtifact, encode_artifact};
use crate::error::StageError;
use crate::orchestration;
use crate::queues::{EmbedPayload, QueuedJob};
use crate::stages::PipelineContext;

pub async fn run(
    ctx: &PipelineContext,
    job: &QueuedJob,
    payload: &EmbedPayload,
) -> Result<(), StageError> {
    let bytes = ctx.blobs.get(&payload.chunk_path).await?;
    let text = String::from_utf8_lossy(&bytes).into_owned();

    let vectors = ctx.embedder.generate_embeddings(vec![&text]).await?;
    let vector = vectors
        .into_iter()
        .next()
        .ok_or_else(|| StageError::Internal("embedder returned no vector".into()))?;

    let chunk = ctx
        .repository
        .get_chunk(payload.chunk_id)
        .await?
        .ok_or_else(|| {
            StageError::Internal(format!("chunk {} not found in database", payload.chunk_id))
        })?;

    let point_payload = PointPayload {
        tenant_id: chunk.tenant_id,
        document_id: chunk.document_id,
        chunk_id: chunk.chunk_id,
        chunk_index: i64::from(chunk.chunk_index),
        filename: payload.filename.clone(),
        text: text.clone(),
        metadata: serde_json::json!({ "chunk_index": chunk.chunk_index }),
    };

    ctx.vectors
        .upsert_points(
            vec![VectorPoint {
                id: chunk.chunk_id,
                vector: vector.clone(),
                payload: point_payload.clone(),
            }],
            &job.correlation_id,
        )
        .await?;

    let artifact = EmbeddingArtifact {
        chunk_id: chunk.chunk_id,
        vector,
        payload: serde_json::to_value(&point_payload)
            .map_err(|e| StageError::Internal(e.to_string()))?,
    };
    let artifact_bytes =
        encode_artifact(&artifact).map_err(|e| StageError::Internal(e.to_string()))?;

    let artifact_path =
        PipelineContext::embedding_path(job.tenant_id, job.document_id, chunk.chunk_id);
    ctx.blobs
        .put(
            &artifact_path,
            Bytes::from(artifact_bytes),
            "application/octet-stream",
        )
        .await?;

    ctx.repository
        .set_chunk_embedding_path(chunk.chunk_id, &artifact_path)
        .await?;

    let completed = orchestration::on_embed_completed(&ctx.repository, job.document_id).await?;
    if completed {
        tracing::info!(document_id = %job.document_id, "All chunks embedded");
    }

    tracing::debug!(
        correlation_id = %job.correlation_id,
        chunk_id = %chunk.chunk_id,
        document_id = %job.document_id,
        "Embedded chunk"
    );
    Ok(())
}
