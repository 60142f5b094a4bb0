//! Embedding artifact sidecar files
//!
//! Each embedded chunk leaves a small Parquet file beside its vector-index
//! entry: `chunk_id | vector | payload`. The sidecar makes the index
//! rebuildable from blob storage alone and survives schema evolution the
//! way columnar files do. The codec lives here so the format can be
//! swapped without touching the embed stage.

use std::sync::Arc;

use arrow::array::{Array, Float32Builder, ListArray, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use thiserror::Error;
use uuid::Uuid;

/// Errors from encoding or decoding artifacts
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Artifact encoding error: {0}")]
    Encode(String),

    #[error("Artifact decoding error: {0}")]
    Decode(String),
}

impl From<arrow::error::ArrowError> for ArtifactError {
    fn from(e: arrow::error::ArrowError) -> Self {
        Self::Encode(e.to_string())
    }
}

impl From<parquet::errors::ParquetError> for ArtifactError {
    fn from(e: parquet::errors::ParquetError) -> Self {
        Self::Encode(e.to_string())
    }
}

/// One embedded chunk's artifact row
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingArtifact {
    pub chunk_id: Uuid,
    pub vector: Vec<f32>,
    /// The vector point's payload, as JSON
    pub payload: serde_json::Value,
}

fn artifact_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("chunk_id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::List(Arc::new(Field::new("item", DataType::Float32, true))),
            false,
        ),
        Field::new("payload", DataType::Utf8, false),
    ]))
}

/// Encode an artifact to Parquet bytes
///
/// # Errors
///
/// Returns `ArtifactError::Encode` if the batch cannot be built or
/// written.
pub fn encode_artifact(artifact: &EmbeddingArtifact) -> Result<Vec<u8>, ArtifactError> {
    let schema = artifact_schema();

    let mut vector_builder = ListBuilder::new(Float32Builder::new());
    vector_builder.values().append_slice(&artifact.vector);
    vector_builder.append(true);

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(vec![artifact.chunk_id.to_string()])),
            Arc::new(vector_builder.finish()),
            Arc::new(StringArray::from(vec![artifact.payload.to_string()])),
        ],
    )?;

    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(buffer)
}

/// Decode an artifact from Parquet bytes
///
/// # Errors
///
/// Returns `ArtifactError::Decode` if the file is malformed or does not
/// carry exactly one row of the expected columns.
pub fn decode_artifact(bytes: Bytes) -> Result<EmbeddingArtifact, ArtifactError> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(bytes)
        .map_err(|e| ArtifactError::Decode(e.to_string()))?
        .build()
        .map_err(|e| ArtifactError::Decode(e.to_string()))?;

    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch.map_err(|e| ArtifactError::Decode(e.to_string()))?);
    }
    let batch = batches
        .first()
        .filter(|b| b.num_rows() == 1)
        .ok_or_else(|| ArtifactError::Decode("expected exactly one artifact row".into()))?;

    let chunk_ids = batch
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| ArtifactError::Decode("chunk_id column has wrong type".into()))?;
    let vectors = batch
        .column(1)
        .as_any()
        .downcast_ref::<ListArray>()
        .ok_or_else(|| ArtifactError::Decode("vector column has wrong type".into()))?;
    let payloads = batch
        .column(2)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| ArtifactError::Decode("payload column has wrong type".into()))?;

    let chunk_id = Uuid::parse_str(chunk_ids.value(0))
        .map_err(|e| ArtifactError::Decode(format!("bad chunk_id: {e}")))?;

    let vector_values = vectors.value(0);
    let floats = vector_values
        .as_any()
        .downcast_ref::<arrow::array::Float32Array>()
        .ok_or_else(|| ArtifactError::Decode("vector items have wrong type".into()))?;
    let vector: Vec<f32> = (0..floats.len()).map(|i| floats.value(i)).collect();

    let payload = serde_json::from_str(payloads.value(0))
        .map_err(|e| ArtifactError::Decode(format!("bad payload JSON: {e}")))?;

    Ok(EmbeddingArtifact {
        chunk_id,
        vector,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_round_trips_through_parquet() {
        let artifact = EmbeddingArtifact {
            chunk_id: Uuid::new_v4(),
            vector: vec![0.25, -0.5, 0.125, 1.0],
            payload: serde_json::json!({
                "tenant_id": Uuid::new_v4().to_string(),
                "chunk_index": 3,
                "filename": "report.txt",
            }),
        };

        let bytes = encode_artifact(&artifact).unwrap();
        let decoded = decode_artifact(Bytes::from(bytes)).unwrap();
        assert_eq!(decoded, artifact);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = decode_artifact(Bytes::from_static(b"not parquet")).unwrap_err();
        assert!(matches!(err, ArtifactError::Decode(_)));
    }
}
