//! docpipe ingestion pipeline
//!
//! The control plane of the system: the tenant-fair job queue, the
//! Extract -> Chunk -> Embed stage machine with bounded retries, document
//! orchestration, and the tenant-facing ingestion facade.

pub mod artifact;
pub mod error;
pub mod ingest;
pub mod orchestration;
pub mod queues;
pub mod stages;
pub mod worker;

pub use artifact::{ArtifactError, EmbeddingArtifact, decode_artifact, encode_artifact};
pub use error::{IngestError, StageError};
pub use ingest::{
    BulkUploadReport, DocumentStatusReport, IngestionService, StageProgress, UploadOutcome,
    UploadReceipt,
};
pub use queues::{
    ChunkPayload, EmbedPayload, ExtractPayload, JobPayload, JobQueue, QueueError, QueueResult,
    QueuedJob, TenantFairQueue,
};
pub use stages::{PipelineContext, handle_job};
pub use worker::{WorkerConfig, WorkerHost};
