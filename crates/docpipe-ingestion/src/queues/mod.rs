//! Job queue abstraction and payload variants
//!
//! Jobs are tagged `(tenant, kind, priority, payload)`. The queue stores
//! payloads as opaque byte blobs and reconstructs the typed variants on
//! dequeue, so queue backends never depend on stage internals.

pub mod memory_queue;

pub use memory_queue::TenantFairQueue;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use docpipe_common::CorrelationId;
use docpipe_meta_data::JobKind;

/// Result type alias for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur against the queue
#[derive(Error, Debug)]
pub enum QueueError {
    /// Payload blob could not be encoded or decoded
    #[error("Queue serialization error: {0}")]
    Serialization(String),

    /// Backend failure
    #[error("Queue error: {0}")]
    Operation(String),
}

impl From<serde_json::Error> for QueueError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Input to the extract stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractPayload {
    pub file_path: String,
    pub filename: String,
}

/// Input to the chunk stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkPayload {
    pub text_path: String,
    pub filename: String,
}

/// Input to the embed stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbedPayload {
    pub chunk_id: Uuid,
    pub chunk_path: String,
    pub filename: String,
}

/// Tagged stage payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum JobPayload {
    Extract(ExtractPayload),
    Chunk(ChunkPayload),
    Embed(EmbedPayload),
}

impl JobPayload {
    pub const fn kind(&self) -> JobKind {
        match self {
            Self::Extract(_) => JobKind::Extract,
            Self::Chunk(_) => JobKind::Chunk,
            Self::Embed(_) => JobKind::Embed,
        }
    }
}

/// One queued unit of work
///
/// `correlation_id` is minted at upload and carried down the whole
/// Extract -> Chunk -> Embed fan-out for log stitching.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueuedJob {
    pub tenant_id: Uuid,
    pub document_id: Uuid,
    pub priority: i32,
    pub correlation_id: CorrelationId,
    pub payload: JobPayload,
}

impl QueuedJob {
    pub const fn kind(&self) -> JobKind {
        self.payload.kind()
    }
}

/// Queue of pipeline jobs with tenant-fair dispatch
///
/// Contract: at-least-once delivery; ordering within one `(tenant, kind)`
/// is priority-then-FIFO; dispatch across tenants of one kind is
/// round-robin over non-empty queues; kinds are independent.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Add a job to its `(tenant, kind)` queue
    async fn enqueue(&self, job: QueuedJob) -> QueueResult<()>;

    /// Take the next job of this kind, visiting tenants round-robin;
    /// non-blocking, `None` when every queue is empty
    async fn dequeue(&self, kind: JobKind) -> QueueResult<Option<QueuedJob>>;

    /// Take the next job of this kind from one specific tenant
    async fn dequeue_from(&self, tenant_id: Uuid, kind: JobKind) -> QueueResult<Option<QueuedJob>>;

    /// Number of queued jobs of this kind, optionally for one tenant
    async fn size(&self, kind: JobKind, tenant_id: Option<Uuid>) -> QueueResult<usize>;

    /// Drop queued jobs of this kind, optionally for one tenant; returns
    /// how many were removed
    async fn clear(&self, kind: JobKind, tenant_id: Option<Uuid>) -> QueueResult<usize>;
}
