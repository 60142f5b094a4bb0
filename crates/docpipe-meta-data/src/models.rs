//! Domain models for metadata-store entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant of the pipeline
///
/// Owns its documents, chunks, jobs, vector points, and every blob under
/// the `{tenant_id}/` prefix.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tenant {
    pub tenant_id: Uuid,
    pub name: String,
    pub rate_limit: i32,
    pub api_key_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregate processing status of a document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Outcome of asking to move a document from one status to another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    /// The write should be applied
    Apply,
    /// Same status (or processing -> processing); nothing to do
    Noop,
    /// The transition is not permitted
    Reject,
}

impl DocumentStatus {
    /// Classify a requested transition
    ///
    /// Permitted flow is `pending -> processing -> {completed, failed}`.
    /// Re-writing the current status is a no-op; everything else is
    /// rejected.
    pub fn transition_to(self, to: Self) -> StatusTransition {
        match (self, to) {
            (a, b) if a == b => StatusTransition::Noop,
            (Self::Pending, Self::Processing)
            | (Self::Processing, Self::Completed | Self::Failed) => StatusTransition::Apply,
            _ => StatusTransition::Reject,
        }
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid document status: {s}")),
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{status}")
    }
}

/// An uploaded document and its aggregate pipeline state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub document_id: Uuid,
    pub tenant_id: Uuid,
    pub filename: String,
    pub status: DocumentStatus,
    /// Blob path of the original upload: `{tenant}/{document}/{filename}`
    pub file_path: String,
    pub file_size: i64,
    /// Free-form metadata; the extract stage records
    /// `{text_path, text_length}` here
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One contiguous segment of a document's extracted text
///
/// `tenant_id` is denormalized from the document so isolation checks never
/// need a join.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Chunk {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub tenant_id: Uuid,
    /// Dense 0-based position within the document; unique per document
    pub chunk_index: i32,
    pub text: String,
    /// Blob path of the embedding artifact once the embed stage has run
    pub embedding_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Pipeline stage a job belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Extract,
    Chunk,
    Embed,
}

impl JobKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Chunk => "chunk",
            Self::Embed => "embed",
        }
    }

    /// All kinds in pipeline order
    pub const ALL: [Self; 3] = [Self::Extract, Self::Chunk, Self::Embed];
}

impl std::str::FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extract" => Ok(Self::Extract),
            "chunk" => Ok(Self::Chunk),
            "embed" => Ok(Self::Embed),
            _ => Err(format!("Invalid job kind: {s}")),
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of one job row
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid job status: {s}")),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{status}")
    }
}

/// One processing attempt chain for a (document, stage) pair
///
/// A row is created lazily on the first attempt of a dequeued item and
/// updated in place across that item's retries. A later re-enqueue of the
/// same logical work creates a fresh row; status reporting reads the latest
/// row per kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Uuid,
    pub tenant_id: Uuid,
    pub document_id: Option<Uuid>,
    pub kind: JobKind,
    pub status: JobStatus,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Chunk totals used by the completion predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkCounts {
    /// All chunk rows for the document
    pub total: i64,
    /// Rows whose `embedding_path` is set
    pub embedded: i64,
}

impl ChunkCounts {
    /// The document is fully embedded (and non-empty)
    pub const fn is_complete(self) -> bool {
        self.total > 0 && self.total == self.embedded
    }
}
