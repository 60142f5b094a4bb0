//! Metadata repository trait for dependency injection and testing

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::MetaDataResult;
use crate::models::{Chunk, ChunkCounts, Document, DocumentStatus, Job, JobStatus, Tenant};

/// Repository trait for all metadata-store operations
///
/// Multi-row writes execute in a single transaction; implementations must
/// enforce the document status transition graph and the
/// `(document_id, chunk_index)` uniqueness constraint themselves so every
/// backend behaves the same under concurrent handlers.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    // --- tenants ---

    /// Create a tenant; `name` is unique across the system
    async fn create_tenant(
        &self,
        name: &str,
        rate_limit: i32,
        api_key_hash: &str,
    ) -> MetaDataResult<Tenant>;

    /// Look up a tenant by its hashed credential
    async fn get_tenant_by_credential_hash(&self, hash: &str) -> MetaDataResult<Option<Tenant>>;

    /// Look up a tenant by id
    async fn get_tenant(&self, tenant_id: Uuid) -> MetaDataResult<Option<Tenant>>;

    /// Delete a tenant row (dependent rows cascade); returns the ids of
    /// the documents that existed so callers can sweep the other stores
    async fn delete_tenant(&self, tenant_id: Uuid) -> MetaDataResult<Vec<Uuid>>;

    // --- documents ---

    /// Insert a document row; initial status is `pending`
    async fn insert_document(&self, document: &Document) -> MetaDataResult<()>;

    /// Fetch a document by id
    async fn get_document(&self, document_id: Uuid) -> MetaDataResult<Option<Document>>;

    /// All documents owned by a tenant, newest first
    async fn list_tenant_documents(&self, tenant_id: Uuid) -> MetaDataResult<Vec<Document>>;

    /// Apply a status transition
    ///
    /// Permitted flow is `pending -> processing -> {completed, failed}`;
    /// re-writing the current status is a no-op; anything else returns
    /// `MetaDataError::InvalidTransition`.
    async fn set_document_status(
        &self,
        document_id: Uuid,
        status: DocumentStatus,
    ) -> MetaDataResult<()>;

    /// Merge a JSON object into the document's metadata map
    async fn merge_document_metadata(
        &self,
        document_id: Uuid,
        patch: serde_json::Value,
    ) -> MetaDataResult<()>;

    // --- chunks ---

    /// Insert a chunk row
    ///
    /// A `(document_id, chunk_index)` collision returns
    /// `MetaDataError::DuplicateChunk` so handlers can treat re-execution
    /// as idempotent success.
    async fn insert_chunk(&self, chunk: &Chunk) -> MetaDataResult<()>;

    /// Fetch a chunk by id
    async fn get_chunk(&self, chunk_id: Uuid) -> MetaDataResult<Option<Chunk>>;

    /// All chunks of a document ordered by `chunk_index`
    async fn get_document_chunks(&self, document_id: Uuid) -> MetaDataResult<Vec<Chunk>>;

    /// Record the embedding artifact path on a chunk row
    async fn set_chunk_embedding_path(&self, chunk_id: Uuid, path: &str) -> MetaDataResult<()>;

    /// Count a document's chunks and how many carry an embedding path
    async fn count_document_chunks(&self, document_id: Uuid) -> MetaDataResult<ChunkCounts>;

    /// Completion predicate: in one transaction, count the document's
    /// chunks and, iff all of them are embedded (and there is at least
    /// one), transition the document to `completed`
    ///
    /// Returns true when the document is completed after the call
    /// (including when it already was). Concurrent final embeds serialize
    /// on the document row.
    async fn complete_if_fully_embedded(&self, document_id: Uuid) -> MetaDataResult<bool>;

    // --- jobs ---

    /// Insert a job row (first processing attempt of a dequeued item)
    async fn insert_job(&self, job: &Job) -> MetaDataResult<()>;

    /// Update a job's status and error message
    async fn set_job_status(
        &self,
        job_id: Uuid,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> MetaDataResult<()>;

    /// Record a retry: sets `retry_count` and returns the row to
    /// `processing`
    async fn set_job_retry(&self, job_id: Uuid, retry_count: i32) -> MetaDataResult<()>;

    /// All job rows of a document ordered by creation time
    async fn get_document_jobs(&self, document_id: Uuid) -> MetaDataResult<Vec<Job>>;

    // --- cascades ---

    /// Delete a document's chunk rows, returning the deleted chunk ids
    async fn delete_document_chunks(&self, document_id: Uuid) -> MetaDataResult<Vec<Uuid>>;

    /// Delete the document row and its job rows
    async fn delete_document(&self, document_id: Uuid) -> MetaDataResult<()>;
}
