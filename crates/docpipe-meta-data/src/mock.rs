//! In-memory implementation of `DocumentRepository` for tests
//!
//! Enforces the same transition graph and uniqueness constraint as the
//! PostgreSQL backend so pipeline tests exercise real semantics without a
//! database. A single mutex stands in for transaction serialization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use docpipe_common::Clock;

use crate::error::{MetaDataError, MetaDataResult};
use crate::models::{
    Chunk, ChunkCounts, Document, DocumentStatus, Job, JobStatus, StatusTransition, Tenant,
};
use crate::traits::DocumentRepository;

#[derive(Default)]
struct State {
    tenants: HashMap<Uuid, Tenant>,
    documents: HashMap<Uuid, Document>,
    chunks: HashMap<Uuid, Chunk>,
    jobs: HashMap<Uuid, Job>,
    /// Insertion order of job rows; created_at ties under a manual clock
    job_order: Vec<Uuid>,
}

/// Mutex-backed metadata store double
pub struct MockMetadataStore {
    state: Mutex<State>,
    clock: Arc<dyn Clock>,
}

impl MockMetadataStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            clock,
        }
    }

    #[allow(clippy::unwrap_used)]
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn counts_locked(state: &State, document_id: Uuid) -> ChunkCounts {
        let mut counts = ChunkCounts { total: 0, embedded: 0 };
        for chunk in state.chunks.values() {
            if chunk.document_id == document_id {
                counts.total += 1;
                if chunk.embedding_path.is_some() {
                    counts.embedded += 1;
                }
            }
        }
        counts
    }

    /// Number of job rows ever created (test assertions)
    pub fn job_count(&self) -> usize {
        self.lock().jobs.len()
    }

    /// Snapshot of every chunk row (test assertions)
    pub fn all_chunks(&self) -> Vec<Chunk> {
        self.lock().chunks.values().cloned().collect()
    }
}

#[async_trait]
impl DocumentRepository for MockMetadataStore {
    async fn create_tenant(
        &self,
        name: &str,
        rate_limit: i32,
        api_key_hash: &str,
    ) -> MetaDataResult<Tenant> {
        let mut state = self.lock();
        if state.tenants.values().any(|t| t.name == name) {
            return Err(MetaDataError::Database(format!(
                "tenant name already exists: {name}"
            )));
        }
        let tenant = Tenant {
            tenant_id: Uuid::new_v4(),
            name: name.to_string(),
            rate_limit,
            api_key_hash: api_key_hash.to_string(),
            created_at: self.clock.now(),
        };
        state.tenants.insert(tenant.tenant_id, tenant.clone());
        Ok(tenant)
    }

    async fn get_tenant_by_credential_hash(&self, hash: &str) -> MetaDataResult<Option<Tenant>> {
        Ok(self
            .lock()
            .tenants
            .values()
            .find(|t| t.api_key_hash == hash)
            .cloned())
    }

    async fn get_tenant(&self, tenant_id: Uuid) -> MetaDataResult<Option<Tenant>> {
        Ok(self.lock().tenants.get(&tenant_id).cloned())
    }

    async fn delete_tenant(&self, tenant_id: Uuid) -> MetaDataResult<Vec<Uuid>> {
        let mut state = self.lock();
        let document_ids: Vec<Uuid> = state
            .documents
            .values()
            .filter(|d| d.tenant_id == tenant_id)
            .map(|d| d.document_id)
            .collect();

        state.tenants.remove(&tenant_id);
        state.documents.retain(|_, d| d.tenant_id != tenant_id);
        state.chunks.retain(|_, c| c.tenant_id != tenant_id);
        state.jobs.retain(|_, j| j.tenant_id != tenant_id);
        let remaining: Vec<Uuid> = state.jobs.keys().copied().collect();
        state.job_order.retain(|id| remaining.contains(id));

        Ok(document_ids)
    }

    async fn insert_document(&self, document: &Document) -> MetaDataResult<()> {
        let mut state = self.lock();
        state
            .documents
            .insert(document.document_id, document.clone());
        Ok(())
    }

    async fn get_document(&self, document_id: Uuid) -> MetaDataResult<Option<Document>> {
        Ok(self.lock().documents.get(&document_id).cloned())
    }

    async fn list_tenant_documents(&self, tenant_id: Uuid) -> MetaDataResult<Vec<Document>> {
        let mut documents: Vec<Document> = self
            .lock()
            .documents
            .values()
            .filter(|d| d.tenant_id == tenant_id)
            .cloned()
            .collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

    async fn set_document_status(
        &self,
        document_id: Uuid,
        status: DocumentStatus,
    ) -> MetaDataResult<()> {
        let now = self.clock.now();
        let mut state = self.lock();
        let document = state
            .documents
            .get_mut(&document_id)
            .ok_or(MetaDataError::NotFound {
                entity: "document",
                id: document_id,
            })?;

        match document.status.transition_to(status) {
            StatusTransition::Noop => Ok(()),
            StatusTransition::Reject => Err(MetaDataError::InvalidTransition {
                from: document.status.to_string(),
                to: status.to_string(),
            }),
            StatusTransition::Apply => {
                document.status = status;
                document.updated_at = now;
                Ok(())
            }
        }
    }

    async fn merge_document_metadata(
        &self,
        document_id: Uuid,
        patch: serde_json::Value,
    ) -> MetaDataResult<()> {
        let now = self.clock.now();
        let mut state = self.lock();
        let document = state
            .documents
            .get_mut(&document_id)
            .ok_or(MetaDataError::NotFound {
                entity: "document",
                id: document_id,
            })?;

        if let (Some(target), Some(source)) = (document.metadata.as_object_mut(), patch.as_object())
        {
            for (key, value) in source {
                target.insert(key.clone(), value.clone());
            }
        } else {
            document.metadata = patch;
        }
        document.updated_at = now;
        Ok(())
    }

    async fn insert_chunk(&self, chunk: &Chunk) -> MetaDataResult<()> {
        let mut state = self.lock();
        let duplicate = state.chunks.values().any(|existing| {
            existing.document_id == chunk.document_id && existing.chunk_index == chunk.chunk_index
        });
        if duplicate {
            return Err(MetaDataError::DuplicateChunk {
                document_id: chunk.document_id,
                chunk_index: chunk.chunk_index,
            });
        }
        state.chunks.insert(chunk.chunk_id, chunk.clone());
        Ok(())
    }

    async fn get_chunk(&self, chunk_id: Uuid) -> MetaDataResult<Option<Chunk>> {
        Ok(self.lock().chunks.get(&chunk_id).cloned())
    }

    async fn get_document_chunks(&self, document_id: Uuid) -> MetaDataResult<Vec<Chunk>> {
        let mut chunks: Vec<Chunk> = self
            .lock()
            .chunks
            .values()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn set_chunk_embedding_path(&self, chunk_id: Uuid, path: &str) -> MetaDataResult<()> {
        let mut state = self.lock();
        let chunk = state.chunks.get_mut(&chunk_id).ok_or(MetaDataError::NotFound {
            entity: "chunk",
            id: chunk_id,
        })?;
        chunk.embedding_path = Some(path.to_string());
        Ok(())
    }

    async fn count_document_chunks(&self, document_id: Uuid) -> MetaDataResult<ChunkCounts> {
        Ok(Self::counts_locked(&self.lock(), document_id))
    }

    async fn complete_if_fully_embedded(&self, document_id: Uuid) -> MetaDataResult<bool> {
        let now = self.clock.now();
        // One lock spans the count and the transition, standing in for the
        // row-locking transaction of the SQL backend
        let mut state = self.lock();

        let counts = Self::counts_locked(&state, document_id);
        let document = state
            .documents
            .get_mut(&document_id)
            .ok_or(MetaDataError::NotFound {
                entity: "document",
                id: document_id,
            })?;

        if document.status == DocumentStatus::Completed {
            return Ok(true);
        }
        if counts.is_complete() && document.status == DocumentStatus::Processing {
            document.status = DocumentStatus::Completed;
            document.updated_at = now;
            return Ok(true);
        }
        Ok(false)
    }

    async fn insert_job(&self, job: &Job) -> MetaDataResult<()> {
        let mut state = self.lock();
        state.jobs.insert(job.job_id, job.clone());
        state.job_order.push(job.job_id);
        Ok(())
    }

    async fn set_job_status(
        &self,
        job_id: Uuid,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> MetaDataResult<()> {
        let now = self.clock.now();
        let mut state = self.lock();
        let job = state.jobs.get_mut(&job_id).ok_or(MetaDataError::NotFound {
            entity: "job",
            id: job_id,
        })?;
        job.status = status;
        job.error_message = error_message.map(ToString::to_string);
        job.updated_at = now;
        Ok(())
    }

    async fn set_job_retry(&self, job_id: Uuid, retry_count: i32) -> MetaDataResult<()> {
        let now = self.clock.now();
        let mut state = self.lock();
        let job = state.jobs.get_mut(&job_id).ok_or(MetaDataError::NotFound {
            entity: "job",
            id: job_id,
        })?;
        job.retry_count = retry_count;
        job.status = JobStatus::Processing;
        job.updated_at = now;
        Ok(())
    }

    async fn get_document_jobs(&self, document_id: Uuid) -> MetaDataResult<Vec<Job>> {
        let state = self.lock();
        let jobs = state
            .job_order
            .iter()
            .filter_map(|id| state.jobs.get(id))
            .filter(|j| j.document_id == Some(document_id))
            .cloned()
            .collect();
        Ok(jobs)
    }

    async fn delete_document_chunks(&self, document_id: Uuid) -> MetaDataResult<Vec<Uuid>> {
        let mut state = self.lock();
        let chunk_ids: Vec<Uuid> = state
            .chunks
            .values()
            .filter(|c| c.document_id == document_id)
            .map(|c| c.chunk_id)
            .collect();
        state.chunks.retain(|_, c| c.document_id != document_id);
        Ok(chunk_ids)
    }

    async fn delete_document(&self, document_id: Uuid) -> MetaDataResult<()> {
        let mut state = self.lock();
        state.documents.remove(&document_id);
        state.jobs.retain(|_, j| j.document_id != Some(document_id));
        let remaining: Vec<Uuid> = state.jobs.keys().copied().collect();
        state.job_order.retain(|id| remaining.contains(id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpipe_common::ManualClock;

    fn store() -> MockMetadataStore {
        MockMetadataStore::new(Arc::new(ManualClock::epoch()))
    }

    fn document(tenant_id: Uuid, clock: &dyn Clock) -> Document {
        Document {
            document_id: Uuid::new_v4(),
            tenant_id,
            filename: "report.txt".to_string(),
            status: DocumentStatus::Pending,
            file_path: format!("{tenant_id}/doc/report.txt"),
            file_size: 42,
            metadata: serde_json::json!({}),
            created_at: clock.now(),
            updated_at: clock.now(),
        }
    }

    fn chunk(doc: &Document, index: i32) -> Chunk {
        Chunk {
            chunk_id: Uuid::new_v4(),
            document_id: doc.document_id,
            tenant_id: doc.tenant_id,
            chunk_index: index,
            text: format!("chunk {index}"),
            embedding_path: None,
            created_at: doc.created_at,
        }
    }

    #[tokio::test]
    async fn status_transitions_are_enforced() {
        let store = store();
        let clock = ManualClock::epoch();
        let doc = document(Uuid::new_v4(), &clock);
        store.insert_document(&doc).await.unwrap();

        // pending -> completed is rejected
        let err = store
            .set_document_status(doc.document_id, DocumentStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, MetaDataError::InvalidTransition { .. }));

        store
            .set_document_status(doc.document_id, DocumentStatus::Processing)
            .await
            .unwrap();
        // re-writing processing is a no-op
        store
            .set_document_status(doc.document_id, DocumentStatus::Processing)
            .await
            .unwrap();
        store
            .set_document_status(doc.document_id, DocumentStatus::Completed)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn duplicate_chunk_index_is_reported() {
        let store = store();
        let clock = ManualClock::epoch();
        let doc = document(Uuid::new_v4(), &clock);
        store.insert_document(&doc).await.unwrap();

        store.insert_chunk(&chunk(&doc, 0)).await.unwrap();
        let err = store.insert_chunk(&chunk(&doc, 0)).await.unwrap_err();
        assert!(err.is_duplicate());
    }

    #[tokio::test]
    async fn completion_requires_every_chunk_embedded() {
        let store = store();
        let clock = ManualClock::epoch();
        let doc = document(Uuid::new_v4(), &clock);
        store.insert_document(&doc).await.unwrap();
        store
            .set_document_status(doc.document_id, DocumentStatus::Processing)
            .await
            .unwrap();

        let first = chunk(&doc, 0);
        let second = chunk(&doc, 1);
        store.insert_chunk(&first).await.unwrap();
        store.insert_chunk(&second).await.unwrap();

        store
            .set_chunk_embedding_path(first.chunk_id, "t/d/embeddings/a")
            .await
            .unwrap();
        assert!(!store.complete_if_fully_embedded(doc.document_id).await.unwrap());

        store
            .set_chunk_embedding_path(second.chunk_id, "t/d/embeddings/b")
            .await
            .unwrap();
        assert!(store.complete_if_fully_embedded(doc.document_id).await.unwrap());
        // idempotent once completed
        assert!(store.complete_if_fully_embedded(doc.document_id).await.unwrap());

        let stored = store.get_document(doc.document_id).await.unwrap().unwrap();
        assert_eq!(stored.status, DocumentStatus::Completed);
    }

    #[tokio::test]
    async fn empty_documents_never_complete() {
        let store = store();
        let clock = ManualClock::epoch();
        let doc = document(Uuid::new_v4(), &clock);
        store.insert_document(&doc).await.unwrap();
        store
            .set_document_status(doc.document_id, DocumentStatus::Processing)
            .await
            .unwrap();

        assert!(!store.complete_if_fully_embedded(doc.document_id).await.unwrap());
    }

    #[tokio::test]
    async fn tenant_delete_reports_owned_documents() {
        let store = store();
        let clock = ManualClock::epoch();
        let tenant = store.create_tenant("acme", 100, "hash-a").await.unwrap();
        let doc = document(tenant.tenant_id, &clock);
        store.insert_document(&doc).await.unwrap();
        store.insert_chunk(&chunk(&doc, 0)).await.unwrap();

        let removed = store.delete_tenant(tenant.tenant_id).await.unwrap();
        assert_eq!(removed, vec![doc.document_id]);
        assert!(store.get_document(doc.document_id).await.unwrap().is_none());
        assert!(store.all_chunks().is_empty());
    }
}
