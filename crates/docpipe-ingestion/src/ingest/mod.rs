//! Ingestion facade
//!
//! The tenant-facing surface: uploads (single and bulk), document status,
//! deletion cascades, and tenant administration. HTTP, auth middleware,
//! and rate limiting sit in front of this; everything here is already
//! tenant-scoped.

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use docpipe_blob_data::BlobStore;
use docpipe_common::{Clock, CorrelationId};
use docpipe_config::UploadConfig;
use docpipe_extraction::file_extension;
use docpipe_meta_data::{
    Document, DocumentRepository, DocumentStatus, JobKind, JobStatus, Tenant, hash_credential,
};
use docpipe_vector_data::VectorStorage;

use crate::error::IngestError;
use crate::queues::{ExtractPayload, JobPayload, JobQueue, QueuedJob};

/// Outcome of a single accepted upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub document_id: Uuid,
    pub filename: String,
    pub status: DocumentStatus,
}

/// Per-item outcome within a bulk upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub filename: String,
    pub document_id: Option<Uuid>,
    pub accepted: bool,
    pub message: String,
}

/// Bulk upload summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkUploadReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub items: Vec<UploadOutcome>,
}

/// Latest state of one pipeline stage for a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageProgress {
    pub status: JobStatus,
    pub error: Option<String>,
    pub retry_count: i32,
}

/// Aggregate status plus per-stage progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentStatusReport {
    pub document_id: Uuid,
    pub status: DocumentStatus,
    pub extract: Option<StageProgress>,
    pub chunk: Option<StageProgress>,
    pub embed: Option<StageProgress>,
}

/// Tenant-facing ingestion service
pub struct IngestionService {
    repository: Arc<dyn DocumentRepository>,
    blobs: Arc<dyn BlobStore>,
    vectors: Arc<dyn VectorStorage>,
    queue: Arc<dyn JobQueue>,
    clock: Arc<dyn Clock>,
    upload_config: UploadConfig,
}

impl IngestionService {
    pub fn new(
        repository: Arc<dyn DocumentRepository>,
        blobs: Arc<dyn BlobStore>,
        vectors: Arc<dyn VectorStorage>,
        queue: Arc<dyn JobQueue>,
        clock: Arc<dyn Clock>,
        upload_config: UploadConfig,
    ) -> Self {
        Self {
            repository,
            blobs,
            vectors,
            queue,
            clock,
            upload_config,
        }
    }

    /// Resolve an API key to its tenant
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Unauthorized` when the key matches no tenant.
    pub async fn authenticate(&self, api_key: &str) -> Result<Tenant, IngestError> {
        let hash = hash_credential(api_key);
        self.repository
            .get_tenant_by_credential_hash(&hash)
            .await?
            .ok_or(IngestError::Unauthorized)
    }

    /// Operator: create a tenant, returning it with its id
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Internal` on store failure (including a
    /// duplicate name).
    pub async fn create_tenant(
        &self,
        name: &str,
        rate_limit: i32,
        api_key: &str,
    ) -> Result<Tenant, IngestError> {
        let hash = hash_credential(api_key);
        Ok(self.repository.create_tenant(name, rate_limit, &hash).await?)
    }

    /// Operator: delete a tenant and everything it owns
    ///
    /// Cascade order: vector points, metadata rows, blobs under the
    /// tenant prefix.
    pub async fn delete_tenant(&self, tenant_id: Uuid) -> Result<(), IngestError> {
        self.vectors.delete_tenant_points(tenant_id).await?;
        let document_ids = self.repository.delete_tenant(tenant_id).await?;
        self.blobs.delete_prefix(&format!("{tenant_id}/")).await?;
        tracing::info!(
            tenant_id = %tenant_id,
            documents = document_ids.len(),
            "Tenant deleted"
        );
        Ok(())
    }

    fn validate_upload(&self, filename: &str, size: usize) -> Result<(), IngestError> {
        let extension = file_extension(filename).unwrap_or_default();
        if !self.upload_config.allowed_extensions.contains(&extension) {
            return Err(IngestError::InvalidInput(format!(
                "File type not allowed: {filename} (allowed: {})",
                self.upload_config.allowed_extensions.join(", ")
            )));
        }
        if size as u64 > self.upload_config.max_file_size_bytes {
            return Err(IngestError::InvalidInput(format!(
                "File size {size} exceeds maximum of {} bytes",
                self.upload_config.max_file_size_bytes
            )));
        }
        Ok(())
    }

    /// Accept one upload: persist the blob, create the pending document,
    /// seed the extract queue
    ///
    /// # Errors
    ///
    /// `InvalidInput` for disallowed extension or oversize content;
    /// `Internal` for store failures.
    pub async fn upload(
        &self,
        tenant: &Tenant,
        filename: &str,
        content: Bytes,
    ) -> Result<UploadReceipt, IngestError> {
        self.validate_upload(filename, content.len())?;

        let document_id = Uuid::new_v4();
        let file_path = format!("{}/{}/{}", tenant.tenant_id, document_id, filename);
        let file_size = content.len() as i64;

        self.blobs
            .put(&file_path, content, "application/octet-stream")
            .await?;

        let now = self.clock.now();
        self.repository
            .insert_document(&Document {
                document_id,
                tenant_id: tenant.tenant_id,
                filename: filename.to_string(),
                status: DocumentStatus::Pending,
                file_path: file_path.clone(),
                file_size,
                metadata: serde_json::json!({}),
                created_at: now,
                updated_at: now,
            })
            .await?;

        // One correlation id follows this document through every stage
        let correlation_id = CorrelationId::new();
        self.queue
            .enqueue(QueuedJob {
                tenant_id: tenant.tenant_id,
                document_id,
                priority: 0,
                correlation_id,
                payload: JobPayload::Extract(ExtractPayload {
                    file_path,
                    filename: filename.to_string(),
                }),
            })
            .await?;

        tracing::info!(
            correlation_id = %correlation_id,
            tenant_id = %tenant.tenant_id,
            document_id = %document_id,
            filename = %filename,
            file_size,
            "Upload accepted"
        );

        Ok(UploadReceipt {
            document_id,
            filename: filename.to_string(),
            status: DocumentStatus::Pending,
        })
    }

    /// Accept up to `bulk_upload_cap` uploads, reporting per-item outcomes
    ///
    /// Individual rejections (bad extension, oversize, store hiccups) are
    /// recorded in the report instead of failing the batch.
    ///
    /// # Errors
    ///
    /// `InvalidInput` only when the batch itself exceeds the cap.
    pub async fn upload_bulk(
        &self,
        tenant: &Tenant,
        files: Vec<(String, Bytes)>,
    ) -> Result<BulkUploadReport, IngestError> {
        if files.len() > self.upload_config.bulk_upload_cap {
            return Err(IngestError::InvalidInput(format!(
                "Maximum {} files allowed per bulk upload",
                self.upload_config.bulk_upload_cap
            )));
        }

        let total = files.len();
        let mut items = Vec::with_capacity(total);
        let mut successful = 0;

        for (filename, content) in files {
            match self.upload(tenant, &filename, content).await {
                Ok(receipt) => {
                    successful += 1;
                    items.push(UploadOutcome {
                        filename,
                        document_id: Some(receipt.document_id),
                        accepted: true,
                        message: "queued for processing".to_string(),
                    });
                }
                Err(e) => {
                    items.push(UploadOutcome {
                        filename,
                        document_id: None,
                        accepted: false,
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(BulkUploadReport {
            total,
            successful,
            failed: total - successful,
            items,
        })
    }

    /// Fetch a document owned by the caller
    ///
    /// # Errors
    ///
    /// `NotFound` when the id does not exist or belongs to another tenant
    /// (indistinguishable by design).
    async fn owned_document(
        &self,
        tenant: &Tenant,
        document_id: Uuid,
    ) -> Result<Document, IngestError> {
        self.repository
            .get_document(document_id)
            .await?
            .filter(|doc| doc.tenant_id == tenant.tenant_id)
            .ok_or_else(|| IngestError::NotFound(format!("document {document_id}")))
    }

    /// Aggregate status plus the latest per-stage progress
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown or foreign documents.
    pub async fn document_status(
        &self,
        tenant: &Tenant,
        document_id: Uuid,
    ) -> Result<DocumentStatusReport, IngestError> {
        let document = self.owned_document(tenant, document_id).await?;
        let jobs = self.repository.get_document_jobs(document_id).await?;

        let mut report = DocumentStatusReport {
            document_id,
            status: document.status,
            extract: None,
            chunk: None,
            embed: None,
        };

        // Jobs arrive in creation order; the last row per kind wins
        for job in jobs {
            let progress = Some(StageProgress {
                status: job.status,
                error: job.error_message,
                retry_count: job.retry_count,
            });
            match job.kind {
                JobKind::Extract => report.extract = progress,
                JobKind::Chunk => report.chunk = progress,
                JobKind::Embed => report.embed = progress,
            }
        }

        Ok(report)
    }

    /// Delete a document and its shadow representations
    ///
    /// Cascade order: vector points (tenant-filtered), chunk rows, blobs
    /// under `{tenant}/{document}/`, then the document and job rows.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown or foreign documents; `Internal` for store
    /// failures.
    pub async fn delete_document(
        &self,
        tenant: &Tenant,
        document_id: Uuid,
    ) -> Result<(), IngestError> {
        let document = self.owned_document(tenant, document_id).await?;

        let chunks = self.repository.get_document_chunks(document_id).await?;
        let chunk_ids: Vec<Uuid> = chunks.iter().map(|c| c.chunk_id).collect();

        self.vectors
            .delete_points(&chunk_ids, tenant.tenant_id)
            .await?;
        self.repository.delete_document_chunks(document_id).await?;
        self.blobs
            .delete_prefix(&format!("{}/{}/", tenant.tenant_id, document_id))
            .await?;
        self.repository.delete_document(document_id).await?;

        tracing::info!(
            tenant_id = %tenant.tenant_id,
            document_id = %document_id,
            filename = %document.filename,
            chunks = chunk_ids.len(),
            "Document deleted"
        );
        Ok(())
    }
}
