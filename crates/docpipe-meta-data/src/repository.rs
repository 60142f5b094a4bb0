//! PostgreSQL repository with read/write pool separation
//!
//! All multi-row writes run inside a transaction. The completion predicate
//! locks the document row so concurrent final embeds serialize.

use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::error::{MetaDataError, MetaDataResult};
use crate::models::{
    Chunk, ChunkCounts, Document, DocumentStatus, Job, JobStatus, StatusTransition, Tenant,
};
use crate::pool_manager::PoolManager;
use crate::traits::DocumentRepository;

/// PostgreSQL error code for unique-constraint violations
const UNIQUE_VIOLATION: &str = "23505";

/// Repository over PostgreSQL via sqlx
pub struct PgDocumentRepository {
    pools: PoolManager,
}

impl PgDocumentRepository {
    pub const fn new(pools: PoolManager) -> Self {
        Self { pools }
    }

    fn row_to_document(row: &sqlx::postgres::PgRow) -> MetaDataResult<Document> {
        let status: String = row.get("status");
        Ok(Document {
            document_id: row.get("document_id"),
            tenant_id: row.get("tenant_id"),
            filename: row.get("filename"),
            status: status
                .parse()
                .map_err(MetaDataError::Serialization)?,
            file_path: row.get("file_path"),
            file_size: row.get("file_size"),
            metadata: row.get("metadata"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn row_to_job(row: &sqlx::postgres::PgRow) -> MetaDataResult<Job> {
        let kind: String = row.get("job_type");
        let status: String = row.get("status");
        Ok(Job {
            job_id: row.get("job_id"),
            tenant_id: row.get("tenant_id"),
            document_id: row.get("document_id"),
            kind: kind.parse().map_err(MetaDataError::Serialization)?,
            status: status.parse().map_err(MetaDataError::Serialization)?,
            error_message: row.get("error_message"),
            retry_count: row.get("retry_count"),
            max_retries: row.get("max_retries"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn create_tenant(
        &self,
        name: &str,
        rate_limit: i32,
        api_key_hash: &str,
    ) -> MetaDataResult<Tenant> {
        let pool = self.pools.write_pool();

        let row = sqlx::query(
            r"
            INSERT INTO tenants (tenant_id, name, rate_limit, api_key_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING tenant_id, name, rate_limit, api_key_hash, created_at
            ",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(rate_limit)
        .bind(api_key_hash)
        .fetch_one(pool)
        .await?;

        Ok(Tenant {
            tenant_id: row.get("tenant_id"),
            name: row.get("name"),
            rate_limit: row.get("rate_limit"),
            api_key_hash: row.get("api_key_hash"),
            created_at: row.get("created_at"),
        })
    }

    async fn get_tenant_by_credential_hash(&self, hash: &str) -> MetaDataResult<Option<Tenant>> {
        let pool = self.pools.read_pool();

        let row = sqlx::query(
            r"
            SELECT tenant_id, name, rate_limit, api_key_hash, created_at
            FROM tenants
            WHERE api_key_hash = $1
            ",
        )
        .bind(hash)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|r| Tenant {
            tenant_id: r.get("tenant_id"),
            name: r.get("name"),
            rate_limit: r.get("rate_limit"),
            api_key_hash: r.get("api_key_hash"),
            created_at: r.get("created_at"),
        }))
    }

    async fn get_tenant(&self, tenant_id: Uuid) -> MetaDataResult<Option<Tenant>> {
        let pool = self.pools.read_pool();

        let row = sqlx::query(
            r"
            SELECT tenant_id, name, rate_limit, api_key_hash, created_at
            FROM tenants
            WHERE tenant_id = $1
            ",
        )
        .bind(tenant_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|r| Tenant {
            tenant_id: r.get("tenant_id"),
            name: r.get("name"),
            rate_limit: r.get("rate_limit"),
            api_key_hash: r.get("api_key_hash"),
            created_at: r.get("created_at"),
        }))
    }

    async fn delete_tenant(&self, tenant_id: Uuid) -> MetaDataResult<Vec<Uuid>> {
        let pool = self.pools.write_pool();
        let mut tx = pool.begin().await?;

        let rows = sqlx::query("SELECT document_id FROM documents WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_all(&mut *tx)
            .await?;
        let document_ids = rows.iter().map(|r| r.get("document_id")).collect();

        // Documents, chunks, and jobs cascade from the tenant row
        sqlx::query("DELETE FROM tenants WHERE tenant_id = $1")
            .bind(tenant_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(document_ids)
    }

    async fn insert_document(&self, document: &Document) -> MetaDataResult<()> {
        let pool = self.pools.write_pool();

        sqlx::query(
            r"
            INSERT INTO documents
            (document_id, tenant_id, filename, status, file_path, file_size, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(document.document_id)
        .bind(document.tenant_id)
        .bind(&document.filename)
        .bind(document.status.to_string())
        .bind(&document.file_path)
        .bind(document.file_size)
        .bind(&document.metadata)
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn get_document(&self, document_id: Uuid) -> MetaDataResult<Option<Document>> {
        let pool = self.pools.read_pool();

        let row = sqlx::query(
            r"
            SELECT document_id, tenant_id, filename, status, file_path, file_size,
                   metadata, created_at, updated_at
            FROM documents
            WHERE document_id = $1
            ",
        )
        .bind(document_id)
        .fetch_optional(pool)
        .await?;

        row.map(|r| Self::row_to_document(&r)).transpose()
    }

    async fn list_tenant_documents(&self, tenant_id: Uuid) -> MetaDataResult<Vec<Document>> {
        let pool = self.pools.read_pool();

        let rows = sqlx::query(
            r"
            SELECT document_id, tenant_id, filename, status, file_path, file_size,
                   metadata, created_at, updated_at
            FROM documents
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(tenant_id)
        .fetch_all(pool)
        .await?;

        rows.iter().map(Self::row_to_document).collect()
    }

    async fn set_document_status(
        &self,
        document_id: Uuid,
        status: DocumentStatus,
    ) -> MetaDataResult<()> {
        let pool = self.pools.write_pool();
        let mut tx = pool.begin().await?;

        let row = sqlx::query("SELECT status FROM documents WHERE document_id = $1 FOR UPDATE")
            .bind(document_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(MetaDataError::NotFound {
                entity: "document",
                id: document_id,
            })?;

        let current: DocumentStatus = row
            .get::<String, _>("status")
            .parse()
            .map_err(MetaDataError::Serialization)?;

        match current.transition_to(status) {
            StatusTransition::Noop => {
                tx.rollback().await?;
                return Ok(());
            }
            StatusTransition::Reject => {
                tx.rollback().await?;
                return Err(MetaDataError::InvalidTransition {
                    from: current.to_string(),
                    to: status.to_string(),
                });
            }
            StatusTransition::Apply => {}
        }

        sqlx::query(
            "UPDATE documents SET status = $2, updated_at = NOW() WHERE document_id = $1",
        )
        .bind(document_id)
        .bind(status.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn merge_document_metadata(
        &self,
        document_id: Uuid,
        patch: serde_json::Value,
    ) -> MetaDataResult<()> {
        let pool = self.pools.write_pool();

        let result = sqlx::query(
            r"
            UPDATE documents
            SET metadata = metadata || $2::jsonb, updated_at = NOW()
            WHERE document_id = $1
            ",
        )
        .bind(document_id)
        .bind(&patch)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MetaDataError::NotFound {
                entity: "document",
                id: document_id,
            });
        }
        Ok(())
    }

    async fn insert_chunk(&self, chunk: &Chunk) -> MetaDataResult<()> {
        let pool = self.pools.write_pool();

        let result = sqlx::query(
            r"
            INSERT INTO chunks
            (chunk_id, document_id, tenant_id, chunk_index, text, embedding_path)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(chunk.chunk_id)
        .bind(chunk.document_id)
        .bind(chunk.tenant_id)
        .bind(chunk.chunk_index)
        .bind(&chunk.text)
        .bind(&chunk.embedding_path)
        .execute(pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let is_unique = e
                    .as_database_error()
                    .and_then(|d| d.code())
                    .is_some_and(|code| code == UNIQUE_VIOLATION);
                if is_unique {
                    Err(MetaDataError::DuplicateChunk {
                        document_id: chunk.document_id,
                        chunk_index: chunk.chunk_index,
                    })
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn get_chunk(&self, chunk_id: Uuid) -> MetaDataResult<Option<Chunk>> {
        let pool = self.pools.read_pool();

        let chunk = sqlx::query_as::<_, Chunk>(
            r"
            SELECT chunk_id, document_id, tenant_id, chunk_index, text,
                   embedding_path, created_at
            FROM chunks
            WHERE chunk_id = $1
            ",
        )
        .bind(chunk_id)
        .fetch_optional(pool)
        .await?;

        Ok(chunk)
    }

    async fn get_document_chunks(&self, document_id: Uuid) -> MetaDataResult<Vec<Chunk>> {
        let pool = self.pools.read_pool();

        let chunks = sqlx::query_as::<_, Chunk>(
            r"
            SELECT chunk_id, document_id, tenant_id, chunk_index, text,
                   embedding_path, created_at
            FROM chunks
            WHERE document_id = $1
            ORDER BY chunk_index ASC
            ",
        )
        .bind(document_id)
        .fetch_all(pool)
        .await?;

        Ok(chunks)
    }

    async fn set_chunk_embedding_path(&self, chunk_id: Uuid, path: &str) -> MetaDataResult<()> {
        let pool = self.pools.write_pool();

        let result = sqlx::query("UPDATE chunks SET embedding_path = $2 WHERE chunk_id = $1")
            .bind(chunk_id)
            .bind(path)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(MetaDataError::NotFound {
                entity: "chunk",
                id: chunk_id,
            });
        }
        Ok(())
    }

    async fn count_document_chunks(&self, document_id: Uuid) -> MetaDataResult<ChunkCounts> {
        let pool = self.pools.read_pool();

        let row = sqlx::query(
            r"
            SELECT COUNT(*) AS total, COUNT(embedding_path) AS embedded
            FROM chunks
            WHERE document_id = $1
            ",
        )
        .bind(document_id)
        .fetch_one(pool)
        .await?;

        Ok(ChunkCounts {
            total: row.get("total"),
            embedded: row.get("embedded"),
        })
    }

    async fn complete_if_fully_embedded(&self, document_id: Uuid) -> MetaDataResult<bool> {
        let pool = self.pools.write_pool();
        let mut tx = pool.begin().await?;

        // Lock the document row so two final embeds cannot both read
        // total == embedded and race the transition
        let row = sqlx::query("SELECT status FROM documents WHERE document_id = $1 FOR UPDATE")
            .bind(document_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(MetaDataError::NotFound {
                entity: "document",
                id: document_id,
            })?;

        let current: DocumentStatus = row
            .get::<String, _>("status")
            .parse()
            .map_err(MetaDataError::Serialization)?;

        if current == DocumentStatus::Completed {
            tx.rollback().await?;
            return Ok(true);
        }

        let counts = sqlx::query(
            r"
            SELECT COUNT(*) AS total, COUNT(embedding_path) AS embedded
            FROM chunks
            WHERE document_id = $1
            ",
        )
        .bind(document_id)
        .fetch_one(&mut *tx)
        .await?;

        let counts = ChunkCounts {
            total: counts.get("total"),
            embedded: counts.get("embedded"),
        };

        if counts.is_complete() && current == DocumentStatus::Processing {
            sqlx::query(
                "UPDATE documents SET status = 'completed', updated_at = NOW() WHERE document_id = $1",
            )
            .bind(document_id)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            tracing::info!(document_id = %document_id, "Document processing completed");
            return Ok(true);
        }

        tx.rollback().await?;
        Ok(false)
    }

    async fn insert_job(&self, job: &Job) -> MetaDataResult<()> {
        let pool = self.pools.write_pool();

        sqlx::query(
            r"
            INSERT INTO jobs
            (job_id, tenant_id, document_id, job_type, status, error_message,
             retry_count, max_retries)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(job.job_id)
        .bind(job.tenant_id)
        .bind(job.document_id)
        .bind(job.kind.to_string())
        .bind(job.status.to_string())
        .bind(&job.error_message)
        .bind(job.retry_count)
        .bind(job.max_retries)
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn set_job_status(
        &self,
        job_id: Uuid,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> MetaDataResult<()> {
        let pool = self.pools.write_pool();

        sqlx::query(
            r"
            UPDATE jobs
            SET status = $2, error_message = $3, updated_at = NOW()
            WHERE job_id = $1
            ",
        )
        .bind(job_id)
        .bind(status.to_string())
        .bind(error_message)
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn set_job_retry(&self, job_id: Uuid, retry_count: i32) -> MetaDataResult<()> {
        let pool = self.pools.write_pool();

        sqlx::query(
            r"
            UPDATE jobs
            SET retry_count = $2, status = 'processing', updated_at = NOW()
            WHERE job_id = $1
            ",
        )
        .bind(job_id)
        .bind(retry_count)
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn get_document_jobs(&self, document_id: Uuid) -> MetaDataResult<Vec<Job>> {
        let pool = self.pools.read_pool();

        let rows = sqlx::query(
            r"
            SELECT job_id, tenant_id, document_id, job_type, status, error_message,
                   retry_count, max_retries, created_at, updated_at
            FROM jobs
            WHERE document_id = $1
            ORDER BY created_at ASC
            ",
        )
        .bind(document_id)
        .fetch_all(pool)
        .await?;

        rows.iter().map(Self::row_to_job).collect()
    }

    async fn delete_document_chunks(&self, document_id: Uuid) -> MetaDataResult<Vec<Uuid>> {
        let pool = self.pools.write_pool();

        let rows = sqlx::query("DELETE FROM chunks WHERE document_id = $1 RETURNING chunk_id")
            .bind(document_id)
            .fetch_all(pool)
            .await?;

        Ok(rows.iter().map(|r| r.get("chunk_id")).collect())
    }

    async fn delete_document(&self, document_id: Uuid) -> MetaDataResult<()> {
        let pool = self.pools.write_pool();
        let mut tx = pool.begin().await?;

        // Job rows cascade from the document row
        sqlx::query("DELETE FROM documents WHERE document_id = $1")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
