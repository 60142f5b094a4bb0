//! Vector index trait and point model

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use docpipe_common::CorrelationId;

use crate::VectorDataResult;

/// Payload carried by every point
///
/// `tenant_id` mirrors the owning chunk's tenant and is the field all
/// filtered operations key on. The rest lets search results render without
/// a metadata-store round trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PointPayload {
    pub tenant_id: Uuid,
    pub document_id: Uuid,
    pub chunk_id: Uuid,
    pub chunk_index: i64,
    pub filename: String,
    pub text: String,
    /// Opaque caller metadata
    pub metadata: serde_json::Value,
}

/// One embedding with its payload; the point id equals the chunk id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

/// A scored search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub tenant_id: Uuid,
    pub chunk_index: i64,
    pub filename: String,
    pub text: String,
    pub score: f32,
    pub metadata: serde_json::Value,
}

/// Trait for vector index backends
#[async_trait]
pub trait VectorStorage: Send + Sync {
    /// Create the collection if missing: configured dimension, cosine
    /// distance, keyword payload index on `tenant_id`. Idempotent, and
    /// tolerant of a concurrent creator.
    async fn ensure_collection(&self) -> VectorDataResult<()>;

    /// Whether the collection exists
    async fn collection_exists(&self) -> VectorDataResult<bool>;

    /// Insert or replace points by id
    async fn upsert_points(
        &self,
        points: Vec<VectorPoint>,
        correlation_id: &CorrelationId,
    ) -> VectorDataResult<()>;

    /// Nearest-neighbor search restricted to one tenant's points
    async fn search(
        &self,
        query: Vec<f32>,
        tenant_id: Uuid,
        limit: usize,
        score_threshold: f32,
        correlation_id: &CorrelationId,
    ) -> VectorDataResult<Vec<SearchHit>>;

    /// Delete points by id *and* tenant
    ///
    /// The tenant filter applies even though ids are supplied, so a caller
    /// holding a guessed id cannot remove another tenant's points.
    async fn delete_points(&self, ids: &[Uuid], tenant_id: Uuid) -> VectorDataResult<()>;

    /// Delete every point belonging to a tenant (operator cascade)
    async fn delete_tenant_points(&self, tenant_id: Uuid) -> VectorDataResult<()>;

    /// Drop the entire collection
    ///
    /// WARNING: removes all tenants' data; operator use only.
    async fn drop_collection(&self) -> VectorDataResult<bool>;
}
