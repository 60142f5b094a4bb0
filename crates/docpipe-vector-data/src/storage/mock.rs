//! In-memory `VectorStorage` for tests
//!
//! Scores with real cosine similarity and honors the tenant filter and the
//! id+tenant delete semantics, so isolation tests exercise the same rules
//! as the Qdrant backend.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use docpipe_common::CorrelationId;

use crate::error::{VectorDataError, VectorDataResult};
use crate::storage::traits::{SearchHit, VectorPoint, VectorStorage};

type PointStore = Arc<Mutex<Vec<VectorPoint>>>;

/// Mock vector index
#[derive(Clone, Default)]
pub struct MockVectorStorage {
    points: PointStore,
    collection_exists: Arc<Mutex<bool>>,
    fail_on_upsert: bool,
    fail_on_search: bool,
}

impl MockVectorStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every upsert (error-path tests)
    pub fn with_upsert_failure(mut self) -> Self {
        self.fail_on_upsert = true;
        self
    }

    /// Fail every search (error-path tests)
    pub fn with_search_failure(mut self) -> Self {
        self.fail_on_search = true;
        self
    }

    /// Snapshot of all stored points (test assertions)
    #[allow(clippy::unwrap_used)]
    pub fn all_points(&self) -> Vec<VectorPoint> {
        self.points.lock().unwrap().clone()
    }

    /// Ids of points belonging to one tenant (test assertions)
    #[allow(clippy::unwrap_used)]
    pub fn tenant_point_ids(&self, tenant_id: Uuid) -> Vec<Uuid> {
        self.points
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.payload.tenant_id == tenant_id)
            .map(|p| p.id)
            .collect()
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot / (norm_a * norm_b)
        }
    }
}

#[async_trait]
impl VectorStorage for MockVectorStorage {
    #[allow(clippy::unwrap_used)]
    async fn ensure_collection(&self) -> VectorDataResult<()> {
        *self.collection_exists.lock().unwrap() = true;
        Ok(())
    }

    #[allow(clippy::unwrap_used)]
    async fn collection_exists(&self) -> VectorDataResult<bool> {
        Ok(*self.collection_exists.lock().unwrap())
    }

    #[allow(clippy::unwrap_used)]
    async fn upsert_points(
        &self,
        points: Vec<VectorPoint>,
        correlation_id: &CorrelationId,
    ) -> VectorDataResult<()> {
        if self.fail_on_upsert {
            return Err(VectorDataError::Storage(
                "Mock vector index configured to fail".into(),
            ));
        }

        tracing::debug!(
            correlation_id = %correlation_id,
            point_count = points.len(),
            "Mock upsert"
        );

        let mut stored = self.points.lock().unwrap();
        for point in points {
            // Replace-by-id, like a real upsert
            stored.retain(|existing| existing.id != point.id);
            stored.push(point);
        }
        Ok(())
    }

    #[allow(clippy::unwrap_used)]
    async fn search(
        &self,
        query: Vec<f32>,
        tenant_id: Uuid,
        limit: usize,
        score_threshold: f32,
        correlation_id: &CorrelationId,
    ) -> VectorDataResult<Vec<SearchHit>> {
        if self.fail_on_search {
            return Err(VectorDataError::Storage(
                "Mock vector index configured to fail".into(),
            ));
        }

        tracing::debug!(correlation_id = %correlation_id, "Mock search");

        let stored = self.points.lock().unwrap();
        let mut hits: Vec<SearchHit> = stored
            .iter()
            .filter(|p| p.payload.tenant_id == tenant_id)
            .map(|p| SearchHit {
                chunk_id: p.payload.chunk_id,
                document_id: p.payload.document_id,
                tenant_id: p.payload.tenant_id,
                chunk_index: p.payload.chunk_index,
                filename: p.payload.filename.clone(),
                text: p.payload.text.clone(),
                score: Self::cosine(&query, &p.vector),
                metadata: p.payload.metadata.clone(),
            })
            .filter(|hit| hit.score >= score_threshold)
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    #[allow(clippy::unwrap_used)]
    async fn delete_points(&self, ids: &[Uuid], tenant_id: Uuid) -> VectorDataResult<()> {
        let mut stored = self.points.lock().unwrap();
        // Both conditions must hold, mirroring the filtered delete of the
        // real backend
        stored.retain(|p| !(ids.contains(&p.id) && p.payload.tenant_id == tenant_id));
        Ok(())
    }

    #[allow(clippy::unwrap_used)]
    async fn delete_tenant_points(&self, tenant_id: Uuid) -> VectorDataResult<()> {
        let mut stored = self.points.lock().unwrap();
        stored.retain(|p| p.payload.tenant_id != tenant_id);
        Ok(())
    }

    #[allow(clippy::unwrap_used)]
    async fn drop_collection(&self) -> VectorDataResult<bool> {
        let existed = *self.collection_exists.lock().unwrap();
        *self.collection_exists.lock().unwrap() = false;
        self.points.lock().unwrap().clear();
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::traits::PointPayload;

    fn point(tenant_id: Uuid, vector: Vec<f32>, text: &str) -> VectorPoint {
        let chunk_id = Uuid::new_v4();
        VectorPoint {
            id: chunk_id,
            vector,
            payload: PointPayload {
                tenant_id,
                document_id: Uuid::new_v4(),
                chunk_id,
                chunk_index: 0,
                filename: "file.txt".to_string(),
                text: text.to_string(),
                metadata: serde_json::Value::Null,
            },
        }
    }

    #[tokio::test]
    async fn search_is_tenant_scoped() {
        let storage = MockVectorStorage::new();
        let tenant_a = Uuid::new_v4();
        let tenant_b = Uuid::new_v4();

        storage
            .upsert_points(
                vec![
                    point(tenant_a, vec![1.0, 0.0], "alpha"),
                    point(tenant_b, vec![1.0, 0.0], "beta"),
                ],
                &CorrelationId::new(),
            )
            .await
            .unwrap();

        let hits = storage
            .search(vec![1.0, 0.0], tenant_a, 10, 0.0, &CorrelationId::new())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].tenant_id, tenant_a);
        assert_eq!(hits[0].text, "alpha");
    }

    #[tokio::test]
    async fn search_orders_by_similarity_and_applies_threshold() {
        let storage = MockVectorStorage::new();
        let tenant = Uuid::new_v4();

        storage
            .upsert_points(
                vec![
                    point(tenant, vec![1.0, 0.0], "exact"),
                    point(tenant, vec![0.7, 0.7], "diagonal"),
                    point(tenant, vec![0.0, 1.0], "orthogonal"),
                ],
                &CorrelationId::new(),
            )
            .await
            .unwrap();

        let hits = storage
            .search(vec![1.0, 0.0], tenant, 10, 0.5, &CorrelationId::new())
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "exact");
        assert_eq!(hits[1].text, "diagonal");
    }

    #[tokio::test]
    async fn delete_requires_matching_tenant() {
        let storage = MockVectorStorage::new();
        let tenant_a = Uuid::new_v4();
        let tenant_b = Uuid::new_v4();

        let victim = point(tenant_b, vec![1.0, 0.0], "secret");
        let victim_id = victim.id;
        storage
            .upsert_points(vec![victim], &CorrelationId::new())
            .await
            .unwrap();

        // Tenant A supplies tenant B's point id; the filter must win
        storage.delete_points(&[victim_id], tenant_a).await.unwrap();
        assert_eq!(storage.tenant_point_ids(tenant_b).len(), 1);

        storage.delete_points(&[victim_id], tenant_b).await.unwrap();
        assert!(storage.tenant_point_ids(tenant_b).is_empty());
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let storage = MockVectorStorage::new();
        let tenant = Uuid::new_v4();

        let mut p = point(tenant, vec![1.0, 0.0], "v1");
        let correlation_id = CorrelationId::new();
        storage
            .upsert_points(vec![p.clone()], &correlation_id)
            .await
            .unwrap();
        p.payload.text = "v2".to_string();
        storage.upsert_points(vec![p], &correlation_id).await.unwrap();

        let points = storage.all_points();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].payload.text, "v2");
    }
}
