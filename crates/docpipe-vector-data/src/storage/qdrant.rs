//! Qdrant vector index backend
//!
//! Stores chunk embeddings as points whose id is the chunk id and whose
//! payload carries the owning tenant. Every search and delete goes through
//! a `tenant_id` filter; the field is keyword-indexed at collection
//! creation so the filter stays cheap at scale.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    CollectionExistsRequest, Condition, CreateCollection, CreateFieldIndexCollection,
    DeleteCollection, DeletePoints, Distance, FieldType, Filter, PointId, PointStruct,
    PointsSelector, SearchPoints, UpsertPoints, Value, VectorParams,
    points_selector::PointsSelectorOneOf,
};
use qdrant_client::{Payload, Qdrant};
use uuid::Uuid;

use docpipe_common::CorrelationId;
use docpipe_config::VectorStorageConfig;

use crate::error::{VectorDataError, VectorDataResult};
use crate::storage::traits::{SearchHit, VectorPoint, VectorStorage};

/// Qdrant-backed vector index
#[derive(Clone)]
pub struct QdrantStorage {
    client: std::sync::Arc<Qdrant>,
    collection_name: String,
    dimension: usize,
}

impl QdrantStorage {
    /// Connect to Qdrant and ensure the collection exists
    ///
    /// Reads `QDRANT_API_KEY` from the environment when set.
    ///
    /// # Errors
    ///
    /// Returns `VectorDataError::Unavailable` if the client cannot be
    /// built, or `VectorDataError::Collection` if collection setup fails.
    pub async fn new(config: &VectorStorageConfig) -> VectorDataResult<Self> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Ok(api_key) = std::env::var("QDRANT_API_KEY") {
            builder = builder.api_key(api_key);
        }

        let client = builder
            .build()
            .map_err(|e| VectorDataError::Unavailable(format!("Failed to create Qdrant client: {e}")))?;

        let storage = Self {
            client: std::sync::Arc::new(client),
            collection_name: config.collection.clone(),
            dimension: config.dimension,
        };

        storage.ensure_collection().await?;
        Ok(storage)
    }

    fn tenant_condition(tenant_id: Uuid) -> Condition {
        Condition::matches("tenant_id", tenant_id.to_string())
    }

    fn point_to_struct(&self, point: &VectorPoint) -> VectorDataResult<PointStruct> {
        if point.vector.len() != self.dimension {
            return Err(VectorDataError::DimensionMismatch {
                expected: self.dimension,
                actual: point.vector.len(),
            });
        }

        let mut payload = HashMap::new();
        payload.insert(
            "tenant_id".to_string(),
            Value::from(point.payload.tenant_id.to_string()),
        );
        payload.insert(
            "document_id".to_string(),
            Value::from(point.payload.document_id.to_string()),
        );
        payload.insert(
            "chunk_id".to_string(),
            Value::from(point.payload.chunk_id.to_string()),
        );
        payload.insert(
            "chunk_index".to_string(),
            Value::from(point.payload.chunk_index),
        );
        payload.insert(
            "filename".to_string(),
            Value::from(point.payload.filename.clone()),
        );
        payload.insert("text".to_string(), Value::from(point.payload.text.clone()));
        // Opaque metadata rides as a JSON string so the schema stays flat
        payload.insert(
            "metadata".to_string(),
            Value::from(point.payload.metadata.to_string()),
        );

        Ok(PointStruct::new(
            point.id.to_string(),
            point.vector.clone(),
            Payload::from(payload),
        ))
    }

    fn hit_from_payload(
        payload: &HashMap<String, Value>,
        score: f32,
    ) -> VectorDataResult<SearchHit> {
        let uuid_field = |key: &str| -> VectorDataResult<Uuid> {
            payload
                .get(key)
                .and_then(|v| v.as_str())
                .and_then(|s| Uuid::parse_str(s).ok())
                .ok_or_else(|| VectorDataError::Payload(format!("missing or invalid {key}")))
        };

        let text_field = |key: &str| -> String {
            payload
                .get(key)
                .and_then(|v| v.as_str())
                .map(ToString::to_string)
                .unwrap_or_default()
        };

        let metadata = payload
            .get("metadata")
            .and_then(|v| v.as_str())
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or(serde_json::Value::Null);

        Ok(SearchHit {
            chunk_id: uuid_field("chunk_id")?,
            document_id: uuid_field("document_id")?,
            tenant_id: uuid_field("tenant_id")?,
            chunk_index: payload
                .get("chunk_index")
                .and_then(|v| v.as_integer())
                .unwrap_or(0),
            filename: text_field("filename"),
            text: text_field("text"),
            score,
            metadata,
        })
    }
}

#[async_trait]
impl VectorStorage for QdrantStorage {
    async fn collection_exists(&self) -> VectorDataResult<bool> {
        let request = CollectionExistsRequest {
            collection_name: self.collection_name.clone(),
        };

        self.client
            .collection_exists(request)
            .await
            .map_err(|e| VectorDataError::Collection(format!("Failed to check collection: {e}")))
    }

    async fn ensure_collection(&self) -> VectorDataResult<()> {
        if !self.collection_exists().await? {
            let request = CreateCollection {
                collection_name: self.collection_name.clone(),
                vectors_config: Some(
                    VectorParams {
                        size: self.dimension as u64,
                        distance: Distance::Cosine as i32,
                        ..Default::default()
                    }
                    .into(),
                ),
                ..Default::default()
            };

            match self.client.create_collection(request).await {
                Ok(_) => {}
                Err(e) if e.to_string().contains("already exists") => {
                    // Lost the creation race to another process; the
                    // collection is there, which is all we need
                }
                Err(e) => {
                    return Err(VectorDataError::Collection(format!(
                        "Failed to create collection '{}': {e}",
                        self.collection_name
                    )));
                }
            }
        }

        // Keyword index on tenant_id keeps filtered search fast at scale;
        // re-creating an existing index is a no-op server side
        let index_request = CreateFieldIndexCollection {
            collection_name: self.collection_name.clone(),
            field_name: "tenant_id".to_string(),
            field_type: Some(FieldType::Keyword as i32),
            ..Default::default()
        };

        self.client
            .create_field_index(index_request)
            .await
            .map_err(|e| {
                VectorDataError::Collection(format!("Failed to index tenant_id field: {e}"))
            })?;

        Ok(())
    }

    #[tracing::instrument(skip(self, points), fields(point_count = points.len(), correlation_id = %correlation_id))]
    async fn upsert_points(
        &self,
        points: Vec<VectorPoint>,
        correlation_id: &CorrelationId,
    ) -> VectorDataResult<()> {
        if points.is_empty() {
            return Ok(());
        }

        let point_structs = points
            .iter()
            .map(|p| self.point_to_struct(p))
            .collect::<VectorDataResult<Vec<_>>>()?;

        let request = UpsertPoints {
            collection_name: self.collection_name.clone(),
            points: point_structs,
            ..Default::default()
        };

        self.client
            .upsert_points(request)
            .await
            .map_err(|e| VectorDataError::Storage(format!("Failed to upsert points: {e}")))?;

        Ok(())
    }

    #[tracing::instrument(skip(self, query), fields(query_dim = query.len(), tenant_id = %tenant_id, limit, correlation_id = %correlation_id))]
    async fn search(
        &self,
        query: Vec<f32>,
        tenant_id: Uuid,
        limit: usize,
        score_threshold: f32,
        correlation_id: &CorrelationId,
    ) -> VectorDataResult<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(VectorDataError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        tracing::info!(
            correlation_id = %correlation_id,
            collection = %self.collection_name,
            "Performing filtered vector search"
        );

        let request = SearchPoints {
            collection_name: self.collection_name.clone(),
            vector: query,
            limit: limit as u64,
            filter: Some(Filter::must([Self::tenant_condition(tenant_id)])),
            score_threshold: Some(score_threshold),
            with_payload: Some(true.into()),
            ..Default::default()
        };

        let response = self
            .client
            .search_points(request)
            .await
            .map_err(|e| VectorDataError::Storage(format!("Search failed: {e}")))?;

        response
            .result
            .iter()
            .map(|scored| Self::hit_from_payload(&scored.payload, scored.score))
            .collect()
    }

    async fn delete_points(&self, ids: &[Uuid], tenant_id: Uuid) -> VectorDataResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        // Combine the id list with the tenant filter so a forged id can
        // never cross tenants
        let filter = Filter::must([
            Condition::has_id(ids.iter().map(|id| PointId::from(id.to_string()))),
            Self::tenant_condition(tenant_id),
        ]);

        let request = DeletePoints {
            collection_name: self.collection_name.clone(),
            points: Some(PointsSelector {
                points_selector_one_of: Some(PointsSelectorOneOf::Filter(filter)),
            }),
            ..Default::default()
        };

        self.client
            .delete_points(request)
            .await
            .map_err(|e| VectorDataError::Storage(format!("Failed to delete points: {e}")))?;

        Ok(())
    }

    async fn delete_tenant_points(&self, tenant_id: Uuid) -> VectorDataResult<()> {
        let request = DeletePoints {
            collection_name: self.collection_name.clone(),
            points: Some(PointsSelector {
                points_selector_one_of: Some(PointsSelectorOneOf::Filter(Filter::must([
                    Self::tenant_condition(tenant_id),
                ]))),
            }),
            ..Default::default()
        };

        self.client
            .delete_points(request)
            .await
            .map_err(|e| {
                VectorDataError::Storage(format!("Failed to delete tenant points: {e}"))
            })?;

        Ok(())
    }

    async fn drop_collection(&self) -> VectorDataResult<bool> {
        if !self.collection_exists().await? {
            return Ok(false);
        }

        let request = DeleteCollection {
            collection_name: self.collection_name.clone(),
            ..Default::default()
        };

        self.client
            .delete_collection(request)
            .await
            .map_err(|e| {
                VectorDataError::Collection(format!(
                    "Failed to drop collection '{}': {e}",
                    self.collection_name
                ))
            })?;

        Ok(true)
    }
}
