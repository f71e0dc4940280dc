//! Qdrant-backed chunk store.
//!
//! Chunks are stored as points with uuid ids, the embedding as the single
//! unnamed vector (cosine distance) and text/source/index as payload.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, PointStruct, QueryPointsBuilder,
    ScoredPoint, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;

use super::store::{ChunkSearchResult, RagStore, StoredChunk};
use crate::core::config::VectorStoreConfig;
use crate::core::errors::ApiError;

const PAYLOAD_KEY_ID: &str = "chunk_id";
const PAYLOAD_KEY_TEXT: &str = "text";
const PAYLOAD_KEY_SOURCE: &str = "source";
const PAYLOAD_KEY_INDEX: &str = "chunk_index";

/// Points per upsert request.
const UPSERT_BATCH: usize = 256;

pub struct QdrantRagStore {
    client: Qdrant,
}

impl QdrantRagStore {
    pub fn new(config: &VectorStoreConfig) -> Result<Self, ApiError> {
        let mut builder = Qdrant::from_url(&config.url);
        if let Some(api_key) = &config.api_key {
            builder = builder.api_key(api_key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Internal(format!("Qdrant connection failed: {e}")))?;
        Ok(Self { client })
    }
}

fn chunk_to_point(chunk: &StoredChunk, embedding: Vec<f32>) -> PointStruct {
    let mut payload: HashMap<String, QdrantValue> = HashMap::new();
    payload.insert(PAYLOAD_KEY_ID.to_string(), chunk.chunk_id.clone().into());
    payload.insert(PAYLOAD_KEY_TEXT.to_string(), chunk.content.clone().into());
    payload.insert(PAYLOAD_KEY_SOURCE.to_string(), chunk.source.clone().into());
    payload.insert(
        PAYLOAD_KEY_INDEX.to_string(),
        (chunk.chunk_index as i64).into(),
    );

    PointStruct::new(chunk.chunk_id.clone(), embedding, payload)
}

fn payload_string(point: &ScoredPoint, key: &str) -> String {
    match point.payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => s.clone(),
        _ => String::new(),
    }
}

fn scored_point_to_result(point: &ScoredPoint) -> ChunkSearchResult {
    let chunk_index = match point
        .payload
        .get(PAYLOAD_KEY_INDEX)
        .and_then(|v| v.kind.as_ref())
    {
        Some(Kind::IntegerValue(n)) => (*n).max(0) as usize,
        Some(Kind::DoubleValue(n)) => n.max(0.0) as usize,
        _ => 0,
    };

    ChunkSearchResult {
        chunk: StoredChunk {
            chunk_id: payload_string(point, PAYLOAD_KEY_ID),
            content: payload_string(point, PAYLOAD_KEY_TEXT),
            source: payload_string(point, PAYLOAD_KEY_SOURCE),
            chunk_index,
        },
        score: point.score,
    }
}

#[async_trait]
impl RagStore for QdrantRagStore {
    async fn health_check(&self) -> bool {
        match self.client.health_check().await {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!("Qdrant health check failed: {}", err);
                false
            }
        }
    }

    fn name(&self) -> &str {
        "qdrant"
    }

    async fn list_collections(&self) -> Result<Vec<String>, ApiError> {
        let response = self
            .client
            .list_collections()
            .await
            .map_err(|e| ApiError::Upstream(format!("Qdrant list collections failed: {e}")))?;
        let mut names: Vec<String> = response
            .collections
            .into_iter()
            .map(|c| c.name)
            .collect();
        names.sort();
        Ok(names)
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool, ApiError> {
        self.client
            .collection_exists(collection)
            .await
            .map_err(|e| ApiError::Upstream(format!("Qdrant collection check failed: {e}")))
    }

    async fn create_collection(
        &self,
        collection: &str,
        dimension: usize,
    ) -> Result<(), ApiError> {
        self.client
            .create_collection(
                CreateCollectionBuilder::new(collection)
                    .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Cosine)),
            )
            .await
            .map_err(|e| {
                ApiError::Upstream(format!(
                    "Failed to create Qdrant collection '{}': {e}",
                    collection
                ))
            })?;
        Ok(())
    }

    async fn upsert(
        &self,
        collection: &str,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), ApiError> {
        let points: Vec<PointStruct> = items
            .into_iter()
            .map(|(chunk, embedding)| chunk_to_point(&chunk, embedding))
            .collect();

        for batch in points.chunks(UPSERT_BATCH) {
            self.client
                .upsert_points(UpsertPointsBuilder::new(collection, batch.to_vec()).wait(true))
                .await
                .map_err(|e| ApiError::Upstream(format!("Qdrant upsert failed: {e}")))?;
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError> {
        let response = self
            .client
            .query(
                QueryPointsBuilder::new(collection)
                    .query(query_embedding.to_vec())
                    .limit(limit as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| ApiError::Upstream(format!("Qdrant search failed: {e}")))?;

        Ok(response.result.iter().map(scored_point_to_result).collect())
    }

    async fn count(&self, collection: &str) -> Result<usize, ApiError> {
        let result = self
            .client
            .count(CountPointsBuilder::new(collection).exact(true))
            .await
            .map_err(|e| ApiError::Upstream(format!("Qdrant count failed: {e}")))?;
        Ok(result.result.map(|c| c.count as usize).unwrap_or(0))
    }

    async fn delete_collection(&self, collection: &str) -> Result<bool, ApiError> {
        if !self.collection_exists(collection).await? {
            return Ok(false);
        }
        let response = self
            .client
            .delete_collection(collection)
            .await
            .map_err(|e| ApiError::Upstream(format!("Qdrant delete collection failed: {e}")))?;
        Ok(response.result)
    }
}
