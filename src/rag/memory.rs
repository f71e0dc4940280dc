use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{ChunkSearchResult, RagStore, StoredChunk};
use super::vector_math::rank_descending_by_cosine;
use crate::core::errors::ApiError;

struct Collection {
    dimension: usize,
    chunks: Vec<StoredChunk>,
    embeddings: Vec<Vec<f32>>,
}

/// Process-local store; contents are lost on restart.
#[derive(Default)]
pub struct InMemoryRagStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryRagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RagStore for InMemoryRagStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_collections(&self) -> Result<Vec<String>, ApiError> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool, ApiError> {
        Ok(self.collections.read().await.contains_key(collection))
    }

    async fn create_collection(
        &self,
        collection: &str,
        dimension: usize,
    ) -> Result<(), ApiError> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(collection) {
            return Err(ApiError::BadRequest(format!(
                "Collection already exists: {}",
                collection
            )));
        }
        collections.insert(
            collection.to_string(),
            Collection {
                dimension,
                chunks: Vec::new(),
                embeddings: Vec::new(),
            },
        );
        Ok(())
    }

    async fn upsert(
        &self,
        collection: &str,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), ApiError> {
        let mut collections = self.collections.write().await;
        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| ApiError::NotFound(format!("Collection not found: {}", collection)))?;

        for (chunk, embedding) in items {
            if embedding.len() != entry.dimension {
                return Err(ApiError::BadRequest(format!(
                    "Embedding dimension {} does not match collection dimension {}",
                    embedding.len(),
                    entry.dimension
                )));
            }
            match entry
                .chunks
                .iter()
                .position(|existing| existing.chunk_id == chunk.chunk_id)
            {
                Some(pos) => {
                    entry.chunks[pos] = chunk;
                    entry.embeddings[pos] = embedding;
                }
                None => {
                    entry.chunks.push(chunk);
                    entry.embeddings.push(embedding);
                }
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError> {
        let collections = self.collections.read().await;
        let entry = collections
            .get(collection)
            .ok_or_else(|| ApiError::NotFound(format!("Collection not found: {}", collection)))?;

        let ranked = rank_descending_by_cosine(query_embedding, &entry.embeddings)?;
        Ok(ranked
            .into_iter()
            .take(limit)
            .map(|(idx, score)| ChunkSearchResult {
                chunk: entry.chunks[idx].clone(),
                score,
            })
            .collect())
    }

    async fn count(&self, collection: &str) -> Result<usize, ApiError> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map(|entry| entry.chunks.len())
            .ok_or_else(|| ApiError::NotFound(format!("Collection not found: {}", collection)))
    }

    async fn delete_collection(&self, collection: &str) -> Result<bool, ApiError> {
        Ok(self.collections.write().await.remove(collection).is_some())
    }
}
