//! RagStore trait: abstract interface for the vector database.
//!
//! Chunks live in named collections, one per uploaded document set.
//! `QdrantRagStore` is the production backend, `InMemoryRagStore` serves
//! local runs and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// A stored RAG chunk with metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredChunk {
    pub chunk_id: String,
    pub content: String,
    /// Source file name.
    pub source: String,
    pub chunk_index: usize,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: StoredChunk,
    /// Similarity score (higher = better).
    pub score: f32,
}

#[async_trait]
pub trait RagStore: Send + Sync {
    /// Backend name for status reporting.
    fn name(&self) -> &str;

    /// Whether the backend answers at all.
    async fn health_check(&self) -> bool {
        self.list_collections().await.is_ok()
    }

    async fn list_collections(&self) -> Result<Vec<String>, ApiError>;

    async fn collection_exists(&self, collection: &str) -> Result<bool, ApiError>;

    /// Create an empty collection for vectors of `dimension` floats.
    async fn create_collection(&self, collection: &str, dimension: usize)
        -> Result<(), ApiError>;

    /// Insert chunks with their embedding vectors.
    async fn upsert(
        &self,
        collection: &str,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), ApiError>;

    /// Best `limit` chunks by cosine similarity, best first.
    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError>;

    async fn count(&self, collection: &str) -> Result<usize, ApiError>;

    /// Drop a collection. Returns false when it did not exist.
    async fn delete_collection(&self, collection: &str) -> Result<bool, ApiError>;
}
