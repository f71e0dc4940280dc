//! RAG (Retrieval-Augmented Generation) module.
//!
//! This module provides:
//! - `RagStore`: collection-scoped vector storage (Qdrant or in-memory)
//! - `DocumentIndex`: builds or reopens a collection from uploaded files
//! - `QueryEngine`: answers a query from the best matching chunks

mod index;
mod memory;
mod qdrant;
mod query_engine;
mod store;
mod vector_math;

use std::sync::Arc;

pub use index::{DocumentIndex, IndexOrigin};
pub use memory::InMemoryRagStore;
pub use qdrant::QdrantRagStore;
pub use query_engine::{QueryEngine, EMPTY_RESPONSE};
pub use store::{ChunkSearchResult, RagStore, StoredChunk};

use crate::core::config::{VectorBackend, VectorStoreConfig};
use crate::core::errors::ApiError;

/// Open the configured vector store backend.
pub fn open_store(config: &VectorStoreConfig) -> Result<Arc<dyn RagStore>, ApiError> {
    match config.backend {
        VectorBackend::Qdrant => {
            tracing::info!("Using Qdrant vector store at {}", config.url);
            Ok(Arc::new(QdrantRagStore::new(config)?))
        }
        VectorBackend::Memory => {
            tracing::info!("Using in-memory vector store");
            Ok(Arc::new(InMemoryRagStore::new()))
        }
    }
}
