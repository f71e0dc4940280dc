use std::path::PathBuf;
use std::sync::Arc;

use uuid::Uuid;

use super::store::{ChunkSearchResult, RagStore, StoredChunk};
use crate::core::errors::ApiError;
use crate::ingest::{Chunker, DocumentParser, TextChunk};
use crate::llm::LlmService;

/// Whether `create_or_load` built the collection or found it in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrigin {
    Created,
    Loaded,
}

/// A vector collection paired with the embedding model that fills it.
#[derive(Clone)]
pub struct DocumentIndex {
    store: Arc<dyn RagStore>,
    llm: LlmService,
    collection: String,
    origin: IndexOrigin,
}

impl DocumentIndex {
    /// Load `collection` when the store already has it, otherwise parse,
    /// chunk and embed `file_paths` into a new collection.
    pub async fn create_or_load(
        store: Arc<dyn RagStore>,
        llm: LlmService,
        parser: &dyn DocumentParser,
        chunker: &Chunker,
        collection: &str,
        file_paths: &[PathBuf],
    ) -> Result<Self, ApiError> {
        if store.collection_exists(collection).await? {
            tracing::info!("Load collection {}", collection);
            return Ok(Self {
                store,
                llm,
                collection: collection.to_string(),
                origin: IndexOrigin::Loaded,
            });
        }

        tracing::info!("Create new collection {}", collection);
        if file_paths.is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Collection {} does not exist and no documents were provided",
                collection
            )));
        }

        let mut chunks: Vec<TextChunk> = Vec::new();
        for path in file_paths {
            for document in parser.parse(path).await? {
                chunks.extend(chunker.split(&document.text, &document.source));
            }
        }
        if chunks.is_empty() {
            return Err(ApiError::BadRequest(
                "The uploaded documents contain no text".to_string(),
            ));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = llm.embed(&texts).await?;
        let dimension = embeddings
            .first()
            .map(Vec::len)
            .filter(|dim| *dim > 0)
            .ok_or_else(|| ApiError::Upstream("embedding model returned no vectors".to_string()))?;

        store.create_collection(collection, dimension).await?;

        let items: Vec<(StoredChunk, Vec<f32>)> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                (
                    StoredChunk {
                        chunk_id: Uuid::new_v4().to_string(),
                        content: chunk.text,
                        source: chunk.source,
                        chunk_index: chunk.chunk_index,
                    },
                    embedding,
                )
            })
            .collect();
        let total = items.len();
        if let Err(err) = store.upsert(collection, items).await {
            // A half-built collection would later reopen as an empty index.
            match store.delete_collection(collection).await {
                Ok(_) => tracing::warn!("Dropped collection {} after failed upsert", collection),
                Err(cleanup) => tracing::error!(
                    "Failed to drop collection {} after failed upsert: {}",
                    collection,
                    cleanup
                ),
            }
            return Err(err);
        }
        tracing::info!("Indexed {} chunks into {}", total, collection);

        Ok(Self {
            store,
            llm,
            collection: collection.to_string(),
            origin: IndexOrigin::Created,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn origin(&self) -> IndexOrigin {
        self.origin
    }

    pub fn llm(&self) -> &LlmService {
        &self.llm
    }

    pub async fn chunk_count(&self) -> Result<usize, ApiError> {
        self.store.count(&self.collection).await
    }

    /// Embed the query and return the `top_k` closest chunks.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError> {
        let embedding = self.llm.embed_query(query).await?;
        self.store.search(&self.collection, &embedding, top_k).await
    }
}
