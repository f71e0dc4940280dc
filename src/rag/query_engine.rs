//! Retrieve-then-synthesize question answering over one collection.

use super::index::DocumentIndex;
use super::store::ChunkSearchResult;
use crate::core::errors::ApiError;

/// Answer returned when retrieval finds nothing to ground on.
pub const EMPTY_RESPONSE: &str = "Empty Response";

pub struct QueryEngine {
    index: DocumentIndex,
    similarity_top_k: usize,
}

impl QueryEngine {
    pub fn new(index: DocumentIndex, similarity_top_k: usize) -> Self {
        Self {
            index,
            similarity_top_k: similarity_top_k.max(1),
        }
    }

    pub async fn query(&self, query: &str) -> Result<String, ApiError> {
        let hits = self.index.retrieve(query, self.similarity_top_k).await?;
        tracing::debug!(
            "Retrieved {} chunks from {} for query: {}",
            hits.len(),
            self.index.collection(),
            query
        );
        if hits.is_empty() {
            return Ok(EMPTY_RESPONSE.to_string());
        }

        let prompt = text_qa_prompt(&build_context(&hits), query);
        self.index.llm().complete(&prompt).await
    }
}

fn build_context(hits: &[ChunkSearchResult]) -> String {
    hits.iter()
        .map(|hit| format!("file_name: {}\n\n{}", hit.chunk.source, hit.chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn text_qa_prompt(context: &str, query: &str) -> String {
    format!(
        "Context information is below.\n\
         ---------------------\n\
         {context}\n\
         ---------------------\n\
         Given the context information and not prior knowledge, answer the query.\n\
         Query: {query}\n\
         Answer: "
    )
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::ingest::Chunker;
    use crate::rag::{InMemoryRagStore, RagStore};
    use crate::test_support::{scripted_service, FakeParser, ScriptedLlm};

    #[tokio::test]
    async fn query_builds_grounded_prompt() {
        let provider = Arc::new(ScriptedLlm::new(["The budget was $776 million."]));
        let llm = scripted_service(provider.clone());
        let store: Arc<dyn RagStore> = Arc::new(InMemoryRagStore::new());
        let parser = FakeParser::default()
            .with_document("sfpd.pdf", "The police budget in 2023 was 776 million dollars.");
        let index = DocumentIndex::create_or_load(
            store,
            llm,
            &parser,
            &Chunker::new(1000, 100),
            "document-q",
            &[PathBuf::from("sfpd.pdf")],
        )
        .await
        .unwrap();

        let engine = QueryEngine::new(index, 10);
        let answer = engine.query("What was the police budget?").await.unwrap();

        assert_eq!(answer, "The budget was $776 million.");
        let prompt = &provider.requests()[0].messages[0].content;
        assert!(prompt.starts_with("Context information is below."));
        assert!(prompt.contains("file_name: sfpd.pdf"));
        assert!(prompt.contains("776 million dollars"));
        assert!(prompt.contains("Query: What was the police budget?"));
    }

    #[test]
    fn context_joins_hits_in_rank_order() {
        let hits = vec![
            ChunkSearchResult {
                chunk: crate::rag::StoredChunk {
                    chunk_id: "1".to_string(),
                    content: "first".to_string(),
                    source: "a.pdf".to_string(),
                    chunk_index: 0,
                },
                score: 0.9,
            },
            ChunkSearchResult {
                chunk: crate::rag::StoredChunk {
                    chunk_id: "2".to_string(),
                    content: "second".to_string(),
                    source: "b.pdf".to_string(),
                    chunk_index: 0,
                },
                score: 0.5,
            },
        ];
        let context = build_context(&hits);
        assert!(context.find("first").unwrap() < context.find("second").unwrap());
    }
}
