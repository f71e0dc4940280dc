// Document Research Agent
// One indexed collection plus the research graph that writes reports from it

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::tools::{QueryEngineTool, Tool};
use crate::core::config::WorkflowConfig;
use crate::core::errors::ApiError;
use crate::graph::{build_research_graph, GraphRuntime, NodeContext, ProgressSink, ResearchState};
use crate::ingest::{Chunker, DocumentParser};
use crate::llm::LlmService;
use crate::rag::{DocumentIndex, IndexOrigin, QueryEngine, RagStore};

pub struct DocumentResearchAgent {
    llm: LlmService,
    index: DocumentIndex,
    tools: Vec<Arc<dyn Tool>>,
    settings: WorkflowConfig,
    graph: GraphRuntime,
}

impl DocumentResearchAgent {
    /// Builds or reopens `collection_name`, then wires its query engine
    /// into the document tool.
    #[allow(clippy::too_many_arguments)]
    pub async fn new(
        store: Arc<dyn RagStore>,
        llm: LlmService,
        parser: &dyn DocumentParser,
        chunker: &Chunker,
        settings: WorkflowConfig,
        collection_name: &str,
        file_paths: &[PathBuf],
    ) -> Result<Self, ApiError> {
        let index = DocumentIndex::create_or_load(
            store,
            llm.clone(),
            parser,
            chunker,
            collection_name,
            file_paths,
        )
        .await?;

        let mut file_names: Vec<String> = file_paths
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .collect();
        if file_names.is_empty() {
            file_names.push(collection_name.to_string());
        }

        let engine = Arc::new(QueryEngine::new(index.clone(), settings.similarity_top_k));
        let tool: Arc<dyn Tool> = Arc::new(QueryEngineTool::for_documents(engine, &file_names));
        let graph = build_research_graph(&settings).map_err(ApiError::from)?;

        Ok(Self {
            llm,
            index,
            tools: vec![tool],
            settings,
            graph,
        })
    }

    pub fn collection(&self) -> &str {
        self.index.collection()
    }

    pub fn origin(&self) -> IndexOrigin {
        self.index.origin()
    }

    pub fn tool(&self) -> &Arc<dyn Tool> {
        &self.tools[0]
    }

    /// Run the research workflow for `query`, streaming progress into
    /// `progress`, and return the accepted report.
    pub async fn run(&self, query: &str, progress: ProgressSink) -> Result<String, ApiError> {
        let mut state = ResearchState::new(query);
        let ctx = NodeContext {
            llm: &self.llm,
            tools: &self.tools,
            settings: &self.settings,
            progress: &progress,
        };

        let limit = Duration::from_secs(self.settings.timeout_secs);
        tracing::info!(
            "Starting research on {} for query: {}",
            self.collection(),
            query
        );
        match tokio::time::timeout(limit, self.graph.run(&mut state, &ctx)).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::error!("Research workflow timed out after {}s", limit.as_secs());
                return Err(ApiError::Timeout(format!(
                    "Research workflow timed out after {}s",
                    limit.as_secs()
                )));
            }
        }

        state
            .output
            .ok_or_else(|| ApiError::Internal("Workflow finished without a report".to_string()))
    }
}
