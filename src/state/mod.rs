use std::path::PathBuf;
use std::sync::Arc;

use crate::agent::DocumentResearchAgent;
use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::core::errors::ApiError;
use crate::ingest::{Chunker, DocumentParser, RoutingParser};
use crate::llm::LlmService;
use crate::rag::{open_store, RagStore};

pub mod error;
pub mod sessions;

use error::InitializationError;
use sessions::SessionRegistry;

/// Global application state shared across all routes and WebSocket tasks.
///
/// Holds the loaded configuration, the LLM and vector store clients, the
/// document parser, and the research agents opened so far.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: AppConfig,
    pub llm: LlmService,
    pub rag_store: Arc<dyn RagStore>,
    pub parser: Arc<dyn DocumentParser>,
    pub chunker: Chunker,
    pub sessions: SessionRegistry,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// This process includes:
    /// 1. Setting up paths and loading configuration
    /// 2. Creating the LLM client and the vector store backend
    /// 3. Choosing the document parser
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone());
        let settings = config.settings().map_err(InitializationError::Config)?;

        let llm = LlmService::from_config(&settings).map_err(InitializationError::Llm)?;
        let rag_store =
            open_store(&settings.vector_store).map_err(InitializationError::VectorStore)?;
        let parser: Arc<dyn DocumentParser> = Arc::new(
            RoutingParser::from_config(&settings.parser).map_err(InitializationError::Parser)?,
        );

        Ok(Arc::new(Self::with_services(
            paths, config, settings, llm, rag_store, parser,
        )))
    }

    pub fn with_services(
        paths: Arc<AppPaths>,
        config: ConfigService,
        settings: AppConfig,
        llm: LlmService,
        rag_store: Arc<dyn RagStore>,
        parser: Arc<dyn DocumentParser>,
    ) -> Self {
        let chunker = Chunker::from_config(&settings.ingest);
        Self {
            paths,
            config,
            settings,
            llm,
            rag_store,
            parser,
            chunker,
            sessions: SessionRegistry::new(),
        }
    }

    /// Build (or reopen) the research agent for `collection` and register it.
    pub async fn open_agent(
        &self,
        collection: &str,
        file_paths: &[PathBuf],
    ) -> Result<Arc<DocumentResearchAgent>, ApiError> {
        let agent = DocumentResearchAgent::new(
            self.rag_store.clone(),
            self.llm.clone(),
            self.parser.as_ref(),
            &self.chunker,
            self.settings.workflow.clone(),
            collection,
            file_paths,
        )
        .await?;
        tracing::info!(
            "Research agent ready for {} ({:?})",
            collection,
            agent.origin()
        );
        Ok(self.sessions.insert(agent).await)
    }

    /// The agent for `collection`, opening it from the store when it is
    /// not registered yet.
    pub async fn agent_for(&self, collection: &str) -> Result<Arc<DocumentResearchAgent>, ApiError> {
        if let Some(agent) = self.sessions.get(collection).await {
            return Ok(agent);
        }
        if !self.rag_store.collection_exists(collection).await? {
            return Err(ApiError::NotFound(format!(
                "Collection {} not found",
                collection
            )));
        }
        self.open_agent(collection, &[]).await
    }
}
