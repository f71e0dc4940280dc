//! Typed view over the merged YAML configuration.
//!
//! Every field has a default so an empty `config.yml` yields a runnable
//! setup once the API keys are supplied through the environment.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub vector_store: VectorStoreConfig,
    pub parser: ParserConfig,
    pub ingest: IngestConfig,
    pub workflow: WorkflowConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub embedding_model: String,
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.01,
            embedding_model: "text-embedding-3-small".to_string(),
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    Qdrant,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    pub backend: VectorBackend,
    /// gRPC endpoint of the Qdrant server.
    pub url: String,
    pub api_key: Option<String>,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::Qdrant,
            url: "http://localhost:6334".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub result_type: String,
    pub poll_interval_ms: u64,
    pub max_wait_secs: u64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cloud.llamaindex.ai".to_string(),
            api_key: None,
            result_type: "markdown".to_string(),
            poll_interval_ms: 1000,
            max_wait_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Chunk size in characters
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embed_batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            chunk_overlap: 200,
            embed_batch_size: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub similarity_top_k: usize,
    pub timeout_secs: u64,
    pub max_questions: usize,
    pub max_review_questions: usize,
    /// Number of review passes after which the report is accepted as is.
    pub max_reviews: u32,
    pub answer_concurrency: usize,
    pub max_tool_calls: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            similarity_top_k: 10,
            timeout_secs: 600,
            max_questions: 8,
            max_review_questions: 4,
            max_reviews: 2,
            answer_concurrency: 4,
            max_tool_calls: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_mb: usize,
    /// Browser origins allowed by CORS; empty means local origins only.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            max_upload_mb: 50,
            cors_allowed_origins: Vec::new(),
        }
    }
}
