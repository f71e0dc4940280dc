use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::llama_parse::LlamaParseClient;
use crate::core::config::ParserConfig;
use crate::core::errors::ApiError;

/// Text extracted from one uploaded file (or one page group of it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub text: String,
    /// File name the text came from
    pub source: String,
}

#[async_trait]
pub trait DocumentParser: Send + Sync {
    async fn parse(&self, path: &Path) -> Result<Vec<ParsedDocument>, ApiError>;
}

const TEXT_EXTENSIONS: [&str; 4] = ["txt", "md", "markdown", "csv"];

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Reads text formats straight from disk.
pub struct PlainTextParser;

#[async_trait]
impl DocumentParser for PlainTextParser {
    async fn parse(&self, path: &Path) -> Result<Vec<ParsedDocument>, ApiError> {
        let text = tokio::fs::read_to_string(path).await.map_err(|err| {
            ApiError::BadRequest(format!("Cannot read {}: {}", path.display(), err))
        })?;
        Ok(vec![ParsedDocument {
            text,
            source: file_name(path),
        }])
    }
}

/// Text files are read locally, everything else goes to the remote parser.
pub struct RoutingParser {
    text: Arc<dyn DocumentParser>,
    remote: Option<Arc<dyn DocumentParser>>,
}

impl RoutingParser {
    pub fn new(text: Arc<dyn DocumentParser>, remote: Option<Arc<dyn DocumentParser>>) -> Self {
        Self { text, remote }
    }

    pub fn from_config(config: &ParserConfig) -> Result<Self, ApiError> {
        let remote: Option<Arc<dyn DocumentParser>> = match &config.api_key {
            Some(_) => Some(Arc::new(LlamaParseClient::from_config(config)?)),
            None => {
                tracing::warn!("No LLAMA_CLOUD_API_KEY configured; only text files can be indexed");
                None
            }
        };
        Ok(Self::new(Arc::new(PlainTextParser), remote))
    }
}

#[async_trait]
impl DocumentParser for RoutingParser {
    async fn parse(&self, path: &Path) -> Result<Vec<ParsedDocument>, ApiError> {
        let ext = extension(path);
        if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            return self.text.parse(path).await;
        }
        match &self.remote {
            Some(remote) => remote.parse(path).await,
            None => Err(ApiError::BadRequest(format!(
                "Cannot parse {}: no document parser api key configured",
                file_name(path)
            ))),
        }
    }
}
