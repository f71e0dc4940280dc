use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::llm::ToolDefinition;
use crate::rag::QueryEngine;

pub const DOCUMENT_TOOL_NAME: &str = "document_retrieval_tool";

/// A function the agent can offer to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn call(&self, arguments: Value) -> Result<String, ApiError>;
}

/// Exposes a `QueryEngine` as a single-string-argument tool.
pub struct QueryEngineTool {
    engine: Arc<QueryEngine>,
    name: String,
    description: String,
}

impl QueryEngineTool {
    pub fn new(
        engine: Arc<QueryEngine>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            name: name.into(),
            description: description.into(),
        }
    }

    /// The document tool described by the names of the files behind it.
    pub fn for_documents(engine: Arc<QueryEngine>, file_names: &[String]) -> Self {
        let description = format!(
            "A RAG engine with extremely detailed information about the {:?}",
            file_names
        );
        Self::new(engine, DOCUMENT_TOOL_NAME, description)
    }
}

#[async_trait]
impl Tool for QueryEngineTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "input": {
                        "type": "string",
                        "description": "A natural language question to look up in the documents"
                    }
                },
                "required": ["input"]
            }),
        }
    }

    async fn call(&self, arguments: Value) -> Result<String, ApiError> {
        let input = arguments
            .get("input")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("missing string argument 'input'".to_string()))?;
        self.engine.query(input).await
    }
}
