// Node trait and types
// Base abstraction for research graph steps

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::tools::Tool;
use crate::core::config::WorkflowConfig;
use crate::core::errors::ApiError;
use crate::llm::LlmService;

use super::events::ProgressSink;
use super::state::ResearchState;

/// Context passed to nodes during execution
pub struct NodeContext<'a> {
    pub llm: &'a LlmService,
    /// Tools offered to the per-question agent
    pub tools: &'a [Arc<dyn Tool>],
    pub settings: &'a WorkflowConfig,
    pub progress: &'a ProgressSink,
}

/// Output from a node execution
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutput {
    /// Continue to the specified next node (None = use default edge)
    Continue(Option<String>),
    /// Branch along the edge registered for this condition
    Branch(String),
    /// Graph execution complete
    Final,
    /// Error occurred
    Error(String),
}

/// Graph execution error
///
/// `execution_trace` lists the node IDs visited before the failure, most
/// recent last.
#[derive(Debug, Clone)]
pub struct GraphError {
    pub node_id: String,
    pub message: String,
    pub execution_trace: Vec<String>,
    /// Set when the failure came from a timed-out upstream call.
    pub timed_out: bool,
}

impl GraphError {
    pub fn new(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            message: message.into(),
            execution_trace: Vec::new(),
            timed_out: false,
        }
    }

    /// Wrap an `ApiError` raised inside a node.
    pub fn from_api(node_id: impl Into<String>, err: ApiError) -> Self {
        let timed_out = matches!(err, ApiError::Timeout(_));
        Self {
            timed_out,
            ..Self::new(node_id, err.to_string())
        }
    }

    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.execution_trace = trace;
        self
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        let message = err.to_string();
        if err.timed_out {
            ApiError::Timeout(message)
        } else {
            ApiError::Internal(message)
        }
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.execution_trace.is_empty() {
            write!(f, "GraphError in {}: {}", self.node_id, self.message)
        } else {
            write!(
                f,
                "GraphError in {} (trace: {}): {}",
                self.node_id,
                self.execution_trace.join(" -> "),
                self.message
            )
        }
    }
}

impl std::error::Error for GraphError {}

/// Node trait - all graph nodes implement this
#[async_trait]
pub trait Node: Send + Sync {
    /// Unique identifier for this node
    fn id(&self) -> &'static str;

    /// Human-readable name for display
    fn name(&self) -> &'static str {
        self.id()
    }

    async fn execute(
        &self,
        state: &mut ResearchState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError>;
}
