// Agent Module
// Tool-using question answering and the document research agent

pub mod function_calling;
pub mod research;
pub mod tools;

pub use function_calling::FunctionCallingAgent;
pub use research::DocumentResearchAgent;
pub use tools::{QueryEngineTool, Tool, DOCUMENT_TOOL_NAME};
