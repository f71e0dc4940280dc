// Research Graph Module
// StateGraph of research steps over petgraph

pub mod builder;
pub mod events;
pub mod node;
pub mod nodes;
pub mod prompts;
pub mod runtime;
pub mod state;

pub use builder::build_research_graph;
pub use events::{AnswerEvent, OutlineEvent, ProgressEvent, ProgressSink, QuestionEvent, ReviewEvent};
pub use node::{GraphError, Node, NodeContext, NodeOutput};
pub use runtime::GraphRuntime;
pub use state::ResearchState;
