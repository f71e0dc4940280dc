// Graph Nodes Module
// One node per research step

pub mod answer;
pub mod plan;
pub mod questions;
pub mod report;
pub mod review;

pub use answer::AnswerNode;
pub use plan::PlanNode;
pub use questions::QuestionsNode;
pub use report::ReportNode;
pub use review::{ReviewNode, MORE_QUESTIONS};
