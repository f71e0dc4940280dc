// Graph Builder
// Wires the research steps into a petgraph runtime

use super::node::GraphError;
use super::nodes::{
    AnswerNode, PlanNode, QuestionsNode, ReportNode, ReviewNode, MORE_QUESTIONS,
};
use super::runtime::{GraphBuilder, GraphRuntime};
use crate::core::config::WorkflowConfig;

/// Node visits for `max_reviews` review rounds: plan and questions once,
/// then answer, report and review per round, plus one spare.
pub fn step_budget(max_reviews: u32) -> usize {
    2 + 3 * (max_reviews.max(1) as usize) + 1
}

/// plan -> questions -> answer -> report -> review, with review looping
/// back to answer while it still has questions.
pub fn build_research_graph(settings: &WorkflowConfig) -> Result<GraphRuntime, GraphError> {
    GraphBuilder::new()
        .entry("formulate_plan")
        .max_steps(step_budget(settings.max_reviews))
        .node(Box::new(PlanNode::new()))
        .node(Box::new(QuestionsNode::new()))
        .node(Box::new(AnswerNode::new()))
        .node(Box::new(ReportNode::new()))
        .node(Box::new(ReviewNode::new()))
        .edge("formulate_plan", "formulate_questions")
        .edge("formulate_questions", "answer_question")
        .edge("answer_question", "write_report")
        .edge("write_report", "review_report")
        .conditional_edge("review_report", "answer_question", MORE_QUESTIONS)
        .build()
}
