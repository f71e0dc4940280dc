// Review Node
// Accepts the draft or sends a new round of questions back to the answer step

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::prompts::{is_approval, parse_questions, review_prompt};
use crate::graph::state::ResearchState;

/// Branch taken when the reviewer asks for more facts.
pub const MORE_QUESTIONS: &str = "more_questions";

pub struct ReviewNode;

impl ReviewNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReviewNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for ReviewNode {
    fn id(&self) -> &'static str {
        "review_report"
    }

    fn name(&self) -> &'static str {
        "Report Reviewer"
    }

    async fn execute(
        &self,
        state: &mut ResearchState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let Some(draft) = state.draft.clone() else {
            return Ok(NodeOutput::Error("No report to review".to_string()));
        };

        state.num_reviews += 1;

        let prompt = review_prompt(
            &state.original_query,
            &draft.report,
            ctx.settings.max_review_questions,
        );
        let reply = ctx
            .llm
            .complete(&prompt)
            .await
            .map_err(|err| GraphError::from_api(self.id(), err))?;

        let questions = parse_questions(&reply, ctx.settings.max_review_questions);
        let limit_reached = state.num_reviews >= ctx.settings.max_reviews;

        if is_approval(&reply) || limit_reached || questions.is_empty() {
            ctx.progress.emit("Blog post is fine");
            state.output = Some(draft.report);
            return Ok(NodeOutput::Final);
        }

        ctx.progress.emit("Formulated some more questions");
        state.dispatch_questions(questions);
        Ok(NodeOutput::Branch(MORE_QUESTIONS.to_string()))
    }
}
