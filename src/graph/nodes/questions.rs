// Questions Node
// Turns the outline into simple research questions and fans them out

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::prompts::{parse_questions, questions_prompt};
use crate::graph::state::ResearchState;

pub struct QuestionsNode;

impl QuestionsNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for QuestionsNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for QuestionsNode {
    fn id(&self) -> &'static str {
        "formulate_questions"
    }

    fn name(&self) -> &'static str {
        "Question Formulator"
    }

    async fn execute(
        &self,
        state: &mut ResearchState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let max_questions = ctx.settings.max_questions;
        let prompt = questions_prompt(state.outline_text(), max_questions);
        let reply = ctx
            .llm
            .complete(&prompt)
            .await
            .map_err(|err| GraphError::from_api(self.id(), err))?;

        let questions = parse_questions(&reply, max_questions);
        if questions.is_empty() {
            return Ok(NodeOutput::Error(
                "The model returned no research questions".to_string(),
            ));
        }

        let listed = questions.join("\n");
        ctx.progress
            .emit(format!("Formulated questions:\n{}", listed));
        ctx.progress.emit(format!("Questions:\n{}", listed));
        state.dispatch_questions(questions);

        Ok(NodeOutput::Continue(None))
    }
}
