// Report Node
// Waits for the round's answers, then writes the blog post from all answers so far

use async_trait::async_trait;

use crate::graph::events::ReviewEvent;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::prompts::report_prompt;
use crate::graph::state::ResearchState;

pub struct ReportNode;

impl ReportNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReportNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for ReportNode {
    fn id(&self) -> &'static str {
        "write_report"
    }

    fn name(&self) -> &'static str {
        "Report Writer"
    }

    async fn execute(
        &self,
        state: &mut ResearchState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        if state.round_answers.len() != state.num_questions {
            return Ok(NodeOutput::Error(format!(
                "Expected {} answers, received {}",
                state.num_questions,
                state.round_answers.len()
            )));
        }

        let round = std::mem::take(&mut state.round_answers);
        state.previous_answers.extend(round);

        let prompt = report_prompt(state.outline_text(), &state.previous_answers);
        ctx.progress
            .emit(format!("Writing report with prompt:\n{}", prompt));

        let report = ctx
            .llm
            .complete(&prompt)
            .await
            .map_err(|err| GraphError::from_api(self.id(), err))?;

        state.draft = Some(ReviewEvent { report });
        Ok(NodeOutput::Continue(None))
    }
}
