// Plan Node
// Drafts a blog post outline for the topic, knowing nothing about it yet

use async_trait::async_trait;

use crate::graph::events::OutlineEvent;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::prompts::outline_prompt;
use crate::graph::state::ResearchState;

pub struct PlanNode;

impl PlanNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PlanNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for PlanNode {
    fn id(&self) -> &'static str {
        "formulate_plan"
    }

    fn name(&self) -> &'static str {
        "Outline Planner"
    }

    async fn execute(
        &self,
        state: &mut ResearchState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let outline = ctx
            .llm
            .complete(&outline_prompt(&state.original_query))
            .await
            .map_err(|err| GraphError::from_api(self.id(), err))?;

        ctx.progress.emit(format!("Outline:\n{}", outline));
        state.outline = Some(OutlineEvent { outline });

        Ok(NodeOutput::Continue(None))
    }
}
