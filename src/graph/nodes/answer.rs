// Answer Node
// Answers every pending question with a tool-using agent, concurrently

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};

use crate::agent::FunctionCallingAgent;
use crate::core::errors::ApiError;
use crate::graph::events::{AnswerEvent, QuestionEvent};
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::ResearchState;

pub struct AnswerNode;

impl AnswerNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AnswerNode {
    fn default() -> Self {
        Self::new()
    }
}

async fn answer_question(
    ctx: &NodeContext<'_>,
    event: QuestionEvent,
) -> Result<Option<AnswerEvent>, ApiError> {
    let question = event.question;
    if question.trim().is_empty() {
        ctx.progress.emit("Skipping empty question.");
        return Ok(None);
    }

    let agent = FunctionCallingAgent::new(
        ctx.llm.clone(),
        ctx.tools.to_vec(),
        ctx.settings.max_tool_calls,
    );
    let answer = agent.query(&question).await?;

    ctx.progress.emit(format!(
        "To question '{}' the agent answered: {}",
        question, answer
    ));

    Ok(Some(AnswerEvent { question, answer }))
}

#[async_trait]
impl Node for AnswerNode {
    fn id(&self) -> &'static str {
        "answer_question"
    }

    fn name(&self) -> &'static str {
        "Question Answerer"
    }

    async fn execute(
        &self,
        state: &mut ResearchState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let questions = std::mem::take(&mut state.pending_questions);
        let concurrency = ctx.settings.answer_concurrency.max(1);

        let results: Vec<Result<Option<AnswerEvent>, ApiError>> = stream::iter(questions)
            .map(|event| answer_question(ctx, event))
            .buffered(concurrency)
            .collect()
            .await;

        for result in results {
            match result.map_err(|err| GraphError::from_api(self.id(), err))? {
                Some(answer) => state.round_answers.push(answer),
                None => state.num_questions = state.num_questions.saturating_sub(1),
            }
        }

        Ok(NodeOutput::Continue(None))
    }
}
