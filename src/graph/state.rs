// Research state
// Shared data threaded through every node of one run

use super::events::{AnswerEvent, OutlineEvent, QuestionEvent, ReviewEvent};

#[derive(Debug, Clone, Default)]
pub struct ResearchState {
    /// The topic the user asked for.
    pub original_query: String,
    pub outline: Option<OutlineEvent>,
    /// Questions fanned out to the answer step in the current round.
    pub pending_questions: Vec<QuestionEvent>,
    /// Answers the report step waits for in the current round.
    pub num_questions: usize,
    pub round_answers: Vec<AnswerEvent>,
    /// Every answer from every round, in arrival order.
    pub previous_answers: Vec<AnswerEvent>,
    pub draft: Option<ReviewEvent>,
    pub num_reviews: u32,
    /// Final report, set when the review accepts the draft.
    pub output: Option<String>,
}

impl ResearchState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            original_query: query.into(),
            ..Default::default()
        }
    }

    /// Start a new fan-out round with these questions.
    pub fn dispatch_questions(&mut self, questions: Vec<String>) {
        self.num_questions = questions.len();
        self.round_answers.clear();
        self.pending_questions = questions
            .into_iter()
            .map(|question| QuestionEvent { question })
            .collect();
    }

    pub fn outline_text(&self) -> &str {
        self.outline
            .as_ref()
            .map(|o| o.outline.as_str())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_resets_round() {
        let mut state = ResearchState::new("topic");
        state.round_answers.push(AnswerEvent {
            question: "old".to_string(),
            answer: "old".to_string(),
        });

        state.dispatch_questions(vec!["a?".to_string(), "b?".to_string()]);

        assert_eq!(state.num_questions, 2);
        assert!(state.round_answers.is_empty());
        assert_eq!(state.pending_questions[1].question, "b?");
        assert_eq!(state.outline_text(), "");
    }
}
