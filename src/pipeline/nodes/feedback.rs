use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

use crate::llm::{ChatMessage, ChatRequest};
use crate::pipeline::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::pipeline::state::QueryState;
use crate::prompts::{render, FEEDBACK_TEMPLATE};

fn score_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)score\s*[:\-]?\s*([1-5])").unwrap())
}

/// Pulls the 1-5 score out of the critique. Anything unparsable counts
/// as 0 so a malformed critique always triggers a refinement pass.
pub fn parse_score(critique: &str) -> u8 {
    score_pattern()
        .captures(critique)
        .and_then(|captures| captures.get(1))
        .and_then(|digit| digit.as_str().parse().ok())
        .unwrap_or(0)
}

/// Scores the buffered answer against the question and decides whether
/// a refinement pass is needed.
pub struct FeedbackNode;

#[async_trait]
impl Node for FeedbackNode {
    fn id(&self) -> &str {
        "feedback"
    }

    async fn execute(
        &self,
        state: &mut QueryState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let answer = state
            .generation
            .as_deref()
            .ok_or_else(|| GraphError::new(self.id(), "no generation to score"))?;

        let prompt = render(
            FEEDBACK_TEMPLATE,
            &[("question", state.question.as_str()), ("answer", answer)],
        );
        let request = ChatRequest::new(vec![ChatMessage::user(prompt)])
            .with_temperature(ctx.services.temperature);

        let critique = ctx
            .services
            .llm
            .chat(request, &ctx.services.utility_model)
            .await
            .map_err(|err| GraphError::new(self.id(), err.to_string()))?;

        let score = parse_score(&critique);
        tracing::info!(session_id = %state.session_id, score, "scored answer");

        state.feedback = Some(critique);
        state.feedback_score = Some(score);

        if score < ctx.services.feedback_threshold {
            Ok(NodeOutput::Branch("regenerate".into()))
        } else {
            Ok(NodeOutput::Final)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labelled_score() {
        assert_eq!(parse_score("Score: 4\nThe answer covers the question."), 4);
        assert_eq!(parse_score("score - 2, missing the SDK version"), 2);
        assert_eq!(parse_score("SCORE 5"), 5);
    }

    #[test]
    fn unparsable_critique_scores_zero() {
        assert_eq!(parse_score("the answer seems fine to me"), 0);
        assert_eq!(parse_score(""), 0);
        assert_eq!(parse_score("Score: 9"), 0);
    }
}
