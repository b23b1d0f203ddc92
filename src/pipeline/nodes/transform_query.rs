use async_trait::async_trait;

use crate::llm::{ChatMessage, ChatRequest};
use crate::pipeline::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::pipeline::state::QueryState;
use crate::prompts::{render, TRANSFORM_QUERY_TEMPLATE};

/// Rewrites the question into a form better suited to semantic search
/// before the web search fallback runs.
pub struct TransformQueryNode;

#[async_trait]
impl Node for TransformQueryNode {
    fn id(&self) -> &str {
        "transform_query"
    }

    async fn execute(
        &self,
        state: &mut QueryState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let prompt = render(TRANSFORM_QUERY_TEMPLATE, &[("question", &state.question)]);
        let request = ChatRequest::new(vec![ChatMessage::user(prompt)])
            .with_temperature(ctx.services.temperature);

        match ctx
            .services
            .llm
            .chat(request, &ctx.services.utility_model)
            .await
        {
            Ok(rewritten) => {
                let rewritten = rewritten.trim();
                if !rewritten.is_empty() {
                    tracing::debug!(session_id = %state.session_id, %rewritten, "transformed query");
                    state.question = rewritten.to_string();
                }
            }
            Err(err) => {
                tracing::warn!(
                    session_id = %state.session_id,
                    error = %err,
                    "query transform failed, keeping current question"
                );
            }
        }

        Ok(NodeOutput::Next)
    }
}
