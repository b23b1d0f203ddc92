use async_trait::async_trait;

use crate::llm::{ChatMessage, ChatRequest};
use crate::pipeline::generator;
use crate::pipeline::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::pipeline::state::QueryState;
use crate::prompts::{render, REGENERATE_TEMPLATE};

/// Rewrites a low-scoring answer using the critique. The refined answer
/// streams to the client as it is produced; the response gate opens just
/// before the first chunk.
pub struct RegenerateNode;

#[async_trait]
impl Node for RegenerateNode {
    fn id(&self) -> &str {
        "regenerate"
    }

    async fn execute(
        &self,
        state: &mut QueryState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let answer = state
            .generation
            .as_deref()
            .ok_or_else(|| GraphError::new(self.id(), "no generation to refine"))?;
        let feedback = state
            .feedback
            .as_deref()
            .ok_or_else(|| GraphError::new(self.id(), "no feedback to refine with"))?;
        let context = state.context.as_deref().unwrap_or_default();

        let prompt = render(
            REGENERATE_TEMPLATE,
            &[
                ("context", context),
                ("question", state.question.as_str()),
                ("answer", answer),
                ("feedback", feedback),
            ],
        );
        let request = ChatRequest::new(vec![ChatMessage::user(prompt)])
            .with_temperature(ctx.services.temperature);

        let provider_rx = ctx
            .services
            .llm
            .stream_chat(request, &ctx.services.chat_model)
            .await
            .map_err(|err| GraphError::new(self.id(), err.to_string()))?;

        ctx.signal_ready();

        let refined = generator::forward_stream(provider_rx, ctx.chunks)
            .await
            .map_err(|err| GraphError::new(self.id(), err.to_string()))?;

        state.regeneration = Some(refined);
        state.answer_streamed = true;
        Ok(NodeOutput::Final)
    }
}
