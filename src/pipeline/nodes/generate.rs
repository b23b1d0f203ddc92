use async_trait::async_trait;

use crate::pipeline::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::pipeline::state::QueryState;
use crate::pipeline::{generator, summarizer};

/// Produces the first answer. The output is buffered in state rather
/// than streamed so the feedback stage can veto it.
pub struct GenerateNode;

#[async_trait]
impl Node for GenerateNode {
    fn id(&self) -> &str {
        "generate"
    }

    async fn execute(
        &self,
        state: &mut QueryState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let context = generator::build_context(ctx.services, &state.documents).await;
        let summary =
            summarizer::summarize(ctx.services, state.role, &context, &state.question).await;

        let messages = generator::compose_messages(
            ctx.services,
            &summary,
            &context,
            &state.chat_history,
            &state.question,
        );

        let generation = generator::generate_buffered(ctx.services, messages)
            .await
            .map_err(|err| GraphError::new(self.id(), err.to_string()))?;

        state.context = Some(context);
        state.summary = Some(summary);
        state.generation = Some(generation);
        Ok(NodeOutput::Next)
    }
}
