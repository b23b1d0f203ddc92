use async_trait::async_trait;

use crate::pipeline::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::pipeline::state::QueryState;

/// Fetches candidate documents for the standalone question.
pub struct RetrieveNode;

#[async_trait]
impl Node for RetrieveNode {
    fn id(&self) -> &str {
        "retrieve"
    }

    async fn execute(
        &self,
        state: &mut QueryState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        state.documents = ctx
            .services
            .retriever
            .retrieve(&state.question)
            .await
            .map_err(|err| GraphError::new(self.id(), err.to_string()))?;

        tracing::info!(
            session_id = %state.session_id,
            count = state.documents.len(),
            "retrieved documents"
        );
        Ok(NodeOutput::Next)
    }
}
