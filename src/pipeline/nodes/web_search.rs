use async_trait::async_trait;

use crate::pipeline::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::pipeline::state::QueryState;

/// Appends a web search result to the evidence set. Search failures
/// degrade to an empty result so the answer stage can still respond
/// with its not-found policy.
pub struct WebSearchNode;

#[async_trait]
impl Node for WebSearchNode {
    fn id(&self) -> &str {
        "web_search"
    }

    async fn execute(
        &self,
        state: &mut QueryState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        match ctx.services.web_search.search(&state.question).await {
            Ok(Some(document)) => {
                tracing::info!(session_id = %state.session_id, "web search added a document");
                state.documents.push(document);
            }
            Ok(None) => {
                tracing::info!(session_id = %state.session_id, "web search returned nothing");
            }
            Err(err) => {
                tracing::warn!(
                    session_id = %state.session_id,
                    error = %err,
                    "web search failed, continuing without it"
                );
            }
        }

        Ok(NodeOutput::Next)
    }
}
