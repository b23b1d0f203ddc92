use async_trait::async_trait;

use crate::pipeline::grader::{grade_document, Verdict};
use crate::pipeline::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::pipeline::state::QueryState;

/// Filters the retrieved set down to documents the grader judges
/// relevant. A document whose grade call fails is dropped with a
/// warning rather than failing the query.
pub struct GradeDocumentsNode;

#[async_trait]
impl Node for GradeDocumentsNode {
    fn id(&self) -> &str {
        "grade_documents"
    }

    async fn execute(
        &self,
        state: &mut QueryState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let mut relevant = Vec::with_capacity(state.documents.len());

        for document in state.documents.drain(..) {
            match grade_document(ctx.services, &state.question, &document).await {
                Ok(Verdict::Relevant) => relevant.push(document),
                Ok(Verdict::NotRelevant) => {
                    tracing::debug!(
                        session_id = %state.session_id,
                        source = %document.source,
                        "dropped irrelevant document"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        session_id = %state.session_id,
                        source = %document.source,
                        error = %err,
                        "grading failed, dropping document"
                    );
                }
            }
        }

        state.documents = relevant;

        if state.documents.is_empty() {
            tracing::info!(session_id = %state.session_id, "no relevant documents, rewriting query");
            Ok(NodeOutput::Branch("transform_query".into()))
        } else {
            Ok(NodeOutput::Branch("generate".into()))
        }
    }
}
