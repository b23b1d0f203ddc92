//! Wiring for the self-refining query graph.
//!
//! retrieve -> grade_documents -> generate          (relevant docs found)
//!                             -> transform_query -> web_search -> generate
//! generate -> feedback -> done                     (score meets threshold)
//!                      -> regenerate -> done

use super::node::GraphError;
use super::nodes::{
    FeedbackNode, GenerateNode, GradeDocumentsNode, RegenerateNode, RetrieveNode,
    TransformQueryNode, WebSearchNode,
};
use super::runtime::{GraphBuilder, GraphRuntime};

pub fn build_query_graph(max_steps: usize) -> Result<GraphRuntime, GraphError> {
    GraphBuilder::new()
        .entry("retrieve")
        .max_steps(max_steps)
        .node(Box::new(RetrieveNode))
        .node(Box::new(GradeDocumentsNode))
        .node(Box::new(TransformQueryNode))
        .node(Box::new(WebSearchNode))
        .node(Box::new(GenerateNode))
        .node(Box::new(FeedbackNode))
        .node(Box::new(RegenerateNode))
        .edge("retrieve", "grade_documents")
        .conditional_edge("grade_documents", "generate", "generate")
        .conditional_edge("grade_documents", "transform_query", "transform_query")
        .edge("transform_query", "web_search")
        .edge("web_search", "generate")
        .edge("generate", "feedback")
        .conditional_edge("feedback", "regenerate", "regenerate")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_builds() {
        assert!(build_query_graph(16).is_ok());
    }
}
