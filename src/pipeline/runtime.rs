// petgraph based state machine runtime for the query pipeline.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

use super::node::{GraphError, Node, NodeContext, NodeOutput};
use super::state::QueryState;

/// Edge label controlling routing out of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeCondition {
    /// Default edge, taken on `NodeOutput::Next`.
    Always,
    /// Taken when the node branches with this key.
    OnBranch(String),
}

impl EdgeCondition {
    pub fn on(branch: impl Into<String>) -> Self {
        Self::OnBranch(branch.into())
    }
}

pub struct GraphRuntime {
    graph: DiGraph<Box<dyn Node>, EdgeCondition>,
    node_indices: HashMap<String, NodeIndex>,
    entry_node_id: String,
    max_steps: usize,
}

impl GraphRuntime {
    fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
            entry_node_id: String::new(),
            max_steps: 16,
        }
    }

    fn add_node(&mut self, node: Box<dyn Node>) {
        let id = node.id().to_string();
        let index = self.graph.add_node(node);
        self.node_indices.insert(id, index);
    }

    fn add_edge(&mut self, from: &str, to: &str, condition: EdgeCondition) -> Result<(), GraphError> {
        let from_idx = self
            .node_indices
            .get(from)
            .ok_or_else(|| GraphError::new(from, format!("source node not found: {}", from)))?;
        let to_idx = self
            .node_indices
            .get(to)
            .ok_or_else(|| GraphError::new(to, format!("target node not found: {}", to)))?;

        self.graph.add_edge(*from_idx, *to_idx, condition);
        Ok(())
    }

    /// Run the machine from the entry node until a node returns `Final`.
    pub async fn run(
        &self,
        state: &mut QueryState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<(), GraphError> {
        let mut current_idx = *self.node_indices.get(&self.entry_node_id).ok_or_else(|| {
            GraphError::new(
                "runtime",
                format!("entry node not found: {}", self.entry_node_id),
            )
        })?;

        let mut step = 0;

        loop {
            if step >= self.max_steps {
                return Err(GraphError::new(
                    "runtime",
                    format!("maximum steps ({}) exceeded", self.max_steps),
                ));
            }

            let node = self
                .graph
                .node_weight(current_idx)
                .ok_or_else(|| GraphError::new("runtime", "node not found in graph"))?;

            let node_id = node.id();
            tracing::debug!(session_id = %state.session_id, node = node_id, step, "executing node");

            match node.execute(state, ctx).await? {
                NodeOutput::Final => {
                    tracing::debug!(session_id = %state.session_id, node = node_id, "run complete");
                    return Ok(());
                }
                NodeOutput::Next => {
                    current_idx = self.resolve_next(current_idx, None)?;
                }
                NodeOutput::Branch(branch) => {
                    current_idx = self.resolve_next(current_idx, Some(&branch))?;
                }
            }

            step += 1;
        }
    }

    fn resolve_next(
        &self,
        current_idx: NodeIndex,
        branch: Option<&str>,
    ) -> Result<NodeIndex, GraphError> {
        let current_id = self
            .graph
            .node_weight(current_idx)
            .map(|n| n.id())
            .unwrap_or("unknown");

        let edges: Vec<(NodeIndex, &EdgeCondition)> = self
            .graph
            .edges_directed(current_idx, Direction::Outgoing)
            .map(|edge| (edge.target(), edge.weight()))
            .collect();

        if let Some(key) = branch {
            for (target, condition) in &edges {
                if matches!(condition, EdgeCondition::OnBranch(expected) if expected == key) {
                    return Ok(*target);
                }
            }
            return Err(GraphError::new(
                current_id,
                format!("no edge for branch '{}'", key),
            ));
        }

        edges
            .iter()
            .find(|(_, condition)| **condition == EdgeCondition::Always)
            .map(|(target, _)| *target)
            .ok_or_else(|| {
                GraphError::new(current_id, format!("no default edge from '{}'", current_id))
            })
    }
}

/// Fluent builder; edges are resolved against node ids at build time.
pub struct GraphBuilder {
    runtime: GraphRuntime,
    pending_edges: Vec<(String, String, EdgeCondition)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            runtime: GraphRuntime::new(),
            pending_edges: Vec::new(),
        }
    }

    pub fn entry(mut self, node_id: impl Into<String>) -> Self {
        self.runtime.entry_node_id = node_id.into();
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.runtime.max_steps = max_steps;
        self
    }

    pub fn node(mut self, node: Box<dyn Node>) -> Self {
        self.runtime.add_node(node);
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.pending_edges
            .push((from.into(), to.into(), EdgeCondition::Always));
        self
    }

    pub fn conditional_edge(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        self.pending_edges
            .push((from.into(), to.into(), EdgeCondition::on(branch)));
        self
    }

    pub fn build(mut self) -> Result<GraphRuntime, GraphError> {
        if self.runtime.entry_node_id.is_empty() {
            return Err(GraphError::new("runtime", "no entry node set"));
        }
        for (from, to, condition) in self.pending_edges {
            self.runtime.add_edge(&from, &to, condition)?;
        }
        Ok(self.runtime)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineServices;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct RecordingNode {
        id: String,
        output: NodeOutput,
    }

    #[async_trait]
    impl Node for RecordingNode {
        fn id(&self) -> &str {
            &self.id
        }

        async fn execute(
            &self,
            state: &mut QueryState,
            _ctx: &mut NodeContext<'_>,
        ) -> Result<NodeOutput, GraphError> {
            state.question.push_str(&format!("|{}", self.id));
            Ok(self.output.clone())
        }
    }

    fn node(id: &str, output: NodeOutput) -> Box<dyn Node> {
        Box::new(RecordingNode {
            id: id.to_string(),
            output,
        })
    }

    fn test_services() -> PipelineServices {
        use crate::docs::images::NoopImageSource;
        use crate::llm::{ChatRequest, LlmProvider};
        use crate::core::errors::ApiError;
        use crate::docs::Document;
        use crate::prompts::PromptSet;
        use crate::retrieval::Retriever;
        use crate::search::DisabledWebSearch;

        struct NoLlm;

        #[async_trait]
        impl LlmProvider for NoLlm {
            fn name(&self) -> &str {
                "none"
            }

            async fn chat(&self, _request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
                Err(ApiError::internal("no llm in test"))
            }

            async fn stream_chat(
                &self,
                _request: ChatRequest,
                _model_id: &str,
            ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError> {
                Err(ApiError::internal("no llm in test"))
            }

            async fn embed(
                &self,
                _inputs: &[String],
                _model_id: &str,
                _dimensions: Option<u32>,
            ) -> Result<Vec<Vec<f32>>, ApiError> {
                Err(ApiError::internal("no llm in test"))
            }
        }

        struct NoRetriever;

        #[async_trait]
        impl Retriever for NoRetriever {
            async fn retrieve(&self, _query: &str) -> Result<Vec<Document>, ApiError> {
                Ok(Vec::new())
            }
        }

        PipelineServices {
            llm: Arc::new(NoLlm),
            retriever: Arc::new(NoRetriever),
            web_search: Arc::new(DisabledWebSearch),
            images: Arc::new(NoopImageSource),
            prompts: PromptSet::new(None),
            chat_model: "chat".into(),
            utility_model: "utility".into(),
            temperature: 0.0,
            feedback_threshold: 4,
        }
    }

    fn empty_state() -> QueryState {
        QueryState::new(
            "1-s".into(),
            crate::session::UserRole::Internal,
            String::new(),
            String::new(),
            Vec::new(),
        )
    }

    async fn run_graph(runtime: &GraphRuntime, state: &mut QueryState) -> Result<(), GraphError> {
        let services = test_services();
        let (chunks, _rx) = mpsc::channel(4);
        let mut ready = None;
        let mut ctx = NodeContext {
            services: &services,
            chunks: &chunks,
            ready: &mut ready,
        };
        runtime.run(state, &mut ctx).await
    }

    #[tokio::test]
    async fn follows_default_edges_to_completion() {
        let runtime = GraphBuilder::new()
            .entry("a")
            .node(node("a", NodeOutput::Next))
            .node(node("b", NodeOutput::Final))
            .edge("a", "b")
            .build()
            .unwrap();

        let mut state = empty_state();
        run_graph(&runtime, &mut state).await.unwrap();
        assert_eq!(state.question, "|a|b");
    }

    #[tokio::test]
    async fn branch_selects_labelled_edge() {
        let runtime = GraphBuilder::new()
            .entry("decide")
            .node(node("decide", NodeOutput::Branch("right".into())))
            .node(node("left", NodeOutput::Final))
            .node(node("right", NodeOutput::Final))
            .conditional_edge("decide", "left", "left")
            .conditional_edge("decide", "right", "right")
            .build()
            .unwrap();

        let mut state = empty_state();
        run_graph(&runtime, &mut state).await.unwrap();
        assert_eq!(state.question, "|decide|right");
    }

    #[tokio::test]
    async fn unknown_branch_is_an_error() {
        let runtime = GraphBuilder::new()
            .entry("decide")
            .node(node("decide", NodeOutput::Branch("nowhere".into())))
            .node(node("left", NodeOutput::Final))
            .conditional_edge("decide", "left", "left")
            .build()
            .unwrap();

        let mut state = empty_state();
        let err = run_graph(&runtime, &mut state).await.unwrap_err();
        assert!(err.message.contains("nowhere"));
    }

    #[tokio::test]
    async fn step_limit_stops_loops() {
        let runtime = GraphBuilder::new()
            .entry("a")
            .max_steps(5)
            .node(node("a", NodeOutput::Next))
            .node(node("b", NodeOutput::Next))
            .edge("a", "b")
            .edge("b", "a")
            .build()
            .unwrap();

        let mut state = empty_state();
        let err = run_graph(&runtime, &mut state).await.unwrap_err();
        assert!(err.message.contains("maximum steps"));
    }

    #[test]
    fn build_rejects_unknown_edge_endpoints() {
        let result = GraphBuilder::new()
            .entry("a")
            .node(node("a", NodeOutput::Final))
            .edge("a", "missing")
            .build();
        assert!(result.is_err());
    }
}
