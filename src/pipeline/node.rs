use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::core::errors::ApiError;

use super::state::QueryState;
use super::PipelineServices;

/// What a node tells the runtime to do after it ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutput {
    /// Follow the unconditional outgoing edge.
    Next,
    /// Follow the outgoing edge labelled with this branch key.
    Branch(String),
    /// The run is complete.
    Final,
}

/// Error raised inside a node, tagged with the node that failed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("node '{node}' failed: {message}")]
pub struct GraphError {
    pub node: String,
    pub message: String,
}

impl GraphError {
    pub fn new(node: &str, message: impl Into<String>) -> Self {
        Self {
            node: node.to_string(),
            message: message.into(),
        }
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// Handles a node may use while executing.
///
/// `ready` is the response gate: a node that starts streaming to the
/// client must take it and resolve it with `Ok(())` before sending the
/// first chunk. If it is still present when the run finishes, the
/// orchestrator resolves it.
pub struct NodeContext<'a> {
    pub services: &'a PipelineServices,
    pub chunks: &'a mpsc::Sender<Result<String, ApiError>>,
    pub ready: &'a mut Option<oneshot::Sender<Result<(), ApiError>>>,
}

impl NodeContext<'_> {
    /// Opens the response gate if no node has done so yet.
    pub fn signal_ready(&mut self) {
        if let Some(gate) = self.ready.take() {
            let _ = gate.send(Ok(()));
        }
    }
}

#[async_trait]
pub trait Node: Send + Sync {
    /// Stable identifier used for edges and logging.
    fn id(&self) -> &str;

    async fn execute(
        &self,
        state: &mut QueryState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError>;
}
