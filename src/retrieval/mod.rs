pub mod qdrant;
pub mod retriever;

pub use qdrant::QdrantSearch;
pub use retriever::{Retriever, SingleStageRetriever, TieredRetriever};

use serde::{Deserialize, Serialize};

use crate::docs::Document;

/// One hit from the vector backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub document: Document,
    pub score: f32,
    /// Fine-grained embedding stored alongside the point; the tiered
    /// retriever re-ranks on it.
    pub large_embedding: Option<Vec<f32>>,
}

/// Nearest-neighbor search over the knowledge-base index. The index itself
/// is an opaque collaborator; only ranked lookup is exposed.
#[async_trait::async_trait]
pub trait VectorSearch: Send + Sync {
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>, crate::core::errors::ApiError>;
}
