//! Retrieval strategies.
//!
//! Both strategies satisfy the same `Retriever` contract so downstream
//! stages never know which one is wired in. An empty result set is a valid
//! outcome, not an error; the orchestrator decides what to do with it.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;

use super::VectorSearch;
use crate::core::config::RetrievalConfig;
use crate::core::errors::ApiError;
use crate::docs::Document;
use crate::llm::LlmProvider;

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Ranked documents for a query, bounded by the configured top-K.
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, ApiError>;
}

/// One embedding, one nearest-neighbor lookup.
pub struct SingleStageRetriever {
    llm: Arc<dyn LlmProvider>,
    store: Arc<dyn VectorSearch>,
    model: String,
    dimensions: u32,
    top_k: usize,
}

impl SingleStageRetriever {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn VectorSearch>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            llm,
            store,
            model: config.embedding_model.clone(),
            dimensions: config.embedding_dimensions,
            top_k: config.top_k,
        }
    }
}

#[async_trait]
impl Retriever for SingleStageRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, ApiError> {
        let embeddings = self
            .llm
            .embed(&[query.to_string()], &self.model, Some(self.dimensions))
            .await?;
        let query_embedding = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Upstream("embedding service returned no vector".to_string()))?;

        let points = self.store.search(&query_embedding, self.top_k).await?;
        Ok(points.into_iter().map(|p| p.document).collect())
    }
}

/// Two-stage search: a cheap low-dimensional embedding shortlists a larger
/// candidate set, then a fine embedding re-scores the shortlist and keeps the
/// final top-K. Index storage stays small while precision comes from the
/// re-rank pass.
pub struct TieredRetriever {
    llm: Arc<dyn LlmProvider>,
    store: Arc<dyn VectorSearch>,
    small_model: String,
    small_dimensions: u32,
    large_model: String,
    large_dimensions: u32,
    top_k: usize,
    candidate_multiplier: usize,
}

impl TieredRetriever {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn VectorSearch>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            llm,
            store,
            small_model: config.small_embedding_model.clone(),
            small_dimensions: config.small_embedding_dimensions,
            large_model: config.large_embedding_model.clone(),
            large_dimensions: config.large_embedding_dimensions,
            top_k: config.top_k,
            candidate_multiplier: config.candidate_multiplier,
        }
    }
}

#[async_trait]
impl Retriever for TieredRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, ApiError> {
        let small = self
            .llm
            .embed(
                &[query.to_string()],
                &self.small_model,
                Some(self.small_dimensions),
            )
            .await?;
        let small_embedding = small
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Upstream("embedding service returned no vector".to_string()))?;

        let shortlist_size = self.top_k.saturating_mul(self.candidate_multiplier).max(1);
        let candidates = self.store.search(&small_embedding, shortlist_size).await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let large = self
            .llm
            .embed(
                &[query.to_string()],
                &self.large_model,
                Some(self.large_dimensions),
            )
            .await?;
        let large_embedding = large
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Upstream("embedding service returned no vector".to_string()))?;

        // Re-score against the stored fine embeddings; points without one
        // keep their coarse score so they sort behind re-ranked hits only
        // when genuinely less similar.
        let mut rescored: Vec<(f32, Document)> = candidates
            .into_iter()
            .map(|point| {
                let score = match &point.large_embedding {
                    Some(embedding) => cosine_similarity(&large_embedding, embedding),
                    None => point.score,
                };
                (score, point.document)
            })
            .collect();

        rescored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        rescored.truncate(self.top_k);

        Ok(rescored.into_iter().map(|(_, doc)| doc).collect())
    }
}

fn cosine_similarity(query: &[f32], candidate: &[f32]) -> f32 {
    if query.is_empty() || query.len() != candidate.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut query_norm = 0.0f32;
    let mut candidate_norm = 0.0f32;
    for (a, b) in query.iter().zip(candidate) {
        dot += a * b;
        query_norm += a * a;
        candidate_norm += b * b;
    }

    let denom = query_norm.sqrt() * candidate_norm.sqrt();
    if denom <= f32::EPSILON {
        return 0.0;
    }
    dot / denom
}
