use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{ScoredPoint, VectorSearch};
use crate::core::config::RetrievalConfig;
use crate::core::errors::ApiError;
use crate::docs::Document;

/// Qdrant REST search client. Points are expected to carry `content` and
/// `source` in their payload, plus an optional `large_embedding` for the
/// tiered re-rank pass.
pub struct QdrantSearch {
    base_url: String,
    collection: String,
    client: Client,
}

impl QdrantSearch {
    pub fn new(config: &RetrievalConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: config.qdrant_url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
            client,
        })
    }

    fn parse_point(point: &Value) -> Option<ScoredPoint> {
        let payload = point.get("payload")?;
        let content = payload.get("content").and_then(|v| v.as_str())?;
        let source = payload
            .get("source")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        let large_embedding = payload
            .get("large_embedding")
            .and_then(|v| v.as_array())
            .map(|vals| {
                vals.iter()
                    .filter_map(|v| v.as_f64().map(|f| f as f32))
                    .collect::<Vec<f32>>()
            });

        Some(ScoredPoint {
            document: Document::new(content, source),
            score: point.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32,
            large_embedding,
        })
    }
}

#[async_trait]
impl VectorSearch for QdrantSearch {
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>, ApiError> {
        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection
        );

        let body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "vector search failed: {}",
                res.status()
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        let points = payload
            .get("result")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(points.iter().filter_map(Self::parse_point).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_point_reads_payload_fields() {
        let point = json!({
            "score": 0.87,
            "payload": {
                "content": "Any team member can delete an idea",
                "source": "kb/6787f93132944add80a8e1b1c662abdc",
                "large_embedding": [0.1, 0.2],
            }
        });

        let parsed = QdrantSearch::parse_point(&point).unwrap();
        assert_eq!(parsed.document.content, "Any team member can delete an idea");
        assert!((parsed.score - 0.87).abs() < 1e-6);
        assert_eq!(parsed.large_embedding.as_deref(), Some(&[0.1f32, 0.2][..]));
    }

    #[test]
    fn parse_point_without_content_is_dropped() {
        let point = json!({"score": 0.5, "payload": {"source": "x"}});
        assert!(QdrantSearch::parse_point(&point).is_none());
    }
}
