//! Web search fallback.
//!
//! Used only when relevance grading empties the retrieved set: the
//! reformulated question goes out to a web search API and the results come
//! back as one extra document appended to the evidence set.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::docs::Document;

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// All results collapsed into a single document, or `None` when the
    /// search produced nothing usable.
    async fn search(&self, query: &str) -> Result<Option<Document>, ApiError>;
}

/// Tavily REST client.
pub struct TavilySearch {
    api_key: String,
    client: Client,
}

impl TavilySearch {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl WebSearch for TavilySearch {
    async fn search(&self, query: &str) -> Result<Option<Document>, ApiError> {
        let body = json!({
            "api_key": self.api_key,
            "query": query,
            "max_results": 5,
        });

        let res = self
            .client
            .post("https://api.tavily.com/search")
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "web search failed: {}",
                res.status()
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        Ok(collect_results(&payload))
    }
}

fn collect_results(payload: &Value) -> Option<Document> {
    let results = payload.get("results")?.as_array()?;

    let combined: Vec<String> = results
        .iter()
        .filter_map(|item| item.get("content").and_then(|v| v.as_str()))
        .filter(|content| !content.is_empty())
        .map(str::to_string)
        .collect();

    if combined.is_empty() {
        return None;
    }

    Some(Document::new(combined.join("\n\n"), "web-search"))
}

/// `WebSearch` that always comes back empty; wired when no API key is
/// configured so the pipeline degrades instead of failing.
pub struct DisabledWebSearch;

#[async_trait]
impl WebSearch for DisabledWebSearch {
    async fn search(&self, _query: &str) -> Result<Option<Document>, ApiError> {
        tracing::debug!("web search requested but no provider is configured");
        Ok(None)
    }
}
