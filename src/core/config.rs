//! Service configuration.
//!
//! Public settings live in an optional `config.yml` next to the binary (or
//! wherever `HOMASAGE_CONFIG_PATH` points); secrets only ever come from the
//! environment so they cannot end up in a checked-in file.

use std::env;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::core::errors::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    /// Straight rewrite -> retrieve -> summarize -> generate flow; the
    /// answer streams as it is produced.
    Linear,
    /// Graph variant with document grading, web-search fallback and the
    /// feedback-gated regeneration pass.
    #[default]
    Graph,
}

impl PipelineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineMode::Linear => "linear",
            PipelineMode::Graph => "graph",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalStrategy {
    #[default]
    Single,
    Tiered,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Hard cap on a whole request, streaming included.
    pub request_timeout_secs: u64,
    pub cors_allowed_origins: Vec<String>,
    pub log_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            request_timeout_secs: 60,
            cors_allowed_origins: Vec::new(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible API root, without the `/v1` suffix.
    pub base_url: String,
    #[serde(skip)]
    pub api_key: String,
    pub chat_model: String,
    /// Cheaper model used for question rewriting and grading.
    pub utility_model: String,
    pub temperature: f64,
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: String::new(),
            chat_model: "gpt-4o".to_string(),
            utility_model: "gpt-3.5-turbo-0125".to_string(),
            temperature: 0.0,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub qdrant_url: String,
    pub collection: String,
    pub strategy: RetrievalStrategy,
    pub top_k: usize,
    /// Single-stage embedding model and dimensions.
    pub embedding_model: String,
    pub embedding_dimensions: u32,
    /// Tiered-mode coarse pass: cheap low-dimensional shortlist.
    pub small_embedding_model: String,
    pub small_embedding_dimensions: u32,
    /// Tiered-mode fine pass re-ranks the shortlist with this model.
    pub large_embedding_model: String,
    pub large_embedding_dimensions: u32,
    /// Shortlist size = top_k * candidate_multiplier in tiered mode.
    pub candidate_multiplier: usize,
    pub request_timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            qdrant_url: "http://127.0.0.1:6333".to_string(),
            collection: "qa-chatbot".to_string(),
            strategy: RetrievalStrategy::Single,
            top_k: 5,
            embedding_model: "text-embedding-3-large".to_string(),
            embedding_dimensions: 3072,
            small_embedding_model: "text-embedding-3-small".to_string(),
            small_embedding_dimensions: 512,
            large_embedding_model: "text-embedding-3-large".to_string(),
            large_embedding_dimensions: 1536,
            candidate_multiplier: 4,
            request_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub mode: PipelineMode,
    /// Regenerate when the self-assessed answer score is below this (1-5).
    pub feedback_threshold: u8,
    /// Step ceiling for one graph run; the path is acyclic so this only
    /// guards against wiring mistakes.
    pub max_steps: usize,
    /// Overrides the built-in QA system template when set. The template is
    /// versioned data, not code; swapping it must not touch the pipeline.
    pub qa_template: Option<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            mode: PipelineMode::Graph,
            feedback_threshold: 4,
            max_steps: 16,
            qa_template: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub backend: SessionBackend,
    pub sqlite_path: PathBuf,
    /// Most recent turns handed to the rewriter and generator.
    pub history_window: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::Memory,
            sqlite_path: PathBuf::from("homasage-sessions.db"),
            history_window: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct IntegrationsConfig {
    #[serde(skip)]
    pub tavily_api_key: String,
    #[serde(skip)]
    pub notion_api_key: String,
    pub analytics_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub pipeline: PipelineSettings,
    pub session: SessionConfig,
    pub integrations: IntegrationsConfig,
}

impl AppConfig {
    /// Loads `config.yml` when present, applies environment overrides and
    /// validates the result.
    pub fn load() -> Result<Self, ApiError> {
        let mut config = match config_path() {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(&path).map_err(|e| {
                    ApiError::Internal(format!("failed to read {}: {}", path.display(), e))
                })?;
                serde_yaml::from_str::<AppConfig>(&contents).map_err(|e| {
                    ApiError::Internal(format!("invalid config {}: {}", path.display(), e))
                })?
            }
            _ => AppConfig::default(),
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            self.llm.api_key = key;
        }
        if let Ok(url) = env::var("OPENAI_BASE_URL") {
            self.llm.base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(url) = env::var("QDRANT_URL") {
            self.retrieval.qdrant_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(key) = env::var("TAVILY_API_KEY") {
            self.integrations.tavily_api_key = key;
        }
        if let Ok(key) = env::var("NOTION_API_KEY") {
            self.integrations.notion_api_key = key;
        }
        if let Ok(url) = env::var("ANALYTICS_URL") {
            self.integrations.analytics_url = Some(url);
        }
        if let Some(port) = env::var("PORT").ok().and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        bounded(
            "retrieval.top_k",
            self.retrieval.top_k as u64,
            1,
            100,
        )?;
        bounded(
            "retrieval.candidate_multiplier",
            self.retrieval.candidate_multiplier as u64,
            1,
            20,
        )?;
        bounded(
            "pipeline.feedback_threshold",
            self.pipeline.feedback_threshold as u64,
            1,
            5,
        )?;
        bounded("pipeline.max_steps", self.pipeline.max_steps as u64, 1, 1000)?;
        bounded(
            "server.request_timeout_secs",
            self.server.request_timeout_secs,
            1,
            3600,
        )?;
        bounded(
            "session.history_window",
            self.session.history_window as u64,
            1,
            500,
        )?;
        Ok(())
    }
}

fn config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("HOMASAGE_CONFIG_PATH") {
        return Some(PathBuf::from(path));
    }
    Some(PathBuf::from("config.yml"))
}

fn bounded(field: &str, value: u64, min: u64, max: u64) -> Result<(), ApiError> {
    if value < min || value > max {
        return Err(ApiError::Internal(format!(
            "config field {} out of range: {} (expected {}..={})",
            field, value, min, max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn default_mode_is_graph() {
        assert_eq!(AppConfig::default().pipeline.mode, PipelineMode::Graph);
    }

    #[test]
    fn yaml_overrides_merge_with_defaults() {
        let yaml = r#"
pipeline:
  mode: linear
  feedback_threshold: 3
retrieval:
  strategy: tiered
  top_k: 8
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.pipeline.mode, PipelineMode::Linear);
        assert_eq!(config.pipeline.feedback_threshold, 3);
        assert_eq!(config.retrieval.strategy, RetrievalStrategy::Tiered);
        assert_eq!(config.retrieval.top_k, 8);
        // Untouched sections keep their defaults.
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.retrieval.collection, "qa-chatbot");
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let mut config = AppConfig::default();
        config.pipeline.feedback_threshold = 9;
        assert!(config.validate().is_err());
    }
}
