//! Shared application state wired up once at startup.

use std::sync::Arc;

use crate::analytics::AnalyticsSink;
use crate::core::config::{AppConfig, RetrievalStrategy, SessionBackend};
use crate::core::errors::ApiError;
use crate::docs::images::{ImageSource, NoopImageSource, NotionImageSource};
use crate::llm::OpenAiProvider;
use crate::pipeline::{Orchestrator, PipelineServices};
use crate::retrieval::qdrant::QdrantSearch;
use crate::retrieval::retriever::{Retriever, SingleStageRetriever, TieredRetriever};
use crate::retrieval::VectorSearch;
use crate::search::{DisabledWebSearch, TavilySearch, WebSearch};
use crate::session::sqlite::SqliteSessionStore;
use crate::session::{InMemorySessionStore, SessionStore};

pub struct AppState {
    pub config: AppConfig,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Builds the full service graph from validated configuration.
    pub async fn initialize(config: AppConfig) -> Result<Self, ApiError> {
        let llm = Arc::new(OpenAiProvider::new(&config.llm)?);
        let store: Arc<dyn VectorSearch> = Arc::new(QdrantSearch::new(&config.retrieval)?);

        let retriever: Arc<dyn Retriever> = match config.retrieval.strategy {
            RetrievalStrategy::Single => Arc::new(SingleStageRetriever::new(
                llm.clone(),
                store,
                &config.retrieval,
            )),
            RetrievalStrategy::Tiered => Arc::new(TieredRetriever::new(
                llm.clone(),
                store,
                &config.retrieval,
            )),
        };

        let web_search: Arc<dyn WebSearch> = if config.integrations.tavily_api_key.is_empty() {
            tracing::warn!("no Tavily key configured, web search fallback disabled");
            Arc::new(DisabledWebSearch)
        } else {
            Arc::new(TavilySearch::new(config.integrations.tavily_api_key.clone()))
        };

        let images: Arc<dyn ImageSource> = if config.integrations.notion_api_key.is_empty() {
            Arc::new(NoopImageSource)
        } else {
            Arc::new(NotionImageSource::new(
                config.integrations.notion_api_key.clone(),
            ))
        };

        let sessions: Arc<dyn SessionStore> = match config.session.backend {
            SessionBackend::Memory => Arc::new(InMemorySessionStore::new()),
            SessionBackend::Sqlite => {
                Arc::new(SqliteSessionStore::new(&config.session.sqlite_path).await?)
            }
        };

        let analytics = AnalyticsSink::new(config.integrations.analytics_url.clone());

        let services = Arc::new(PipelineServices::new(
            &config,
            llm,
            retriever,
            web_search,
            images,
        ));
        let orchestrator = Arc::new(Orchestrator::new(&config, services, sessions, analytics)?);

        tracing::info!(
            mode = config.pipeline.mode.as_str(),
            "application state initialized"
        );

        Ok(Self {
            config,
            orchestrator,
        })
    }
}
