// Conversational RAG pipeline.
// Stage contracts are typed; the orchestrator composes them either as a
// linear chain or as the graph state machine.

pub mod builder;
pub mod generator;
pub mod grader;
pub mod linear;
pub mod node;
pub mod nodes;
pub mod orchestrator;
pub mod rewriter;
pub mod runtime;
pub mod state;
pub mod summarizer;

use std::sync::Arc;

pub use builder::build_query_graph;
pub use node::{Node, NodeContext, NodeOutput};
pub use orchestrator::Orchestrator;
pub use runtime::GraphRuntime;
pub use state::QueryState;

use crate::core::config::AppConfig;
use crate::docs::images::ImageSource;
use crate::llm::LlmProvider;
use crate::prompts::PromptSet;
use crate::retrieval::Retriever;
use crate::search::WebSearch;

/// Everything a stage may call out to, bundled so nodes take one handle.
pub struct PipelineServices {
    pub llm: Arc<dyn LlmProvider>,
    pub retriever: Arc<dyn Retriever>,
    pub web_search: Arc<dyn WebSearch>,
    pub images: Arc<dyn ImageSource>,
    pub prompts: PromptSet,
    pub chat_model: String,
    pub utility_model: String,
    pub temperature: f64,
    pub feedback_threshold: u8,
}

impl PipelineServices {
    pub fn new(
        config: &AppConfig,
        llm: Arc<dyn LlmProvider>,
        retriever: Arc<dyn Retriever>,
        web_search: Arc<dyn WebSearch>,
        images: Arc<dyn ImageSource>,
    ) -> Self {
        Self {
            llm,
            retriever,
            web_search,
            images,
            prompts: PromptSet::new(config.pipeline.qa_template.clone()),
            chat_model: config.llm.chat_model.clone(),
            utility_model: config.llm.utility_model.clone(),
            temperature: config.llm.temperature,
            feedback_threshold: config.pipeline.feedback_threshold,
        }
    }
}
