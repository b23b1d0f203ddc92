use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::ChatRequest;
use crate::core::errors::ApiError;

/// Text-generation and embedding service seam. The production implementation
/// talks to an OpenAI-compatible API; tests plug in scripted fakes.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// provider name for logs (e.g. "openai")
    fn name(&self) -> &str;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ApiError>;

    /// chat completion (streaming); the receiver yields token chunks in order
    async fn stream_chat(
        &self,
        request: ChatRequest,
        model_id: &str,
    ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError>;

    /// generate embeddings, optionally truncated to `dimensions`
    async fn embed(
        &self,
        inputs: &[String],
        model_id: &str,
        dimensions: Option<u32>,
    ) -> Result<Vec<Vec<f32>>, ApiError>;
}
