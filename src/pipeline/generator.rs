//! Grounded answer generation: context assembly, prompt composition and
//! the shared streaming plumbing.

use tokio::sync::mpsc;

use crate::core::errors::ApiError;
use crate::docs::images::resolve_image_references;
use crate::docs::{wrap_documents, Document};
use crate::llm::{ChatMessage, ChatRequest};
use crate::prompts::render;

use super::PipelineServices;

/// Resolves image references in each document and wraps the set into
/// the tagged context block the answer prompt expects.
pub async fn build_context(services: &PipelineServices, documents: &[Document]) -> String {
    let mut resolved = Vec::with_capacity(documents.len());
    for document in documents {
        resolved.push(resolve_image_references(services.images.as_ref(), document.clone()).await);
    }
    wrap_documents(&resolved)
}

/// System prompt with summary and context filled in, then the session
/// history, then the user's question as the last message.
pub fn compose_messages(
    services: &PipelineServices,
    summary: &str,
    context: &str,
    chat_history: &[ChatMessage],
    question: &str,
) -> Vec<ChatMessage> {
    let system = render(
        &services.prompts.qa_system,
        &[("summary", summary), ("context", context)],
    );
    let mut messages = vec![ChatMessage::system(system)];
    messages.extend(chat_history.iter().cloned());
    messages.push(ChatMessage::user(question));
    messages
}

/// Non-streaming generation, used when the answer must be held back for
/// a quality check before anything reaches the client.
pub async fn generate_buffered(
    services: &PipelineServices,
    messages: Vec<ChatMessage>,
) -> Result<String, ApiError> {
    let request = ChatRequest::new(messages).with_temperature(services.temperature);
    services.llm.chat(request, &services.chat_model).await
}

/// Starts a streaming generation against the chat model.
pub async fn start_stream(
    services: &PipelineServices,
    messages: Vec<ChatMessage>,
) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError> {
    let request = ChatRequest::new(messages).with_temperature(services.temperature);
    services.llm.stream_chat(request, &services.chat_model).await
}

/// Forwards provider chunks to the client channel while accumulating the
/// full answer. A provider error is passed through to the client before
/// this returns it; a closed client channel aborts the forward.
pub async fn forward_stream(
    mut provider_rx: mpsc::Receiver<Result<String, ApiError>>,
    chunks: &mpsc::Sender<Result<String, ApiError>>,
) -> Result<String, ApiError> {
    let mut answer = String::new();

    while let Some(chunk) = provider_rx.recv().await {
        match chunk {
            Ok(text) => {
                answer.push_str(&text);
                if chunks.send(Ok(text)).await.is_err() {
                    return Err(ApiError::internal(
                        "client disconnected before the answer completed",
                    ));
                }
            }
            Err(err) => {
                let _ = chunks.send(Err(err.clone())).await;
                return Err(err);
            }
        }
    }

    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::images::NoopImageSource;
    use crate::prompts::PromptSet;
    use crate::retrieval::Retriever;
    use crate::search::DisabledWebSearch;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NoLlm;

    #[async_trait]
    impl crate::llm::LlmProvider for NoLlm {
        fn name(&self) -> &str {
            "none"
        }

        async fn chat(&self, _request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
            Err(ApiError::internal("unused"))
        }

        async fn stream_chat(
            &self,
            _request: ChatRequest,
            _model_id: &str,
        ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError> {
            Err(ApiError::internal("unused"))
        }

        async fn embed(
            &self,
            _inputs: &[String],
            _model_id: &str,
            _dimensions: Option<u32>,
        ) -> Result<Vec<Vec<f32>>, ApiError> {
            Err(ApiError::internal("unused"))
        }
    }

    struct NoRetriever;

    #[async_trait]
    impl Retriever for NoRetriever {
        async fn retrieve(&self, _query: &str) -> Result<Vec<Document>, ApiError> {
            Ok(Vec::new())
        }
    }

    fn services() -> PipelineServices {
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

    #[tokio::test]
    async fn context_wraps_every_document() {
        let services = services();
        let documents = vec![
            Document::new("First fact.", "kb/0123456789abcdef0123456789abcdef"),
            Document::new("Second fact.", "web-search"),
        ];
        let context = build_context(&services, &documents).await;

        assert_eq!(context.matches("<doc>").count(), 2);
        assert!(context.contains("First fact."));
        assert!(context.contains("Second fact."));
        assert!(context.contains("[pageId hash: 0123456789abcdef0123456789abcdef]"));
    }

    #[test]
    fn system_prompt_carries_summary_and_context() {
        let services = services();
        let messages = compose_messages(
            &services,
            "The user can perform this action.",
            "<doc>evidence</doc>",
            &[ChatMessage::user("earlier"), ChatMessage::assistant("reply")],
            "can I delete an idea?",
        );

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("The user can perform this action."));
        assert!(messages[0].content.contains("<doc>evidence</doc>"));
        assert_eq!(messages.last().unwrap().content, "can I delete an idea?");
    }

    #[tokio::test]
    async fn forward_stream_accumulates_and_relays() {
        let (provider_tx, provider_rx) = mpsc::channel(4);
        let (chunks_tx, mut chunks_rx) = mpsc::channel(4);

        provider_tx.send(Ok("Hel".to_string())).await.unwrap();
        provider_tx.send(Ok("lo".to_string())).await.unwrap();
        drop(provider_tx);

        let answer = forward_stream(provider_rx, &chunks_tx).await.unwrap();
        assert_eq!(answer, "Hello");

        let mut relayed = String::new();
        while let Ok(chunk) = chunks_rx.try_recv() {
            relayed.push_str(&chunk.unwrap());
        }
        assert_eq!(relayed, answer);
    }

    #[tokio::test]
    async fn forward_stream_passes_provider_error_through() {
        let (provider_tx, provider_rx) = mpsc::channel(4);
        let (chunks_tx, mut chunks_rx) = mpsc::channel(4);

        provider_tx.send(Ok("partial".to_string())).await.unwrap();
        provider_tx
            .send(Err(ApiError::upstream("connection reset")))
            .await
            .unwrap();
        drop(provider_tx);

        let err = forward_stream(provider_rx, &chunks_tx).await.unwrap_err();
        assert!(matches!(err, ApiError::Upstream(_)));

        assert!(chunks_rx.recv().await.unwrap().is_ok());
        assert!(chunks_rx.recv().await.unwrap().is_err());
    }

    #[tokio::test]
    async fn forward_stream_stops_when_client_is_gone() {
        let (provider_tx, provider_rx) = mpsc::channel(4);
        let (chunks_tx, chunks_rx) = mpsc::channel::<Result<String, ApiError>>(4);
        drop(chunks_rx);

        provider_tx.send(Ok("chunk".to_string())).await.unwrap();
        drop(provider_tx);

        let err = forward_stream(provider_rx, &chunks_tx).await.unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
