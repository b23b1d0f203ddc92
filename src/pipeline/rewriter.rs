//! Rewrites a follow-up question into a standalone one using the
//! session history. First query in a session is passed through as-is.

use crate::llm::{ChatMessage, ChatRequest};
use crate::prompts::{render, REPHRASE_QUESTION_SYSTEM_TEMPLATE};

use super::PipelineServices;

/// Produces the standalone form of `question`. On an empty history the
/// question is returned byte for byte. A failed rewrite is retried once;
/// if the retry also fails the raw question is used so the query still
/// goes through retrieval.
pub async fn rewrite_question(
    services: &PipelineServices,
    chat_history: &[ChatMessage],
    question: &str,
) -> String {
    if chat_history.is_empty() {
        return question.to_string();
    }

    let mut messages = vec![ChatMessage::system(render(
        REPHRASE_QUESTION_SYSTEM_TEMPLATE,
        &[],
    ))];
    messages.extend(chat_history.iter().cloned());
    messages.push(ChatMessage::user(question));

    let request = ChatRequest::new(messages).with_temperature(services.temperature);

    for attempt in 0..2 {
        match services
            .llm
            .chat(request.clone(), &services.utility_model)
            .await
        {
            Ok(rewritten) => {
                let rewritten = rewritten.trim();
                if !rewritten.is_empty() {
                    return rewritten.to_string();
                }
                tracing::warn!(attempt, "question rewrite returned empty output");
            }
            Err(err) => {
                tracing::warn!(attempt, error = %err, "question rewrite failed");
            }
        }
    }

    tracing::warn!("falling back to the raw question after failed rewrites");
    question.to_string()
}
