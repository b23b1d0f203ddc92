//! Internal permission assessment for the user's requested action.
//!
//! The summary is model-facing only; it is injected into the answer
//! prompt and must never be shown to the user directly.

use crate::llm::{ChatMessage, ChatRequest};
use crate::prompts::{render, CONTEXT_SUMMARY_TEMPLATE};
use crate::session::UserRole;

use super::PipelineServices;

/// Used when the assessment call fails. Phrased to keep the answer
/// stage permissive, matching the default when documents are silent.
pub const SUMMARY_FALLBACK: &str =
    "No explicit restriction was found for this request; treat the action as permitted.";

pub async fn summarize(
    services: &PipelineServices,
    role: UserRole,
    context: &str,
    question: &str,
) -> String {
    let prompt = render(
        CONTEXT_SUMMARY_TEMPLATE,
        &[
            ("role", role.descriptor()),
            ("context", context),
            ("question", question),
        ],
    );
    let request =
        ChatRequest::new(vec![ChatMessage::user(prompt)]).with_temperature(services.temperature);

    match services.llm.chat(request, &services.utility_model).await {
        Ok(summary) => summary,
        Err(err) => {
            tracing::warn!(error = %err, "permission assessment failed, using fallback");
            SUMMARY_FALLBACK.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ApiError;
    use crate::docs::Document;
    use crate::docs::images::NoopImageSource;
    use crate::llm::LlmProvider;
    use crate::prompts::PromptSet;
    use crate::retrieval::Retriever;
    use crate::search::DisabledWebSearch;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    struct CapturingLlm {
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl LlmProvider for CapturingLlm {
        fn name(&self) -> &str {
            "capturing"
        }

        async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
            self.prompts
                .lock()
                .unwrap()
                .push(request.messages[0].content.clone());
            if self.fail {
                Err(ApiError::upstream("assessment model down"))
            } else {
                Ok("The user can perform this action.".to_string())
            }
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

    fn services(fail: bool) -> (PipelineServices, Arc<CapturingLlm>) {
        let llm = Arc::new(CapturingLlm {
            prompts: Mutex::new(Vec::new()),
            fail,
        });
        let services = PipelineServices {
            llm: llm.clone(),
            retriever: Arc::new(NoRetriever),
            web_search: Arc::new(DisabledWebSearch),
            images: Arc::new(NoopImageSource),
            prompts: PromptSet::new(None),
            chat_model: "chat".into(),
            utility_model: "utility".into(),
            temperature: 0.0,
            feedback_threshold: 4,
        };
        (services, llm)
    }

    #[tokio::test]
    async fn prompt_names_role_context_and_question() {
        let (services, llm) = services(false);
        let summary = summarize(
            &services,
            UserRole::External,
            "<doc>only admins may delete ideas</doc>",
            "can I delete an idea?",
        )
        .await;

        assert_eq!(summary, "The user can perform this action.");
        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains(UserRole::External.descriptor()));
        assert!(prompts[0].contains("only admins may delete ideas"));
        assert!(prompts[0].contains("can I delete an idea?"));
    }

    #[tokio::test]
    async fn assessment_failure_degrades_to_permissive_fallback() {
        let (services, _) = services(true);
        let summary = summarize(&services, UserRole::Internal, "", "can I?").await;
        assert_eq!(summary, SUMMARY_FALLBACK);
    }
}
