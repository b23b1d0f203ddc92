//! Binary relevance grading of retrieved documents.

use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::docs::Document;
use crate::llm::{ChatMessage, ChatRequest};
use crate::prompts::{render, GRADE_TEMPLATE};

use super::PipelineServices;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Relevant,
    NotRelevant,
}

#[derive(Deserialize)]
struct GradePayload {
    binary_score: String,
}

/// Parses the grader's reply. Accepts the JSON object anywhere in the
/// output (models like to wrap it in code fences or prose); any score
/// other than "yes"/"no" is a parse failure.
pub fn parse_verdict(raw: &str) -> Result<Verdict, ApiError> {
    let start = raw
        .find('{')
        .ok_or_else(|| ApiError::internal(format!("no JSON object in grade output: {raw}")))?;
    let end = raw
        .rfind('}')
        .ok_or_else(|| ApiError::internal(format!("unterminated JSON in grade output: {raw}")))?;

    let payload: GradePayload = serde_json::from_str(&raw[start..=end])
        .map_err(|err| ApiError::internal(format!("malformed grade output: {err}")))?;

    match payload.binary_score.trim().to_ascii_lowercase().as_str() {
        "yes" => Ok(Verdict::Relevant),
        "no" => Ok(Verdict::NotRelevant),
        other => Err(ApiError::internal(format!(
            "unexpected binary_score: {other}"
        ))),
    }
}

pub async fn grade_document(
    services: &PipelineServices,
    question: &str,
    document: &Document,
) -> Result<Verdict, ApiError> {
    let prompt = render(
        GRADE_TEMPLATE,
        &[("context", document.content.as_str()), ("question", question)],
    );
    let request =
        ChatRequest::new(vec![ChatMessage::user(prompt)]).with_temperature(services.temperature);
    let reply = services.llm.chat(request, &services.utility_model).await?;
    parse_verdict(&reply)
}
