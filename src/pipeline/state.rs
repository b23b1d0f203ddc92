use crate::docs::Document;
use crate::llm::ChatMessage;
use crate::session::UserRole;

/// Mutable state threaded through the pipeline for one query.
///
/// `question` holds the current standalone form and may be rewritten by
/// the transform stage; `original_question` is what the user typed and
/// is what gets recorded in session history.
#[derive(Debug, Clone)]
pub struct QueryState {
    pub session_id: String,
    pub role: UserRole,
    pub question: String,
    pub original_question: String,
    pub chat_history: Vec<ChatMessage>,
    pub documents: Vec<Document>,
    pub context: Option<String>,
    pub summary: Option<String>,
    pub generation: Option<String>,
    pub feedback: Option<String>,
    pub feedback_score: Option<u8>,
    pub regeneration: Option<String>,
    /// Set once a node has already forwarded the answer to the client,
    /// so the orchestrator does not emit it a second time.
    pub answer_streamed: bool,
}

impl QueryState {
    pub fn new(
        session_id: String,
        role: UserRole,
        question: String,
        original_question: String,
        chat_history: Vec<ChatMessage>,
    ) -> Self {
        Self {
            session_id,
            role,
            question,
            original_question,
            chat_history,
            documents: Vec::new(),
            context: None,
            summary: None,
            generation: None,
            feedback: None,
            feedback_score: None,
            regeneration: None,
            answer_streamed: false,
        }
    }

    /// The answer the user should see: the refined one when a refinement
    /// pass ran, otherwise the first generation.
    pub fn final_answer(&self) -> Option<&str> {
        self.regeneration
            .as_deref()
            .or(self.generation.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_state() -> QueryState {
        QueryState::new(
            "1-abc".into(),
            UserRole::Internal,
            "q".into(),
            "q".into(),
            Vec::new(),
        )
    }

    #[test]
    fn final_answer_prefers_regeneration() {
        let mut state = blank_state();
        assert_eq!(state.final_answer(), None);
        state.generation = Some("first".into());
        assert_eq!(state.final_answer(), Some("first"));
        state.regeneration = Some("refined".into());
        assert_eq!(state.final_answer(), Some("refined"));
    }
}
