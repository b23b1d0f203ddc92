//! Per-session conversation state.
//!
//! Sessions are created on first access and never explicitly destroyed. The
//! in-memory backend keeps history for the process lifetime (loss on restart
//! is accepted); the sqlite backend survives restarts. Appends are
//! serialized per session id, so concurrent requests on different sessions
//! never contend.

pub mod sqlite;

pub use sqlite::SqliteSessionStore;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// One completed exchange, append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

/// Inferred caller role. Session identity maps deterministically to a role
/// via the identifier's leading character; nothing else about the id
/// matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Admin,
    Internal,
    External,
}

impl UserRole {
    /// Natural-language descriptor handed to the context summarizer. Never
    /// echoed to the end user.
    pub fn descriptor(&self) -> &'static str {
        match self {
            UserRole::Admin => "an Admin in HomaGames (ie. Admin in Homa Team)",
            UserRole::Internal => "an Internal member of HomaGames (ie. the Homa team)",
            UserRole::External => "External, not part of the Homa team / HomaGames",
        }
    }
}

pub fn role_of(session_id: &str) -> UserRole {
    match session_id.chars().next() {
        Some('0') => UserRole::Admin,
        Some('1') => UserRole::Internal,
        _ => UserRole::External,
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Conversation history for a session; empty for ids never seen.
    async fn history(&self, session_id: &str) -> Result<Vec<Turn>, ApiError>;

    /// Records a completed exchange. Exactly one append per exchange; a
    /// failed exchange never reaches this point.
    async fn append(&self, session_id: &str, question: &str, answer: &str)
        -> Result<(), ApiError>;
}

/// Process-wide map of session id -> history. Each session owns an async
/// mutex so appends on one id are serialized without blocking other ids.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, Arc<tokio::sync::Mutex<Vec<Turn>>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, session_id: &str) -> Arc<tokio::sync::Mutex<Vec<Turn>>> {
        let mut sessions = self.sessions.lock().expect("session map poisoned");
        sessions
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn history(&self, session_id: &str) -> Result<Vec<Turn>, ApiError> {
        let entry = self.entry(session_id);
        let turns = entry.lock().await;
        Ok(turns.clone())
    }

    async fn append(
        &self,
        session_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<(), ApiError> {
        let entry = self.entry(session_id);
        let mut turns = entry.lock().await;
        turns.push(Turn {
            question: question.to_string(),
            answer: answer.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_is_a_pure_function_of_the_leading_char() {
        assert_eq!(role_of("0abc"), UserRole::Admin);
        assert_eq!(role_of("1abc"), UserRole::Internal);
        assert_eq!(role_of("2abc"), UserRole::External);
        assert_eq!(role_of("xyz"), UserRole::External);
        assert_eq!(role_of(""), UserRole::External);

        // Same id twice, same role; ids differing only after the first
        // character agree.
        assert_eq!(role_of("1abc"), role_of("1abc"));
        assert_eq!(role_of("1abc"), role_of("1zzz"));
    }

    #[tokio::test]
    async fn first_access_creates_empty_history() {
        let store = InMemorySessionStore::new();
        assert!(store.history("fresh").await.unwrap().is_empty());
        // Idempotent for existing ids.
        assert!(store.history("fresh").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn appends_preserve_submission_order() {
        let store = InMemorySessionStore::new();
        for i in 0..5 {
            store
                .append("s", &format!("q{}", i), &format!("a{}", i))
                .await
                .unwrap();
        }

        let turns = store.history("s").await.unwrap();
        assert_eq!(turns.len(), 5);
        for (i, turn) in turns.iter().enumerate() {
            assert_eq!(turn.question, format!("q{}", i));
            assert_eq!(turn.answer, format!("a{}", i));
        }
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = InMemorySessionStore::new();
        store.append("a", "qa", "aa").await.unwrap();
        store.append("b", "qb", "ab").await.unwrap();

        assert_eq!(store.history("a").await.unwrap().len(), 1);
        assert_eq!(store.history("b").await.unwrap().len(), 1);
        assert_eq!(store.history("a").await.unwrap()[0].question, "qa");
    }

    #[tokio::test]
    async fn concurrent_appends_on_one_session_all_land() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append("shared", &format!("q{}", i), "a")
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let turns = store.history("shared").await.unwrap();
        assert_eq!(turns.len(), 20);
        // Every turn is intact, no interleaved halves.
        for turn in &turns {
            assert!(turn.question.starts_with('q'));
            assert_eq!(turn.answer, "a");
        }
    }
}
