//! Conversational Q&A backend for the HomaGames FAQ knowledge base:
//! retrieval-augmented generation with role-aware permission assessment
//! and streamed plain-text answers.

pub mod analytics;
pub mod core;
pub mod docs;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod prompts;
pub mod retrieval;
pub mod search;
pub mod server;
pub mod session;
pub mod state;
