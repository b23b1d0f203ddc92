//! Drives one query end to end: history load, question rewrite, the
//! pipeline variant, history append and the analytics event.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};

use crate::analytics::{AnalyticsSink, QueryEvent};
use crate::core::config::{AppConfig, PipelineMode};
use crate::core::errors::ApiError;
use crate::llm::ChatMessage;
use crate::session::{role_of, SessionStore, Turn};

use super::node::NodeContext;
use super::state::QueryState;
use super::{build_query_graph, rewriter, GraphRuntime, PipelineServices};

pub struct Orchestrator {
    services: Arc<PipelineServices>,
    sessions: Arc<dyn SessionStore>,
    analytics: AnalyticsSink,
    mode: PipelineMode,
    graph: GraphRuntime,
    history_window: usize,
}

impl Orchestrator {
    pub fn new(
        config: &AppConfig,
        services: Arc<PipelineServices>,
        sessions: Arc<dyn SessionStore>,
        analytics: AnalyticsSink,
    ) -> Result<Self, ApiError> {
        let graph = build_query_graph(config.pipeline.max_steps)?;
        Ok(Self {
            services,
            sessions,
            analytics,
            mode: config.pipeline.mode,
            graph,
            history_window: config.session.history_window,
        })
    }

    /// Runs one query. `ready` resolves once the response status is
    /// decided: `Err` before anything streamed means the caller should
    /// answer with that error, `Ok` means chunks will follow on
    /// `chunks`. Closing `chunks`' receiver cancels the run.
    pub async fn handle(
        &self,
        session_id: String,
        question: String,
        ready: oneshot::Sender<Result<(), ApiError>>,
        chunks: mpsc::Sender<Result<String, ApiError>>,
    ) {
        let started = Instant::now();
        let mut ready = Some(ready);

        let turns = match self.sessions.history(&session_id).await {
            Ok(turns) => turns,
            Err(err) => {
                tracing::error!(%session_id, error = %err, "failed to load session history");
                if let Some(gate) = ready.take() {
                    let _ = gate.send(Err(err));
                }
                return;
            }
        };

        let chat_history = windowed_history(&turns, self.history_window);
        let standalone =
            rewriter::rewrite_question(&self.services, &chat_history, &question).await;
        tracing::info!(%session_id, %standalone, "dispatching query");

        let mut state = QueryState::new(
            session_id.clone(),
            role_of(&session_id),
            standalone,
            question.clone(),
            chat_history,
        );

        let mut ctx = NodeContext {
            services: &self.services,
            chunks: &chunks,
            ready: &mut ready,
        };

        let outcome = match self.mode {
            PipelineMode::Linear => super::linear::run_linear(&mut state, &mut ctx).await,
            PipelineMode::Graph => self
                .graph
                .run(&mut state, &mut ctx)
                .await
                .map_err(ApiError::from),
        };

        if let Err(err) = outcome {
            tracing::error!(%session_id, error = %err, "pipeline run failed");
            match ready.take() {
                // Nothing streamed yet, fail the whole response.
                Some(gate) => {
                    let _ = gate.send(Err(err));
                }
                // Mid-stream, the forwarder already relayed the error.
                None => {}
            }
            return;
        }

        let Some(answer) = state.final_answer().map(str::to_string) else {
            tracing::error!(%session_id, "pipeline finished without an answer");
            if let Some(gate) = ready.take() {
                let _ = gate.send(Err(ApiError::internal("pipeline produced no answer")));
            }
            return;
        };

        // Buffered path: nothing has reached the client yet.
        if !state.answer_streamed {
            if let Some(gate) = ready.take() {
                let _ = gate.send(Ok(()));
            }
            if chunks.send(Ok(answer.clone())).await.is_err() {
                tracing::warn!(%session_id, "client disconnected before the answer was sent");
                return;
            }
        } else if let Some(gate) = ready.take() {
            // Streaming node finished without touching the gate; should
            // not happen, but never leave the caller hanging.
            let _ = gate.send(Ok(()));
        }

        if let Err(err) = self.sessions.append(&session_id, &question, &answer).await {
            tracing::error!(%session_id, error = %err, "failed to append session history");
        }

        let latency_ms = started.elapsed().as_millis() as u64;
        tracing::info!(%session_id, latency_ms, "query complete");
        self.analytics.record(QueryEvent {
            session_id,
            question,
            answer,
            latency_ms,
        });
    }
}

/// Converts the newest `window` turns into alternating user/assistant
/// messages, oldest first.
fn windowed_history(turns: &[Turn], window: usize) -> Vec<ChatMessage> {
    let skip = turns.len().saturating_sub(window);
    turns
        .iter()
        .skip(skip)
        .flat_map(|turn| {
            [
                ChatMessage::user(turn.question.clone()),
                ChatMessage::assistant(turn.answer.clone()),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(n: usize) -> Turn {
        Turn {
            question: format!("q{n}"),
            answer: format!("a{n}"),
        }
    }

    #[test]
    fn windowed_history_keeps_newest_turns() {
        let turns: Vec<Turn> = (0..5).map(turn).collect();
        let messages = windowed_history(&turns, 2);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].content, "q3");
        assert_eq!(messages[3].content, "a4");
    }

    #[test]
    fn windowed_history_handles_short_sessions() {
        let turns = vec![turn(0)];
        let messages = windowed_history(&turns, 10);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[1].role, "assistant");
    }
}
