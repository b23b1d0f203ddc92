use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub session_id: String,
    pub question: String,
}

/// POST /api/query
///
/// Runs the pipeline in a background task and waits on the readiness
/// gate before committing to a status code: a pre-stream failure turns
/// into a plain error response, success turns into a chunked plain-text
/// body fed by the pipeline. Dropping the response drops the chunk
/// receiver, which cancels the run.
pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Response, ApiError> {
    if request.question.trim().is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".into()));
    }
    if request.session_id.trim().is_empty() {
        return Err(ApiError::BadRequest("sessionId must not be empty".into()));
    }

    let (ready_tx, ready_rx) = oneshot::channel();
    let (chunks_tx, chunks_rx) = mpsc::channel(32);

    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        orchestrator
            .handle(request.session_id, request.question, ready_tx, chunks_tx)
            .await;
    });

    match ready_rx.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => return Err(err),
        Err(_) => {
            return Err(ApiError::internal(
                "pipeline task ended before signalling readiness",
            ))
        }
    }

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from_stream(ReceiverStream::new(chunks_rx)))
        .map_err(|err| ApiError::internal(format!("failed to build response: {err}")))
}
