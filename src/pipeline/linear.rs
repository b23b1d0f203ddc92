//! Linear pipeline variant: retrieve, assess, generate, stream.
//!
//! No grading or refinement pass, so generation can stream to the
//! client as it is produced.

use crate::core::errors::ApiError;

use super::node::NodeContext;
use super::state::QueryState;
use super::{generator, summarizer};

pub async fn run_linear(state: &mut QueryState, ctx: &mut NodeContext<'_>) -> Result<(), ApiError> {
    state.documents = ctx.services.retriever.retrieve(&state.question).await?;
    tracing::info!(
        session_id = %state.session_id,
        count = state.documents.len(),
        "retrieved documents"
    );

    let context = generator::build_context(ctx.services, &state.documents).await;
    let summary =
        summarizer::summarize(ctx.services, state.role, &context, &state.question).await;

    let messages = generator::compose_messages(
        ctx.services,
        &summary,
        &context,
        &state.chat_history,
        &state.question,
    );

    let provider_rx = generator::start_stream(ctx.services, messages).await?;
    ctx.signal_ready();

    let answer = generator::forward_stream(provider_rx, ctx.chunks).await?;

    state.context = Some(context);
    state.summary = Some(summary);
    state.generation = Some(answer);
    state.answer_streamed = true;
    Ok(())
}
