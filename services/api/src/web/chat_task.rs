//! services/api/src/web/chat_task.rs
//!
//! The streaming chat endpoint. The answer pipeline runs as a producer task
//! writing tokens to a bounded channel; the response body is the consumer.
//! Dropping the body (client disconnect or abort) cancels the producer.

use crate::{
    error::ApiError,
    web::{middleware::Owner, protocol::ChatIn, state::AppState},
};
use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use bytes::Bytes;
use configmate_core::pipeline::{ChatPipeline, ChatTurn, PipelineError, StreamOutcome};
use std::{convert::Infallible, sync::Arc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Tokens buffered between the producer and the response body.
const TOKEN_BUFFER: usize = 32;

/// Ask a question and stream the answer back as plain text.
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatIn,
    responses(
        (status = 200, description = "Answer tokens streamed as they are generated", body = String, content_type = "text/plain"),
        (status = 400, description = "Missing chat_id"),
        (status = 404, description = "Chat not found")
    )
)]
pub async fn chat_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(owner): Extension<Owner>,
    Json(inp): Json<ChatIn>,
) -> Result<Response, ApiError> {
    let chat_id = inp
        .chat_id
        .ok_or_else(|| ApiError::BadRequest("Missing chat_id".to_string()))?;
    app_state.db.get_chat(chat_id, &owner.0).await?;

    let turn = ChatTurn {
        question: inp.question,
        owner: owner.0,
        chat_id: Some(chat_id),
    };

    let (tx, mut rx) = mpsc::channel::<String>(TOKEN_BUFFER);
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    tokio::spawn(chat_process(app_state.pipeline.clone(), turn, tx, cancel));

    let body = async_stream::stream! {
        // Held for as long as the client is reading; dropped with the body.
        let _guard = guard;
        while let Some(token) = rx.recv().await {
            yield Ok::<Bytes, Infallible>(Bytes::from(token));
        }
    };

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(body),
    )
        .into_response())
}

/// Runs the pipeline for one question and logs how it ended.
async fn chat_process(
    pipeline: ChatPipeline,
    turn: ChatTurn,
    tokens: mpsc::Sender<String>,
    cancel: CancellationToken,
) {
    match pipeline.stream_answer(&turn, tokens, cancel).await {
        Ok(StreamOutcome::CacheHit) => {
            info!(chat_id = ?turn.chat_id, "Answered from cache");
        }
        Ok(StreamOutcome::Completed { persisted }) => {
            info!(chat_id = ?turn.chat_id, persisted, "Answer stream completed");
        }
        Ok(StreamOutcome::Failed) => {
            warn!(chat_id = ?turn.chat_id, "Answer stream ended early after a model failure");
        }
        Err(PipelineError::Cancelled) => {
            info!(chat_id = ?turn.chat_id, "Stream stopped by user, skipped save");
        }
        Err(e) => {
            error!(chat_id = ?turn.chat_id, "Chat stream failed: {}", e);
        }
    }
}
