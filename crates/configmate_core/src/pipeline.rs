//! crates/configmate_core/src/pipeline.rs
//!
//! The streaming answer pipeline. A producer that checks the answer cache,
//! assembles context, forwards model tokens onto a bounded channel and
//! persists the finished answer once generation completes.

use crate::{
    cache::AnswerCache,
    context::ContextAssembler,
    domain::PromptMessage,
    normalize::normalize,
    ports::{DatabaseService, PortError, QuestionAnsweringService},
};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Errors surfaced by the pipeline to its caller.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The consumer stopped listening before generation finished.
    #[error("Stream cancelled by client")]
    Cancelled,
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Generation failed: {0}")]
    Generation(String),
    #[error("Model did not return an answer")]
    EmptyAnswer,
    #[error(transparent)]
    Port(#[from] PortError),
}

/// How a stream that was not cancelled ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// A cached answer was replayed; nothing was written.
    CacheHit,
    /// The model finished. `persisted` is false for a blank answer.
    Completed { persisted: bool },
    /// The model call failed; tokens already sent stay sent, nothing is written.
    Failed,
}

/// One incoming chat question.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub question: String,
    pub owner: String,
    pub chat_id: Option<Uuid>,
}

/// Result of driving the model, before the post-stream continuation runs.
enum Generation {
    Finished(String),
    Cancelled,
    Failed(String),
}

#[derive(Clone)]
pub struct ChatPipeline {
    db: Arc<dyn DatabaseService>,
    model: Arc<dyn QuestionAnsweringService>,
    cache: AnswerCache,
    assembler: ContextAssembler,
}

impl ChatPipeline {
    pub fn new(db: Arc<dyn DatabaseService>, model: Arc<dyn QuestionAnsweringService>) -> Self {
        Self {
            cache: AnswerCache::new(db.clone()),
            assembler: ContextAssembler::new(db.clone()),
            db,
            model,
        }
    }

    /// Answers `turn`, sending tokens to `tokens` in generation order.
    ///
    /// A dropped receiver or a triggered `cancel` both end the stream with
    /// `PipelineError::Cancelled`, and the partial answer is discarded.
    pub async fn stream_answer(
        &self,
        turn: &ChatTurn,
        tokens: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> Result<StreamOutcome, PipelineError> {
        if let Some(cached) = self.cache.lookup(&turn.question).await? {
            for c in cached.chars() {
                emit(&tokens, &cancel, c.to_string()).await?;
            }
            return Ok(StreamOutcome::CacheHit);
        }

        let messages = self.assembler.build(&turn.question, turn.chat_id).await?;
        let generation = self.generate(&messages, &tokens, &cancel).await;
        drop(tokens);

        self.settle(turn, generation).await
    }

    /// Post-stream continuation. Runs for every generation result; only a
    /// finished, non-blank answer is written.
    async fn settle(
        &self,
        turn: &ChatTurn,
        generation: Generation,
    ) -> Result<StreamOutcome, PipelineError> {
        match generation {
            Generation::Finished(answer) => {
                let persisted = if answer.trim().is_empty() {
                    warn!(chat_id = ?turn.chat_id, "Model returned a blank answer, nothing saved");
                    false
                } else {
                    self.cache
                        .record(&turn.question, &answer, &turn.owner, turn.chat_id)
                        .await?
                };
                Ok(StreamOutcome::Completed { persisted })
            }
            Generation::Cancelled => {
                info!(chat_id = ?turn.chat_id, "Stream stopped by client, partial answer discarded");
                Err(PipelineError::Cancelled)
            }
            Generation::Failed(reason) => {
                error!(chat_id = ?turn.chat_id, %reason, "Stream interrupted, nothing saved");
                Ok(StreamOutcome::Failed)
            }
        }
    }

    async fn generate(
        &self,
        messages: &[PromptMessage],
        tokens: &mpsc::Sender<String>,
        cancel: &CancellationToken,
    ) -> Generation {
        let mut stream = match self.model.answer_streaming(messages).await {
            Ok(stream) => stream,
            Err(e) => return Generation::Failed(e.to_string()),
        };

        let mut answer = String::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Generation::Cancelled,
                next = stream.next() => next,
            };

            match next {
                Some(Ok(token)) => {
                    if token.is_empty() {
                        continue;
                    }
                    answer.push_str(&token);
                    if emit(tokens, cancel, token).await.is_err() {
                        return Generation::Cancelled;
                    }
                }
                Some(Err(e)) => return Generation::Failed(e.to_string()),
                None => return Generation::Finished(answer),
            }
        }
    }

    /// Re-answers an edited question with a fresh generation.
    ///
    /// The old record must exist in the chat (matched by exact text or by
    /// normalized key). The cache is never consulted here, and the old record
    /// is left untouched; the new answer is appended as its own record. No
    /// eviction pass runs, so the old record survives even when both questions
    /// share a key that is already at the retention cap.
    pub async fn edit_question(
        &self,
        owner: &str,
        chat_id: Uuid,
        old_question: &str,
        new_question: &str,
    ) -> Result<String, PipelineError> {
        let existing = self
            .db
            .find_qa_in_chat(chat_id, owner, old_question, &normalize(old_question))
            .await?;
        if existing.is_none() {
            warn!(%chat_id, question = %old_question, "Question not found for editing");
            return Err(PipelineError::NotFound("Question not found".to_string()));
        }

        let messages = self.assembler.build(new_question, Some(chat_id)).await?;
        let mut stream = self
            .model
            .answer_streaming(&messages)
            .await
            .map_err(|e| PipelineError::Generation(e.to_string()))?;

        let mut answer = String::new();
        while let Some(token) = stream.next().await {
            let token = token.map_err(|e| {
                error!(%chat_id, error = %e, "Re-answer stream interrupted");
                PipelineError::Generation(e.to_string())
            })?;
            answer.push_str(&token);
        }

        let answer = answer.trim().to_string();
        if answer.is_empty() {
            return Err(PipelineError::EmptyAnswer);
        }

        self.cache
            .append(new_question, &answer, owner, Some(chat_id))
            .await?;
        info!(%chat_id, "Added new QA record for edited question");
        Ok(answer)
    }
}

/// Sends one token, giving up as soon as the consumer is gone or `cancel` fires.
async fn emit(
    tokens: &mpsc::Sender<String>,
    cancel: &CancellationToken,
    token: String,
) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        sent = tokens.send(token) => sent.map_err(|_| PipelineError::Cancelled),
    }
}
