//! crates/configmate_core/src/context.rs
//!
//! Builds the bounded prompt for a question: the trailing turns of the chat and
//! labeled excerpts from the chat's documents plus the global knowledge base.

use crate::{
    domain::{DocumentRecord, PromptMessage},
    ports::{DatabaseService, PortResult},
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Number of most recent turns replayed as history.
pub const HISTORY_TURNS: usize = 5;

/// Characters taken from the start of each document.
pub const EXCERPT_CHARS: usize = 1500;

#[derive(Clone)]
pub struct ContextAssembler {
    db: Arc<dyn DatabaseService>,
}

impl ContextAssembler {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// Produces the message sequence to send to the model.
    ///
    /// Without a chat there is no history and no document context, so the
    /// result is the bare question.
    pub async fn build(
        &self,
        question: &str,
        chat_id: Option<Uuid>,
    ) -> PortResult<Vec<PromptMessage>> {
        let mut messages = Vec::new();
        let mut doc_context = String::new();

        if let Some(chat_id) = chat_id {
            let mut history = self.db.recent_qa_for_chat(chat_id, HISTORY_TURNS).await?;
            history.reverse();
            for turn in history {
                messages.push(PromptMessage::user(turn.question));
                messages.push(PromptMessage::assistant(turn.answer));
            }

            let documents = self.db.documents_for_chat(chat_id).await?;
            if !documents.is_empty() {
                debug!(count = documents.len(), %chat_id, "Attaching document context");
            }
            for document in &documents {
                doc_context.push_str(&document_excerpt(document));
            }
        }

        messages.push(PromptMessage::user(wrap_question(question, &doc_context)));
        Ok(messages)
    }
}

/// A labeled excerpt of at most `EXCERPT_CHARS` characters.
fn document_excerpt(document: &DocumentRecord) -> String {
    let excerpt: String = document.content.chars().take(EXCERPT_CHARS).collect();
    format!("\n\n[file: {}]\n{}", document.filename, excerpt)
}

fn wrap_question(question: &str, doc_context: &str) -> String {
    if doc_context.trim().is_empty() {
        question.to_string()
    } else {
        format!(
            "Given the following document context:\n{}\n\nQuestion: {}",
            doc_context, question
        )
    }
}
