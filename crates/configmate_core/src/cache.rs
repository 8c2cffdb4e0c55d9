//! crates/configmate_core/src/cache.rs
//!
//! The answer cache: exact-match reuse of previously generated answers, keyed
//! by the normalized question, with a retention cap per key.

use crate::{
    domain::QaRecord,
    normalize::normalize,
    ports::{DatabaseService, PortResult},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Maximum number of records kept per normalized key.
pub const RETENTION_CAP: usize = 5;

/// Global (not chat-scoped) cache over the QA record store.
///
/// There is no lock around `record`. Two writers racing on the same key can
/// both insert, so the cap is enforced eventually by the next eviction pass.
#[derive(Clone)]
pub struct AnswerCache {
    db: Arc<dyn DatabaseService>,
}

impl AnswerCache {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// Returns the newest stored answer whose normalized question matches.
    pub async fn lookup(&self, question: &str) -> PortResult<Option<String>> {
        let key = normalize(question);
        let found = self.db.find_qa_by_normalized(&key, Some(1)).await?;

        Ok(found.into_iter().next().map(|hit| {
            info!(question = %hit.question, "Reusing cached answer");
            hit.answer
        }))
    }

    /// Stores a new record, then trims the key back to `RETENTION_CAP`.
    ///
    /// Blank questions or answers are skipped and `Ok(false)` is returned.
    pub async fn record(
        &self,
        question: &str,
        answer: &str,
        owner: &str,
        chat_id: Option<Uuid>,
    ) -> PortResult<bool> {
        if question.trim().is_empty() || answer.trim().is_empty() {
            warn!("Skipping cache write: question or answer is empty");
            return Ok(false);
        }

        let key = self.append(question, answer, owner, chat_id).await?;
        self.evict_beyond_cap(&key).await?;
        Ok(true)
    }

    /// Inserts one record without any eviction pass and returns its key.
    ///
    /// Used where existing records must survive, such as an edited question
    /// whose original shares the same key.
    pub async fn append(
        &self,
        question: &str,
        answer: &str,
        owner: &str,
        chat_id: Option<Uuid>,
    ) -> PortResult<String> {
        let key = normalize(question);
        self.db
            .insert_qa_record(QaRecord {
                id: Uuid::new_v4(),
                chat_id,
                owner: owner.to_string(),
                question: question.to_string(),
                normalized: key.clone(),
                answer: answer.to_string(),
                created_at: Utc::now(),
            })
            .await?;
        info!(?chat_id, "Saved new QA record");
        Ok(key)
    }

    async fn evict_beyond_cap(&self, key: &str) -> PortResult<()> {
        let same_key = self.db.find_qa_by_normalized(key, None).await?;
        if same_key.len() <= RETENTION_CAP {
            return Ok(());
        }

        let stale: Vec<Uuid> = same_key[RETENTION_CAP..].iter().map(|r| r.id).collect();
        let removed = self.db.delete_qa_records(&stale).await?;
        info!(removed, "Evicted QA records beyond retention cap");
        Ok(())
    }
}
