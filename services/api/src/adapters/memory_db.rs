//! services/api/src/adapters/memory_db.rs
//!
//! An in-process implementation of the `DatabaseService` port. Used by the test
//! suite and when `DATABASE_URL=memory://`. Nothing survives a restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use configmate_core::domain::{Chat, DocumentRecord, QaRecord, User, UserCredentials};
use configmate_core::ports::{DatabaseService, PortError, PortResult};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashMap<String, (UserCredentials, DateTime<Utc>)>,
    auth_sessions: HashMap<String, (String, DateTime<Utc>)>,
    chats: Vec<Chat>,
    // Kept in insertion order; ties on timestamp resolve by position.
    qa_records: Vec<QaRecord>,
    documents: Vec<DocumentRecord>,
}

/// A `DatabaseService` backed by vectors behind a single `RwLock`.
#[derive(Default)]
pub struct MemoryDb {
    tables: RwLock<Tables>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Records newest first. The sort is stable over reversed insertion order, so
/// of two records with equal timestamps the later insert comes first.
fn newest_first<'a>(records: impl DoubleEndedIterator<Item = &'a QaRecord>) -> Vec<QaRecord> {
    let mut sorted: Vec<QaRecord> = records.rev().cloned().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted
}

#[async_trait]
impl DatabaseService for MemoryDb {
    async fn create_user(&self, username: &str, hashed_password: &str) -> PortResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(username) {
            return Err(PortError::AlreadyExists("Username already exists".to_string()));
        }
        let created_at = Utc::now();
        let credentials = UserCredentials {
            username: username.to_string(),
            hashed_password: hashed_password.to_string(),
        };
        tables
            .users
            .insert(username.to_string(), (credentials, created_at));
        Ok(User {
            username: username.to_string(),
            created_at,
        })
    }

    async fn get_user_credentials(&self, username: &str) -> PortResult<UserCredentials> {
        let tables = self.tables.read().await;
        tables
            .users
            .get(username)
            .map(|(creds, _)| creds.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", username)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        username: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .auth_sessions
            .insert(session_id.to_string(), (username.to_string(), expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<String> {
        let tables = self.tables.read().await;
        match tables.auth_sessions.get(session_id) {
            Some((username, expires_at)) if *expires_at > Utc::now() => Ok(username.clone()),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables.write().await.auth_sessions.remove(session_id);
        Ok(())
    }

    async fn create_chat(&self, owner: &str, title: &str) -> PortResult<Chat> {
        let chat = Chat {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            title: title.to_string(),
            created_at: Utc::now(),
        };
        self.tables.write().await.chats.push(chat.clone());
        Ok(chat)
    }

    async fn get_chat(&self, chat_id: Uuid, owner: &str) -> PortResult<Chat> {
        let tables = self.tables.read().await;
        tables
            .chats
            .iter()
            .find(|c| c.id == chat_id && c.owner == owner)
            .cloned()
            .ok_or_else(|| PortError::NotFound("Chat not found".to_string()))
    }

    async fn list_chats(&self, owner: &str) -> PortResult<Vec<Chat>> {
        let tables = self.tables.read().await;
        Ok(tables
            .chats
            .iter()
            .filter(|c| c.owner == owner)
            .cloned()
            .collect())
    }

    async fn rename_chat(&self, chat_id: Uuid, owner: &str, title: &str) -> PortResult<Chat> {
        let mut tables = self.tables.write().await;
        let chat = tables
            .chats
            .iter_mut()
            .find(|c| c.id == chat_id && c.owner == owner)
            .ok_or_else(|| PortError::NotFound("Chat not found".to_string()))?;
        chat.title = title.to_string();
        Ok(chat.clone())
    }

    async fn delete_chat(&self, chat_id: Uuid) -> PortResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.chats.len();
        tables.chats.retain(|c| c.id != chat_id);
        Ok((before - tables.chats.len()) as u64)
    }

    async fn insert_qa_record(&self, record: QaRecord) -> PortResult<()> {
        self.tables.write().await.qa_records.push(record);
        Ok(())
    }

    async fn find_qa_by_normalized(
        &self,
        normalized: &str,
        limit: Option<usize>,
    ) -> PortResult<Vec<QaRecord>> {
        let tables = self.tables.read().await;
        let mut found = newest_first(
            tables
                .qa_records
                .iter()
                .filter(|r| r.normalized == normalized),
        );
        if let Some(limit) = limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn recent_qa_for_chat(&self, chat_id: Uuid, limit: usize) -> PortResult<Vec<QaRecord>> {
        let tables = self.tables.read().await;
        let mut found = newest_first(
            tables
                .qa_records
                .iter()
                .filter(|r| r.chat_id == Some(chat_id)),
        );
        found.truncate(limit);
        Ok(found)
    }

    async fn qa_history_for_chat(&self, chat_id: Uuid) -> PortResult<Vec<QaRecord>> {
        let tables = self.tables.read().await;
        let mut history: Vec<QaRecord> = tables
            .qa_records
            .iter()
            .filter(|r| r.chat_id == Some(chat_id))
            .cloned()
            .collect();
        history.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(history)
    }

    async fn find_qa_in_chat(
        &self,
        chat_id: Uuid,
        owner: &str,
        question: &str,
        normalized: &str,
    ) -> PortResult<Option<QaRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .qa_records
            .iter()
            .find(|r| {
                r.chat_id == Some(chat_id)
                    && r.owner == owner
                    && (r.question == question || r.normalized == normalized)
            })
            .cloned())
    }

    async fn delete_qa_records(&self, ids: &[Uuid]) -> PortResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.qa_records.len();
        tables.qa_records.retain(|r| !ids.contains(&r.id));
        Ok((before - tables.qa_records.len()) as u64)
    }

    async fn delete_qa_for_chat(&self, chat_id: Uuid) -> PortResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.qa_records.len();
        tables.qa_records.retain(|r| r.chat_id != Some(chat_id));
        Ok((before - tables.qa_records.len()) as u64)
    }

    async fn insert_document(&self, document: DocumentRecord) -> PortResult<()> {
        self.tables.write().await.documents.push(document);
        Ok(())
    }

    async fn documents_for_chat(&self, chat_id: Uuid) -> PortResult<Vec<DocumentRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .documents
            .iter()
            .filter(|d| d.chat_id == Some(chat_id) || d.is_global)
            .cloned()
            .collect())
    }

    async fn list_global_documents(&self) -> PortResult<Vec<DocumentRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .documents
            .iter()
            .filter(|d| d.is_global)
            .cloned()
            .collect())
    }

    async fn delete_documents_for_chat(&self, chat_id: Uuid) -> PortResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.documents.len();
        tables
            .documents
            .retain(|d| d.is_global || d.chat_id != Some(chat_id));
        Ok((before - tables.documents.len()) as u64)
    }
}
