//! crates/configmate_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use crate::domain::{Chat, DocumentRecord, PromptMessage, QaRecord, User, UserCredentials};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::pin::Pin;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Item already exists: {0}")]
    AlreadyExists(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Incremental content fragments produced by a streaming model call.
pub type TokenStream = Pin<Box<dyn Stream<Item = PortResult<String>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The persistent store. Each method is a single atomic operation; nothing here
/// spans more than one write.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users & Auth ---
    async fn create_user(&self, username: &str, hashed_password: &str) -> PortResult<User>;

    async fn get_user_credentials(&self, username: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        username: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a live auth session to its owner identity.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<String>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Chats ---
    async fn create_chat(&self, owner: &str, title: &str) -> PortResult<Chat>;

    /// Fetches a chat only if it belongs to `owner`.
    async fn get_chat(&self, chat_id: Uuid, owner: &str) -> PortResult<Chat>;

    async fn list_chats(&self, owner: &str) -> PortResult<Vec<Chat>>;

    async fn rename_chat(&self, chat_id: Uuid, owner: &str, title: &str) -> PortResult<Chat>;

    /// Returns the number of chats removed (0 or 1).
    async fn delete_chat(&self, chat_id: Uuid) -> PortResult<u64>;

    // --- QA Records ---
    async fn insert_qa_record(&self, record: QaRecord) -> PortResult<()>;

    /// All records sharing a normalized key, newest first.
    async fn find_qa_by_normalized(
        &self,
        normalized: &str,
        limit: Option<usize>,
    ) -> PortResult<Vec<QaRecord>>;

    /// The `limit` most recent records of a chat, newest first.
    async fn recent_qa_for_chat(&self, chat_id: Uuid, limit: usize) -> PortResult<Vec<QaRecord>>;

    /// Every record of a chat, oldest first.
    async fn qa_history_for_chat(&self, chat_id: Uuid) -> PortResult<Vec<QaRecord>>;

    /// A record of `owner` in `chat_id` whose raw question equals `question`
    /// or whose normalized key equals `normalized`.
    async fn find_qa_in_chat(
        &self,
        chat_id: Uuid,
        owner: &str,
        question: &str,
        normalized: &str,
    ) -> PortResult<Option<QaRecord>>;

    async fn delete_qa_records(&self, ids: &[Uuid]) -> PortResult<u64>;

    async fn delete_qa_for_chat(&self, chat_id: Uuid) -> PortResult<u64>;

    // --- Documents ---
    async fn insert_document(&self, document: DocumentRecord) -> PortResult<()>;

    /// Documents attached to `chat_id` plus every global document, in upload order.
    async fn documents_for_chat(&self, chat_id: Uuid) -> PortResult<Vec<DocumentRecord>>;

    async fn list_global_documents(&self) -> PortResult<Vec<DocumentRecord>>;

    /// Removes the non-global documents of a chat.
    async fn delete_documents_for_chat(&self, chat_id: Uuid) -> PortResult<u64>;
}

#[async_trait]
pub trait QuestionAnsweringService: Send + Sync {
    /// Submits the role-tagged conversation as one streaming chat completion.
    async fn answer_streaming(&self, messages: &[PromptMessage]) -> PortResult<TokenStream>;
}

#[async_trait]
pub trait TextExtractionService: Send + Sync {
    /// Decodes raw file bytes into plain text. `extension` includes the dot, e.g. `.pdf`.
    async fn extract_text(&self, data: &[u8], extension: &str) -> PortResult<String>;
}
