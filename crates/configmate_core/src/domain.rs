//! crates/configmate_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A chat room owned by one user. Groups QA records and attached documents.
#[derive(Debug, Clone)]
pub struct Chat {
    pub id: Uuid,
    pub owner: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub username: String,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login/register - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub username: String,
    pub hashed_password: String,
}

/// One stored question/answer turn.
///
/// Records are never updated in place. A `chat_id` of `None` means the record
/// is not scoped to any chat.
#[derive(Debug, Clone)]
pub struct QaRecord {
    pub id: Uuid,
    pub chat_id: Option<Uuid>,
    pub owner: String,
    pub question: String,
    pub normalized: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

/// Plain text extracted from an uploaded file.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub chat_id: Option<Uuid>,
    pub owner: String,
    pub filename: String,
    pub content: String,
    pub is_global: bool,
    pub uploaded_at: DateTime<Utc>,
}

/// Who authored a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// A single role-tagged message sent to the language model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
