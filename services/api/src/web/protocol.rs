//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the browser client and the API
//! server. The chat answer itself is streamed as raw `text/plain` tokens and is
//! not part of these types.

use chrono::{DateTime, Utc};
use configmate_core::{domain::QaRecord, rooms::DeletionSummary, Chat};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Payloads Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// A question for the chat stream endpoint.
#[derive(Deserialize, Debug, ToSchema)]
pub struct ChatIn {
    pub question: String,
    /// The chat this question belongs to. Required.
    pub chat_id: Option<Uuid>,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct CreateChatIn {
    pub title: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct RenameChatIn {
    pub title: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct EditQuestionIn {
    pub old_question: String,
    pub new_question: String,
}

//=========================================================================================
// Payloads Sent FROM the Server TO the Client (Browser)
//=========================================================================================

#[derive(Serialize, Debug, ToSchema)]
pub struct CreateChatResponse {
    pub chat: Uuid,
    pub title: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ChatSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl From<Chat> for ChatSummary {
    fn from(chat: Chat) -> Self {
        Self {
            id: chat.id,
            title: chat.title,
            created_at: chat.created_at,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ChatListResponse {
    pub chats: Vec<ChatSummary>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct HistoryTurn {
    pub question: String,
    pub answer: String,
}

impl From<QaRecord> for HistoryTurn {
    fn from(record: QaRecord) -> Self {
        Self {
            question: record.question,
            answer: record.answer,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ChatHistoryResponse {
    pub history: Vec<HistoryTurn>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct DeleteChatResponse {
    pub msg: String,
    pub deleted_qas: u64,
    pub deleted_files: u64,
    pub deleted_chat: u64,
}

impl From<DeletionSummary> for DeleteChatResponse {
    fn from(summary: DeletionSummary) -> Self {
        Self {
            msg: "Chat and related data deleted successfully".to_string(),
            deleted_qas: summary.deleted_qas,
            deleted_files: summary.deleted_files,
            deleted_chat: summary.deleted_chat,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct EditQuestionResponse {
    pub msg: String,
    pub answer: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct MessageResponse {
    pub msg: String,
}
