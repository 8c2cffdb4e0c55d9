//! crates/configmate_core/src/rooms.rs
//!
//! Chat room management: create, rename, list and cascade-delete chats, and
//! attach extracted documents to them or to the global knowledge base.

use crate::{
    domain::{Chat, DocumentRecord, QaRecord},
    ports::{DatabaseService, PortError, PortResult, TextExtractionService},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_CHAT_TITLE: &str = "New chat";

/// File extensions accepted for per-chat uploads.
pub const UPLOAD_EXTENSIONS: [&str; 2] = [".pdf", ".docx"];

/// Owner recorded on documents loaded into the global knowledge base.
pub const SYSTEM_OWNER: &str = "system";

/// Counts returned by a cascading chat delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeletionSummary {
    pub deleted_qas: u64,
    pub deleted_files: u64,
    pub deleted_chat: u64,
}

#[derive(Clone)]
pub struct ChatRooms {
    db: Arc<dyn DatabaseService>,
    extractor: Arc<dyn TextExtractionService>,
}

impl ChatRooms {
    pub fn new(db: Arc<dyn DatabaseService>, extractor: Arc<dyn TextExtractionService>) -> Self {
        Self { db, extractor }
    }

    pub async fn create_chat(&self, owner: &str, title: Option<&str>) -> PortResult<Chat> {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_CHAT_TITLE);
        self.db.create_chat(owner, title).await
    }

    pub async fn list_chats(&self, owner: &str) -> PortResult<Vec<Chat>> {
        self.db.list_chats(owner).await
    }

    /// The full conversation of an owned chat, oldest first.
    pub async fn chat_history(&self, owner: &str, chat_id: Uuid) -> PortResult<Vec<QaRecord>> {
        self.db.get_chat(chat_id, owner).await?;
        self.db.qa_history_for_chat(chat_id).await
    }

    pub async fn rename_chat(&self, owner: &str, chat_id: Uuid, title: &str) -> PortResult<Chat> {
        let title = title.trim();
        if title.is_empty() {
            return Err(PortError::InvalidInput("Title must not be empty".to_string()));
        }
        self.db.rename_chat(chat_id, owner, title).await
    }

    /// Deletes an owned chat with its QA records and non-global documents.
    ///
    /// Each step is a separate store operation; a failure midway leaves the
    /// earlier deletions in place.
    pub async fn delete_chat(&self, owner: &str, chat_id: Uuid) -> PortResult<DeletionSummary> {
        self.db.get_chat(chat_id, owner).await?;

        let summary = DeletionSummary {
            deleted_qas: self.db.delete_qa_for_chat(chat_id).await?,
            deleted_files: self.db.delete_documents_for_chat(chat_id).await?,
            deleted_chat: self.db.delete_chat(chat_id).await?,
        };
        info!(
            %chat_id,
            qas = summary.deleted_qas,
            files = summary.deleted_files,
            "Deleted chat"
        );
        Ok(summary)
    }

    /// Extracts text from an uploaded `.pdf` or `.docx` and attaches it to a chat.
    pub async fn attach_document(
        &self,
        owner: &str,
        chat_id: Uuid,
        filename: &str,
        data: &[u8],
    ) -> PortResult<DocumentRecord> {
        let extension = file_extension(filename);
        if !UPLOAD_EXTENSIONS.contains(&extension.as_str()) {
            return Err(PortError::InvalidInput(
                "Only PDF and Word (.docx) files are supported".to_string(),
            ));
        }
        self.db.get_chat(chat_id, owner).await?;

        let text = self.extractor.extract_text(data, &extension).await?;
        let content = text.trim();
        if content.is_empty() {
            return Err(PortError::InvalidInput("No text found in file".to_string()));
        }

        let document = DocumentRecord {
            id: Uuid::new_v4(),
            chat_id: Some(chat_id),
            owner: owner.to_string(),
            filename: filename.to_string(),
            content: content.to_string(),
            is_global: false,
            uploaded_at: Utc::now(),
        };
        self.db.insert_document(document.clone()).await?;
        info!(%chat_id, filename, "Uploaded file saved");
        Ok(document)
    }

    /// Stores already-extracted text as a global document. Blank text is skipped.
    pub async fn add_global_document(
        &self,
        filename: &str,
        text: &str,
    ) -> PortResult<Option<DocumentRecord>> {
        let content = text.trim();
        if content.is_empty() {
            return Ok(None);
        }

        let document = DocumentRecord {
            id: Uuid::new_v4(),
            chat_id: None,
            owner: SYSTEM_OWNER.to_string(),
            filename: filename.to_string(),
            content: content.to_string(),
            is_global: true,
            uploaded_at: Utc::now(),
        };
        self.db.insert_document(document.clone()).await?;
        info!(filename, "Global document stored");
        Ok(Some(document))
    }
}

/// Lowercased extension including the leading dot, or an empty string.
pub fn file_extension(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}
