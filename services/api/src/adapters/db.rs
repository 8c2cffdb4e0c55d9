//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use configmate_core::domain::{Chat, DocumentRecord, QaRecord, User, UserCredentials};
use configmate_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Row Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRow {
    username: String,
    hashed_password: String,
    created_at: DateTime<Utc>,
}
impl UserRow {
    fn to_domain(self) -> User {
        User {
            username: self.username,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ChatRow {
    id: Uuid,
    owner: String,
    title: String,
    created_at: DateTime<Utc>,
}
impl ChatRow {
    fn to_domain(self) -> Chat {
        Chat {
            id: self.id,
            owner: self.owner,
            title: self.title,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct QaRow {
    id: Uuid,
    chat_id: Option<Uuid>,
    owner: String,
    question: String,
    normalized: String,
    answer: String,
    created_at: DateTime<Utc>,
}
impl QaRow {
    fn to_domain(self) -> QaRecord {
        QaRecord {
            id: self.id,
            chat_id: self.chat_id,
            owner: self.owner,
            question: self.question,
            normalized: self.normalized,
            answer: self.answer,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct DocumentRow {
    id: Uuid,
    chat_id: Option<Uuid>,
    owner: String,
    filename: String,
    content: String,
    is_global: bool,
    uploaded_at: DateTime<Utc>,
}
impl DocumentRow {
    fn to_domain(self) -> DocumentRecord {
        DocumentRecord {
            id: self.id,
            chat_id: self.chat_id,
            owner: self.owner,
            filename: self.filename,
            content: self.content,
            is_global: self.is_global,
            uploaded_at: self.uploaded_at,
        }
    }
}

const QA_COLUMNS: &str = "id, chat_id, owner, question, normalized, answer, created_at";
const DOCUMENT_COLUMNS: &str = "id, chat_id, owner, filename, content, is_global, uploaded_at";

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, username: &str, hashed_password: &str) -> PortResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (username, hashed_password) VALUES ($1, $2)
             ON CONFLICT (username) DO NOTHING
             RETURNING username, hashed_password, created_at",
        )
        .bind(username)
        .bind(hashed_password)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        row.map(UserRow::to_domain)
            .ok_or_else(|| PortError::AlreadyExists("Username already exists".to_string()))
    }

    async fn get_user_credentials(&self, username: &str) -> PortResult<UserCredentials> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT username, hashed_password, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", username)),
            _ => unexpected(e),
        })?;

        Ok(UserCredentials {
            username: row.username,
            hashed_password: row.hashed_password,
        })
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        username: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, username, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(username)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<String> {
        let username: Option<String> = sqlx::query_scalar(
            "SELECT username FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        username.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_chat(&self, owner: &str, title: &str) -> PortResult<Chat> {
        let row = sqlx::query_as::<_, ChatRow>(
            "INSERT INTO chats (id, owner, title) VALUES ($1, $2, $3)
             RETURNING id, owner, title, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(title)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(row.to_domain())
    }

    async fn get_chat(&self, chat_id: Uuid, owner: &str) -> PortResult<Chat> {
        let row = sqlx::query_as::<_, ChatRow>(
            "SELECT id, owner, title, created_at FROM chats WHERE id = $1 AND owner = $2",
        )
        .bind(chat_id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        row.map(ChatRow::to_domain)
            .ok_or_else(|| PortError::NotFound("Chat not found".to_string()))
    }

    async fn list_chats(&self, owner: &str) -> PortResult<Vec<Chat>> {
        let rows = sqlx::query_as::<_, ChatRow>(
            "SELECT id, owner, title, created_at FROM chats WHERE owner = $1 ORDER BY created_at ASC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(rows.into_iter().map(ChatRow::to_domain).collect())
    }

    async fn rename_chat(&self, chat_id: Uuid, owner: &str, title: &str) -> PortResult<Chat> {
        let row = sqlx::query_as::<_, ChatRow>(
            "UPDATE chats SET title = $3 WHERE id = $1 AND owner = $2
             RETURNING id, owner, title, created_at",
        )
        .bind(chat_id)
        .bind(owner)
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        row.map(ChatRow::to_domain)
            .ok_or_else(|| PortError::NotFound("Chat not found".to_string()))
    }

    async fn delete_chat(&self, chat_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM chats WHERE id = $1")
            .bind(chat_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn insert_qa_record(&self, record: QaRecord) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO qa_records (id, chat_id, owner, question, normalized, answer, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(record.id)
        .bind(record.chat_id)
        .bind(record.owner)
        .bind(record.question)
        .bind(record.normalized)
        .bind(record.answer)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn find_qa_by_normalized(
        &self,
        normalized: &str,
        limit: Option<usize>,
    ) -> PortResult<Vec<QaRecord>> {
        // A NULL limit means no limit in Postgres.
        let rows = sqlx::query_as::<_, QaRow>(&format!(
            "SELECT {QA_COLUMNS} FROM qa_records WHERE normalized = $1
             ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(normalized)
        .bind(limit.map(|l| l as i64))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(rows.into_iter().map(QaRow::to_domain).collect())
    }

    async fn recent_qa_for_chat(&self, chat_id: Uuid, limit: usize) -> PortResult<Vec<QaRecord>> {
        let rows = sqlx::query_as::<_, QaRow>(&format!(
            "SELECT {QA_COLUMNS} FROM qa_records WHERE chat_id = $1
             ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(chat_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(rows.into_iter().map(QaRow::to_domain).collect())
    }

    async fn qa_history_for_chat(&self, chat_id: Uuid) -> PortResult<Vec<QaRecord>> {
        let rows = sqlx::query_as::<_, QaRow>(&format!(
            "SELECT {QA_COLUMNS} FROM qa_records WHERE chat_id = $1 ORDER BY created_at ASC"
        ))
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(rows.into_iter().map(QaRow::to_domain).collect())
    }

    async fn find_qa_in_chat(
        &self,
        chat_id: Uuid,
        owner: &str,
        question: &str,
        normalized: &str,
    ) -> PortResult<Option<QaRecord>> {
        let row = sqlx::query_as::<_, QaRow>(&format!(
            "SELECT {QA_COLUMNS} FROM qa_records
             WHERE chat_id = $1 AND owner = $2 AND (question = $3 OR normalized = $4)
             LIMIT 1"
        ))
        .bind(chat_id)
        .bind(owner)
        .bind(question)
        .bind(normalized)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(row.map(QaRow::to_domain))
    }

    async fn delete_qa_records(&self, ids: &[Uuid]) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM qa_records WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn delete_qa_for_chat(&self, chat_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM qa_records WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn insert_document(&self, document: DocumentRecord) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO documents (id, chat_id, owner, filename, content, is_global, uploaded_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(document.id)
        .bind(document.chat_id)
        .bind(document.owner)
        .bind(document.filename)
        .bind(document.content)
        .bind(document.is_global)
        .bind(document.uploaded_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn documents_for_chat(&self, chat_id: Uuid) -> PortResult<Vec<DocumentRecord>> {
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents
             WHERE chat_id = $1 OR is_global
             ORDER BY uploaded_at ASC"
        ))
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(rows.into_iter().map(DocumentRow::to_domain).collect())
    }

    async fn list_global_documents(&self) -> PortResult<Vec<DocumentRecord>> {
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE is_global ORDER BY uploaded_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(rows.into_iter().map(DocumentRow::to_domain).collect())
    }

    async fn delete_documents_for_chat(&self, chat_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM documents WHERE chat_id = $1 AND NOT is_global")
            .bind(chat_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }
}
