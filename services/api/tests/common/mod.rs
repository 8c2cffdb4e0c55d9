//! Shared fakes for the integration tests: a scripted language model and a
//! canned text extractor, both driven through the real core ports.

#![allow(dead_code)]

use api_lib::adapters::MemoryDb;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use configmate_core::{
    domain::{Chat, DocumentRecord, PromptMessage, QaRecord, User, UserCredentials},
    pipeline::ChatPipeline,
    ports::{
        DatabaseService, PortError, PortResult, QuestionAnsweringService, TextExtractionService,
        TokenStream,
    },
};
use futures::{stream, StreamExt};
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use tokio::sync::mpsc;
use uuid::Uuid;

/// What the model does on its next call.
pub enum Script {
    /// Streams these fragments, then ends normally.
    Tokens(Vec<String>),
    /// Streams these fragments, then fails mid-stream.
    FailAfter(Vec<String>, String),
    /// Streams whatever the test pushes into the channel, ending when it closes.
    Live(mpsc::UnboundedReceiver<PortResult<String>>),
    /// Fails before producing a stream.
    Refuse(String),
}

pub fn tokens(parts: &[&str]) -> Script {
    Script::Tokens(parts.iter().map(|p| p.to_string()).collect())
}

#[derive(Default)]
pub struct ScriptedModel {
    scripts: Mutex<VecDeque<Script>>,
    prompts: Mutex<Vec<Vec<PromptMessage>>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<Vec<PromptMessage>> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl QuestionAnsweringService for ScriptedModel {
    async fn answer_streaming(&self, messages: &[PromptMessage]) -> PortResult<TokenStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(messages.to_vec());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::Tokens(Vec::new()));

        match script {
            Script::Tokens(parts) => Ok(Box::pin(stream::iter(parts.into_iter().map(Ok)))),
            Script::FailAfter(parts, reason) => {
                let failure = stream::once(async move { Err(PortError::Unexpected(reason)) });
                Ok(Box::pin(
                    stream::iter(parts.into_iter().map(Ok)).chain(failure),
                ))
            }
            Script::Live(rx) => Ok(Box::pin(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            }))),
            Script::Refuse(reason) => Err(PortError::Unexpected(reason)),
        }
    }
}

/// Returns a fixed text for any supported input.
pub struct CannedExtractor(pub String);

#[async_trait]
impl TextExtractionService for CannedExtractor {
    async fn extract_text(&self, _data: &[u8], _extension: &str) -> PortResult<String> {
        Ok(self.0.clone())
    }
}

pub struct Harness {
    pub db: Arc<MemoryDb>,
    pub model: Arc<ScriptedModel>,
    pub pipeline: ChatPipeline,
}

impl Harness {
    pub fn new() -> Self {
        let db = Arc::new(MemoryDb::new());
        let model = ScriptedModel::new();
        let pipeline = ChatPipeline::new(db.clone(), model.clone());
        Self {
            db,
            model,
            pipeline,
        }
    }

    pub fn port(&self) -> Arc<dyn DatabaseService> {
        self.db.clone()
    }
}

/// A `MemoryDb` whose QA-record inserts fail, as if the store went away
/// between generation and the save. Counts the store calls an eviction pass
/// would make.
#[derive(Default)]
pub struct BrokenQaStore {
    inner: MemoryDb,
    full_key_scans: AtomicUsize,
    record_deletes: AtomicUsize,
}

impl BrokenQaStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Calls that could belong to an eviction pass.
    pub fn eviction_calls(&self) -> usize {
        self.full_key_scans.load(Ordering::SeqCst) + self.record_deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseService for BrokenQaStore {
    async fn create_user(&self, username: &str, hashed_password: &str) -> PortResult<User> {
        self.inner.create_user(username, hashed_password).await
    }

    async fn get_user_credentials(&self, username: &str) -> PortResult<UserCredentials> {
        self.inner.get_user_credentials(username).await
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        username: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.inner
            .create_auth_session(session_id, username, expires_at)
            .await
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<String> {
        self.inner.validate_auth_session(session_id).await
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.inner.delete_auth_session(session_id).await
    }

    async fn create_chat(&self, owner: &str, title: &str) -> PortResult<Chat> {
        self.inner.create_chat(owner, title).await
    }

    async fn get_chat(&self, chat_id: Uuid, owner: &str) -> PortResult<Chat> {
        self.inner.get_chat(chat_id, owner).await
    }

    async fn list_chats(&self, owner: &str) -> PortResult<Vec<Chat>> {
        self.inner.list_chats(owner).await
    }

    async fn rename_chat(&self, chat_id: Uuid, owner: &str, title: &str) -> PortResult<Chat> {
        self.inner.rename_chat(chat_id, owner, title).await
    }

    async fn delete_chat(&self, chat_id: Uuid) -> PortResult<u64> {
        self.inner.delete_chat(chat_id).await
    }

    async fn insert_qa_record(&self, _record: QaRecord) -> PortResult<()> {
        Err(PortError::Unexpected("connection refused".to_string()))
    }

    async fn find_qa_by_normalized(
        &self,
        normalized: &str,
        limit: Option<usize>,
    ) -> PortResult<Vec<QaRecord>> {
        if limit.is_none() {
            self.full_key_scans.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.find_qa_by_normalized(normalized, limit).await
    }

    async fn recent_qa_for_chat(&self, chat_id: Uuid, limit: usize) -> PortResult<Vec<QaRecord>> {
        self.inner.recent_qa_for_chat(chat_id, limit).await
    }

    async fn qa_history_for_chat(&self, chat_id: Uuid) -> PortResult<Vec<QaRecord>> {
        self.inner.qa_history_for_chat(chat_id).await
    }

    async fn find_qa_in_chat(
        &self,
        chat_id: Uuid,
        owner: &str,
        question: &str,
        normalized: &str,
    ) -> PortResult<Option<QaRecord>> {
        self.inner
            .find_qa_in_chat(chat_id, owner, question, normalized)
            .await
    }

    async fn delete_qa_records(&self, ids: &[Uuid]) -> PortResult<u64> {
        self.record_deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_qa_records(ids).await
    }

    async fn delete_qa_for_chat(&self, chat_id: Uuid) -> PortResult<u64> {
        self.inner.delete_qa_for_chat(chat_id).await
    }

    async fn insert_document(&self, document: DocumentRecord) -> PortResult<()> {
        self.inner.insert_document(document).await
    }

    async fn documents_for_chat(&self, chat_id: Uuid) -> PortResult<Vec<DocumentRecord>> {
        self.inner.documents_for_chat(chat_id).await
    }

    async fn list_global_documents(&self) -> PortResult<Vec<DocumentRecord>> {
        self.inner.list_global_documents().await
    }

    async fn delete_documents_for_chat(&self, chat_id: Uuid) -> PortResult<u64> {
        self.inner.delete_documents_for_chat(chat_id).await
    }
}
