mod common;

use common::{CannedExtractor, Harness};
use configmate_core::{
    rooms::DEFAULT_CHAT_TITLE, AnswerCache, ChatRooms, DatabaseService, DeletionSummary,
    PortError,
};
use std::sync::Arc;

fn rooms(h: &Harness, extracted: &str) -> ChatRooms {
    ChatRooms::new(h.port(), Arc::new(CannedExtractor(extracted.to_string())))
}

#[tokio::test]
async fn create_rename_and_list_chats() {
    let h = Harness::new();
    let rooms = rooms(&h, "");

    let untitled = rooms.create_chat("alice", Some("   ")).await.unwrap();
    assert_eq!(untitled.title, DEFAULT_CHAT_TITLE);
    rooms.create_chat("bob", Some("Bob's chat")).await.unwrap();

    let renamed = rooms
        .rename_chat("alice", untitled.id, "  Firewall rules ")
        .await
        .unwrap();
    assert_eq!(renamed.title, "Firewall rules");

    let chats = rooms.list_chats("alice").await.unwrap();
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0].title, "Firewall rules");

    assert!(matches!(
        rooms.rename_chat("alice", untitled.id, " ").await,
        Err(PortError::InvalidInput(_))
    ));
    assert!(matches!(
        rooms.rename_chat("bob", untitled.id, "Mine now").await,
        Err(PortError::NotFound(_))
    ));
}

#[tokio::test]
async fn upload_accepts_only_pdf_and_docx() {
    let h = Harness::new();
    let rooms = rooms(&h, "  Port 22 is SSH.  ");
    let chat = rooms.create_chat("alice", None).await.unwrap();

    assert!(matches!(
        rooms.attach_document("alice", chat.id, "notes.txt", b"x").await,
        Err(PortError::InvalidInput(_))
    ));

    let stored = rooms
        .attach_document("alice", chat.id, "Manual.PDF", b"%PDF")
        .await
        .unwrap();
    assert_eq!(stored.content, "Port 22 is SSH.");
    assert!(!stored.is_global);

    let docs = h.db.documents_for_chat(chat.id).await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].filename, "Manual.PDF");
}

#[tokio::test]
async fn upload_without_text_or_to_a_foreign_chat_is_rejected() {
    let h = Harness::new();
    let chat = h.db.create_chat("alice", "Docs").await.unwrap();

    let empty = rooms(&h, " \n ");
    assert!(matches!(
        empty.attach_document("alice", chat.id, "scan.pdf", b"%PDF").await,
        Err(PortError::InvalidInput(_))
    ));

    let full = rooms(&h, "text");
    assert!(matches!(
        full.attach_document("mallory", chat.id, "plan.docx", b"PK").await,
        Err(PortError::NotFound(_))
    ));
    assert!(h.db.documents_for_chat(chat.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_cascades_but_keeps_global_documents() {
    let h = Harness::new();
    let rooms = rooms(&h, "chat manual");
    let chat = rooms.create_chat("alice", Some("Doomed")).await.unwrap();
    let keeper = rooms.create_chat("alice", Some("Keeper")).await.unwrap();

    let cache = AnswerCache::new(h.port());
    cache.record("q1", "a1", "alice", Some(chat.id)).await.unwrap();
    cache.record("q2", "a2", "alice", Some(chat.id)).await.unwrap();
    cache.record("q3", "a3", "alice", Some(keeper.id)).await.unwrap();
    rooms
        .attach_document("alice", chat.id, "manual.pdf", b"%PDF")
        .await
        .unwrap();
    rooms
        .add_global_document("kb.txt", "shared knowledge")
        .await
        .unwrap();

    let summary = rooms.delete_chat("alice", chat.id).await.unwrap();
    assert_eq!(
        summary,
        DeletionSummary {
            deleted_qas: 2,
            deleted_files: 1,
            deleted_chat: 1,
        }
    );

    assert!(matches!(
        h.db.get_chat(chat.id, "alice").await,
        Err(PortError::NotFound(_))
    ));
    assert_eq!(h.db.qa_history_for_chat(keeper.id).await.unwrap().len(), 1);
    let globals = h.db.list_global_documents().await.unwrap();
    assert_eq!(globals.len(), 1);
    assert_eq!(globals[0].filename, "kb.txt");
}

#[tokio::test]
async fn delete_of_someone_elses_chat_changes_nothing() {
    let h = Harness::new();
    let rooms = rooms(&h, "");
    let chat = rooms.create_chat("alice", None).await.unwrap();
    AnswerCache::new(h.port())
        .record("q", "a", "alice", Some(chat.id))
        .await
        .unwrap();

    assert!(matches!(
        rooms.delete_chat("bob", chat.id).await,
        Err(PortError::NotFound(_))
    ));
    assert_eq!(rooms.chat_history("alice", chat.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn blank_global_document_is_skipped() {
    let h = Harness::new();
    let rooms = rooms(&h, "");
    assert!(rooms.add_global_document("empty.txt", "  ").await.unwrap().is_none());
    assert!(h.db.list_global_documents().await.unwrap().is_empty());
}
