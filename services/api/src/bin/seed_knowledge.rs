//! services/api/src/bin/seed_knowledge.rs
//!
//! Loads every supported file in a folder into the global knowledge base, so
//! its text is offered as document context in every chat.
//!
//! Usage: `seed_knowledge <folder>`

use api_lib::{
    adapters::{extractor::SUPPORTED_EXTENSIONS, DbAdapter, DocumentTextExtractor},
    config::Config,
    error::ApiError,
    telemetry::init_tracing,
};
use configmate_core::{
    ports::{DatabaseService, TextExtractionService},
    rooms::{file_extension, ChatRooms},
};
use sqlx::postgres::PgPoolOptions;
use std::{path::PathBuf, sync::Arc};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let config = Config::from_env()?;
    init_tracing(config.log_level);

    let folder = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or_else(|| ApiError::BadRequest("Usage: seed_knowledge <folder>".to_string()))?;
    if !folder.is_dir() {
        return Err(ApiError::BadRequest(format!(
            "Folder not found: {}",
            folder.display()
        )));
    }
    if config.uses_memory_store() {
        return Err(ApiError::BadRequest(
            "Seeding needs a persistent DATABASE_URL".to_string(),
        ));
    }

    let db_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await?;
    let db_adapter = DbAdapter::new(db_pool);
    db_adapter.run_migrations().await?;
    let db: Arc<dyn DatabaseService> = Arc::new(db_adapter);
    let extractor = Arc::new(DocumentTextExtractor::new());
    let rooms = ChatRooms::new(db.clone(), extractor.clone());

    info!("Uploading files from folder: {}", folder.display());
    let mut entries = tokio::fs::read_dir(&folder).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let filename = entry.file_name().to_string_lossy().into_owned();
        let extension = file_extension(&filename);
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            warn!(%filename, "Skipping file with unsupported extension");
            continue;
        }

        let data = tokio::fs::read(&path).await?;
        let text = match extractor.extract_text(&data, &extension).await {
            Ok(text) => text,
            Err(e) => {
                error!(%filename, "Could not read file: {}", e);
                continue;
            }
        };

        match rooms.add_global_document(&filename, &text).await? {
            Some(_) => info!(%filename, "Uploaded into the knowledge base"),
            None => warn!(%filename, "No text content, skipped"),
        }
    }

    info!("All files uploaded. Global documents now in the store:");
    for document in db.list_global_documents().await? {
        info!(" - {} ({} chars)", document.filename, document.content.chars().count());
    }

    Ok(())
}
