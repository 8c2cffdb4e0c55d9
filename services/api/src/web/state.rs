//! services/api/src/web/state.rs
//!
//! Defines the application state shared by every request handler.

use crate::config::Config;
use configmate_core::{
    pipeline::ChatPipeline,
    ports::{DatabaseService, QuestionAnsweringService, TextExtractionService},
    rooms::ChatRooms,
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub pipeline: ChatPipeline,
    pub rooms: ChatRooms,
}

impl AppState {
    /// Wires the core services over the given adapters.
    pub fn new(
        config: Arc<Config>,
        db: Arc<dyn DatabaseService>,
        qa_adapter: Arc<dyn QuestionAnsweringService>,
        extractor: Arc<dyn TextExtractionService>,
    ) -> Self {
        Self {
            pipeline: ChatPipeline::new(db.clone(), qa_adapter),
            rooms: ChatRooms::new(db.clone(), extractor),
            db,
            config,
        }
    }
}
