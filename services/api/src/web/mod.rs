pub mod auth;
pub mod chat_task;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;

pub use chat_task::chat_handler;
pub use middleware::{require_auth, Owner};
pub use rest::{
    chat_history_handler, create_chat_handler, delete_chat_handler, edit_question_handler,
    list_chats_handler, rename_chat_handler, upload_file_handler,
};

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use state::AppState;
use std::sync::Arc;

/// Builds the API router (public auth routes plus the protected chat routes).
pub fn api_router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/chat", post(chat_handler))
        .route("/chat/new", post(create_chat_handler))
        .route("/chat/list", get(list_chats_handler))
        .route("/chat/history/{chat_id}", get(chat_history_handler))
        .route("/chat/rename/{chat_id}", put(rename_chat_handler))
        .route("/chat/delete/{chat_id}", delete(delete_chat_handler))
        .route("/chat/edit_question/{chat_id}", put(edit_question_handler))
        .route("/chat/upload/{chat_id}", post(upload_file_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(app_state.config.max_upload_bytes))
        .with_state(app_state)
}
