//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the chat REST endpoints and the master
//! definition for the OpenAPI specification.

use crate::{
    error::ApiError,
    web::{
        auth, chat_task,
        middleware::Owner,
        protocol::{
            ChatHistoryResponse, ChatIn, ChatListResponse, ChatSummary, CreateChatIn,
            CreateChatResponse, DeleteChatResponse, EditQuestionIn, EditQuestionResponse,
            HistoryTurn, MessageResponse, RenameChatIn,
        },
        state::AppState,
    },
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use std::sync::Arc;
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        create_chat_handler,
        list_chats_handler,
        chat_history_handler,
        chat_task::chat_handler,
        rename_chat_handler,
        delete_chat_handler,
        edit_question_handler,
        upload_file_handler,
    ),
    components(
        schemas(
            auth::RegisterRequest, auth::LoginRequest, auth::LoginResponse,
            ChatIn, CreateChatIn, CreateChatResponse, ChatSummary, ChatListResponse,
            HistoryTurn, ChatHistoryResponse, RenameChatIn, DeleteChatResponse,
            EditQuestionIn, EditQuestionResponse, MessageResponse,
        )
    ),
    tags(
        (name = "ConfigMate API", description = "Chat with cached answers and document context.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Create a new, empty chat.
#[utoipa::path(
    post,
    path = "/chat/new",
    request_body(content = CreateChatIn, description = "Optional title"),
    responses(
        (status = 201, description = "Chat created", body = CreateChatResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn create_chat_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(owner): Extension<Owner>,
    payload: Option<Json<CreateChatIn>>,
) -> Result<impl IntoResponse, ApiError> {
    let title = payload.and_then(|Json(p)| p.title);
    let chat = app_state
        .rooms
        .create_chat(&owner.0, title.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateChatResponse {
            chat: chat.id,
            title: chat.title,
        }),
    ))
}

/// List the caller's chats.
#[utoipa::path(
    get,
    path = "/chat/list",
    responses(
        (status = 200, description = "The caller's chats", body = ChatListResponse)
    )
)]
pub async fn list_chats_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(owner): Extension<Owner>,
) -> Result<Json<ChatListResponse>, ApiError> {
    let chats = app_state.rooms.list_chats(&owner.0).await?;
    Ok(Json(ChatListResponse {
        chats: chats.into_iter().map(ChatSummary::from).collect(),
    }))
}

/// Full question/answer history of a chat, oldest first.
#[utoipa::path(
    get,
    path = "/chat/history/{chat_id}",
    params(("chat_id" = Uuid, Path, description = "The chat to read")),
    responses(
        (status = 200, description = "Chat history", body = ChatHistoryResponse),
        (status = 404, description = "Chat not found")
    )
)]
pub async fn chat_history_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(owner): Extension<Owner>,
    Path(chat_id): Path<Uuid>,
) -> Result<Json<ChatHistoryResponse>, ApiError> {
    let history = app_state.rooms.chat_history(&owner.0, chat_id).await?;
    Ok(Json(ChatHistoryResponse {
        history: history.into_iter().map(HistoryTurn::from).collect(),
    }))
}

/// Rename a chat.
#[utoipa::path(
    put,
    path = "/chat/rename/{chat_id}",
    params(("chat_id" = Uuid, Path, description = "The chat to rename")),
    request_body = RenameChatIn,
    responses(
        (status = 200, description = "Chat renamed", body = ChatSummary),
        (status = 400, description = "Empty title"),
        (status = 404, description = "Chat not found")
    )
)]
pub async fn rename_chat_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(owner): Extension<Owner>,
    Path(chat_id): Path<Uuid>,
    Json(data): Json<RenameChatIn>,
) -> Result<Json<ChatSummary>, ApiError> {
    let chat = app_state
        .rooms
        .rename_chat(&owner.0, chat_id, &data.title)
        .await?;
    Ok(Json(chat.into()))
}

/// Delete a chat together with its history and attached files.
#[utoipa::path(
    delete,
    path = "/chat/delete/{chat_id}",
    params(("chat_id" = Uuid, Path, description = "The chat to delete")),
    responses(
        (status = 200, description = "Chat deleted", body = DeleteChatResponse),
        (status = 404, description = "Chat not found")
    )
)]
pub async fn delete_chat_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(owner): Extension<Owner>,
    Path(chat_id): Path<Uuid>,
) -> Result<Json<DeleteChatResponse>, ApiError> {
    let summary = app_state.rooms.delete_chat(&owner.0, chat_id).await?;
    Ok(Json(summary.into()))
}

/// Edit a previous question and get a freshly generated answer.
#[utoipa::path(
    put,
    path = "/chat/edit_question/{chat_id}",
    params(("chat_id" = Uuid, Path, description = "The chat containing the question")),
    request_body = EditQuestionIn,
    responses(
        (status = 200, description = "Question re-answered", body = EditQuestionResponse),
        (status = 404, description = "Question not found"),
        (status = 500, description = "Model did not return an answer")
    )
)]
pub async fn edit_question_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(owner): Extension<Owner>,
    Path(chat_id): Path<Uuid>,
    Json(data): Json<EditQuestionIn>,
) -> Result<Json<EditQuestionResponse>, ApiError> {
    let answer = app_state
        .pipeline
        .edit_question(&owner.0, chat_id, &data.old_question, &data.new_question)
        .await?;

    Ok(Json(EditQuestionResponse {
        msg: "Question updated and re-answered successfully".to_string(),
        answer,
    }))
}

/// Attach a PDF or Word document to a chat.
///
/// Accepts a multipart/form-data request with a single file part.
#[utoipa::path(
    post,
    path = "/chat/upload/{chat_id}",
    params(("chat_id" = Uuid, Path, description = "The chat to attach the file to")),
    request_body(content_type = "multipart/form-data", description = "The .pdf or .docx file to upload."),
    responses(
        (status = 200, description = "File stored", body = MessageResponse),
        (status = 400, description = "Unsupported file type or no text found"),
        (status = 404, description = "Chat not found")
    )
)]
pub async fn upload_file_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(owner): Extension<Owner>,
    Path(chat_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<MessageResponse>, ApiError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart data: {}", e)))?
        .ok_or_else(|| ApiError::BadRequest("Multipart form must include a file".to_string()))?;

    let filename = field
        .file_name()
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest("Uploaded part has no filename".to_string()))?;
    let data = field
        .bytes()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read file bytes: {}", e)))?;

    let document = app_state
        .rooms
        .attach_document(&owner.0, chat_id, &filename, &data)
        .await?;

    Ok(Json(MessageResponse {
        msg: format!("File '{}' saved successfully", document.filename),
    }))
}
