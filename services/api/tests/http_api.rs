mod common;

use api_lib::{
    config::Config,
    web::{api_router, state::AppState},
};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::{tokens, CannedExtractor, Harness, Script};
use configmate_core::DatabaseService;
use futures::StreamExt;
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tower::ServiceExt;

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "memory://".to_string(),
        log_level: tracing::Level::INFO,
        llm_api_base: "http://localhost:11434/v1".to_string(),
        llm_api_key: None,
        qa_model: "mistral".to_string(),
        cors_origin: "http://localhost:3000".to_string(),
        auth_session_days: 30,
        max_upload_bytes: 1024 * 1024,
    }
}

fn app(h: &Harness) -> Router {
    let state = AppState::new(
        Arc::new(test_config()),
        h.port(),
        h.model.clone(),
        Arc::new(CannedExtractor("manual text".to_string())),
    );
    api_router(Arc::new(state))
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

async fn login(app: &Router, username: &str) -> String {
    let credentials = json!({ "username": username, "password": "hunter2" });
    let registered = app
        .clone()
        .oneshot(json_request(Method::POST, "/auth/register", None, credentials.clone()))
        .await
        .unwrap();
    assert_eq!(registered.status(), StatusCode::CREATED);

    let logged_in = app
        .clone()
        .oneshot(json_request(Method::POST, "/auth/login", None, credentials))
        .await
        .unwrap();
    assert_eq!(logged_in.status(), StatusCode::OK);
    body_json(logged_in).await["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn history(app: &Router, token: &str, chat_id: &str) -> Vec<Value> {
    let response = app
        .clone()
        .oneshot(get(&format!("/chat/history/{chat_id}"), token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["history"]
        .as_array()
        .cloned()
        .unwrap_or_default()
}

#[tokio::test]
async fn chat_routes_require_a_session() {
    let h = Harness::new();
    let app = app(&h);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/chat/list")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_registration_and_bad_password_are_rejected() {
    let h = Harness::new();
    let app = app(&h);
    login(&app, "alice").await;

    let again = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/auth/register",
            None,
            json!({ "username": "alice", "password": "other" }),
        ))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);

    let wrong = app
        .oneshot(json_request(
            Method::POST,
            "/auth/login",
            None,
            json!({ "username": "alice", "password": "wrong" }),
        ))
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn streamed_answer_lands_in_the_chat_history() {
    let h = Harness::new();
    let app = app(&h);
    let token = login(&app, "alice").await;

    let created = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/chat/new",
            Some(&token),
            json!({ "title": "Switches" }),
        ))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let chat_id = body_json(created).await["chat"]
        .as_str()
        .unwrap()
        .to_string();

    h.model.push(tokens(&["Layer ", "two."]));
    let streamed = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/chat",
            Some(&token),
            json!({ "question": "What layer is a switch?", "chat_id": chat_id }),
        ))
        .await
        .unwrap();
    assert_eq!(streamed.status(), StatusCode::OK);
    assert_eq!(body_text(streamed).await, "Layer two.");

    // The record is written after the body closes.
    let mut turns = Vec::new();
    for _ in 0..50 {
        turns = history(&app, &token, &chat_id).await;
        if !turns.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0]["question"], "What layer is a switch?");
    assert_eq!(turns[0]["answer"], "Layer two.");

    let listed = app
        .clone()
        .oneshot(get("/chat/list", &token))
        .await
        .unwrap();
    let chats = body_json(listed).await;
    assert_eq!(chats["chats"][0]["_id"], chat_id.as_str());
    assert_eq!(chats["chats"][0]["title"], "Switches");
}

#[tokio::test]
async fn client_disconnect_stops_generation_without_saving() {
    let h = Harness::new();
    let app = app(&h);
    let token = login(&app, "alice").await;
    let created = app
        .clone()
        .oneshot(json_request(Method::POST, "/chat/new", Some(&token), json!({})))
        .await
        .unwrap();
    let chat_id = body_json(created).await["chat"]
        .as_str()
        .unwrap()
        .to_string();

    let (live_tx, live_rx) = mpsc::unbounded_channel();
    h.model.push(Script::Live(live_rx));
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/chat",
            Some(&token),
            json!({ "question": "Explain NAT in detail", "chat_id": chat_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = response.into_body().into_data_stream();
    for i in 0..3 {
        let part = format!("part{i} ");
        live_tx.send(Ok(part.clone())).unwrap();
        let chunk = body.next().await.unwrap().unwrap();
        assert_eq!(&chunk[..], part.as_bytes());
    }
    drop(body);

    for i in 3..10 {
        let _ = live_tx.send(Ok(format!("part{i} ")));
    }
    drop(live_tx);
    // Give the producer task time to settle either way.
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(h
        .db
        .find_qa_by_normalized("explain nat in detail", None)
        .await
        .unwrap()
        .is_empty());
    assert!(history(&app, &token, &chat_id).await.is_empty());
}

#[tokio::test]
async fn chat_without_chat_id_is_a_bad_request() {
    let h = Harness::new();
    let app = app(&h);
    let token = login(&app, "alice").await;

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/chat",
            Some(&token),
            json!({ "question": "orphan" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.model.calls(), 0);
}

#[tokio::test]
async fn other_users_cannot_read_or_delete_a_chat() {
    let h = Harness::new();
    let app = app(&h);
    let alice = login(&app, "alice").await;
    let bob = login(&app, "bob").await;

    let created = app
        .clone()
        .oneshot(json_request(Method::POST, "/chat/new", Some(&alice), json!({})))
        .await
        .unwrap();
    let chat_id = body_json(created).await["chat"]
        .as_str()
        .unwrap()
        .to_string();

    let peek = app
        .clone()
        .oneshot(get(&format!("/chat/history/{chat_id}"), &bob))
        .await
        .unwrap();
    assert_eq!(peek.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(peek).await["detail"], "Chat not found");

    let deleted = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri(format!("/chat/delete/{chat_id}"))
                .header(header::AUTHORIZATION, format!("Bearer {alice}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::OK);
    assert_eq!(body_json(deleted).await["deleted_chat"], 1);
}

#[tokio::test]
async fn edit_of_missing_question_returns_not_found() {
    let h = Harness::new();
    let app = app(&h);
    let token = login(&app, "alice").await;
    let created = app
        .clone()
        .oneshot(json_request(Method::POST, "/chat/new", Some(&token), json!({})))
        .await
        .unwrap();
    let chat_id = body_json(created).await["chat"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .oneshot(json_request(
            Method::PUT,
            &format!("/chat/edit_question/{chat_id}"),
            Some(&token),
            json!({ "old_question": "never asked", "new_question": "still not" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
