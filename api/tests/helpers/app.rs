use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use std::sync::Once;
use tower::ServiceExt;
use util::{
    state::AppState,
    ws::{PresenceRegistry, WebSocketManager},
};

static INIT: Once = Once::new();

/// Required configuration for the test process, provided before the lazy
/// `AppConfig` initializes.
pub fn init_test_env() {
    INIT.call_once(|| {
        // SAFETY: runs once, before any config read in this process.
        unsafe {
            std::env::set_var("APP_ENV", "test");
            std::env::set_var("JWT_SECRET", "test-secret");
            std::env::set_var("JWT_DURATION_MINUTES", "60");
            std::env::set_var("DATABASE_PATH", "sqlite::memory:");
            std::env::set_var("CHAT_STORAGE_ROOT", "./tmp/chat_storage");
        }
    });
}

/// Fresh app over an in-memory database. The returned state shares the same
/// broadcast manager and presence registry as the router, so HTTP calls and
/// WebSocket connections observe each other.
pub async fn make_test_app() -> (Router, AppState) {
    init_test_env();

    let db = db::test_utils::setup_test_db().await;
    let state = AppState::new(db, WebSocketManager::new(), PresenceRegistry::new());

    let router = Router::new()
        .nest("/api", api::routes::routes(state.clone()))
        .nest("/ws", api::ws::ws_routes(state.clone()));

    (router, state)
}

/// Registers a user and returns `(user_id, token)`.
pub async fn register_user(app: &Router, username: &str) -> (i64, String) {
    let (status, body) = post_json(
        app,
        "/api/auth/register",
        None,
        json!({
            "username": username,
            "email": format!("{username}@test.com"),
            "password": "password123",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    let id = body["data"]["id"].as_i64().unwrap();
    let token = body["data"]["token"].as_str().unwrap().to_owned();
    (id, token)
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();

    send(app, req).await
}

pub async fn get_json(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let req = builder.body(Body::empty()).unwrap();

    send(app, req).await
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// The caller's unread count for `room_id`, read back through `/api/me`.
pub async fn unread_count(app: &Router, token: &str, room_id: i64) -> i64 {
    let (status, body) = get_json(app, "/api/me", Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["rooms"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["id"].as_i64() == Some(room_id))
        .unwrap_or_else(|| panic!("room {room_id} not in profile"))["unread_count"]
        .as_i64()
        .unwrap()
}
