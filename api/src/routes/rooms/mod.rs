//! # rooms Routes Module
//!
//! Room creation, message ingestion (text and file), and message history.
//!
//! ## Structure
//! - `post.rs` — POST handlers (create room, send message, upload file message)
//! - `get.rs` — GET handlers (message history)

pub mod get;
pub mod post;

use axum::{
    Router,
    routing::{get, post},
};
use util::state::AppState;

use get::list_messages;
use post::{create_room, send_file_message, send_message};

/// Builds the `/rooms` route group, mapping HTTP methods to handlers.
///
/// - `POST /rooms` → `create_room`
/// - `GET  /rooms/{room_id}/messages` → `list_messages`
/// - `POST /rooms/{room_id}/messages` → `send_message`
/// - `POST /rooms/{room_id}/messages/files` → `send_file_message`
pub fn rooms_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_room))
        .route(
            "/{room_id}/messages",
            get(list_messages).post(send_message),
        )
        .route("/{room_id}/messages/files", post(send_file_message))
}
