use axum::{Router, middleware::from_fn};
use util::state::AppState;

use crate::{auth::guards::allow_authenticated, ws::chat::ws_chat_routes};

pub mod chat;
pub mod core;

pub fn ws_routes(app_state: AppState) -> Router {
    Router::new()
        .nest("/chat", ws_chat_routes())
        .route_layer(from_fn(allow_authenticated))
        .with_state(app_state)
}
