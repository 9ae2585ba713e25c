use axum::{Router, routing::get};
use util::state::AppState;

pub mod emit;
pub mod gateway;
pub mod payload;
pub mod types;

use gateway::chat_gateway_handler;

pub fn ws_chat_routes() -> Router<AppState> {
    Router::new().route("/", get(chat_gateway_handler))
}
