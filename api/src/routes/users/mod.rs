pub mod get;

use axum::{Router, routing::get};
use util::state::AppState;

use get::list_users;

pub fn users_routes() -> Router<AppState> {
    Router::new().route("/", get(list_users))
}
