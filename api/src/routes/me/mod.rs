pub mod get;

use axum::{Router, routing::get};
use util::state::AppState;

use get::get_me;

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/", get(get_me))
}
