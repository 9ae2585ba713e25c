//! HTTP route entry point for `/api/...`.
//!
//! Route groups include:
//! - `/health` → Health check endpoint (public)
//! - `/auth` → Authentication endpoints (register, login, public)
//! - `/users` → Contact listing (authenticated)
//! - `/me` → Caller's profile with rooms and unread counts (authenticated)
//! - `/rooms` → Room creation and message ingestion/history (authenticated)

use crate::auth::guards::allow_authenticated;
use crate::routes::{
    auth::auth_routes, health::health_routes, me::me_routes, rooms::rooms_routes,
    users::users_routes,
};
use axum::{Router, middleware::from_fn};
use util::state::AppState;

pub mod auth;
pub mod common;
pub mod health;
pub mod me;
pub mod rooms;
pub mod users;

/// Builds the complete application router for all HTTP endpoints.
///
/// The `/auth` and `/health` groups are public; everything else requires a
/// verified bearer token.
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .nest("/health", health_routes())
        .nest("/auth", auth_routes())
        .nest(
            "/users",
            users_routes().route_layer(from_fn(allow_authenticated)),
        )
        .nest("/me", me_routes().route_layer(from_fn(allow_authenticated)))
        .nest(
            "/rooms",
            rooms_routes().route_layer(from_fn(allow_authenticated)),
        )
        .with_state(app_state)
}
