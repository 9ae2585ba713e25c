//! # auth Routes Module
//!
//! This module defines and wires up routes for the `/auth` endpoint group.
//!
//! ## Structure
//! - `post.rs` — POST handlers (register, login)
//!
//! ## Usage
//! The `auth_routes()` function returns a `Router` which is nested under
//! `/auth` in the main application.

pub mod post;

use axum::{Router, routing::post};
use util::state::AppState;

use post::{login, register};

/// Builds the `/auth` route group, mapping HTTP methods to handlers.
///
/// - `POST /auth/register` → `register`
/// - `POST /auth/login` → `login`
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}
