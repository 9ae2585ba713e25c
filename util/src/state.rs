//! Application state container shared across Axum route handlers and services.
//!
//! This struct holds shared resources such as the database connection, the
//! WebSocket manager, and the presence registry. It is cloned into route
//! handlers via Axum's `State<T>` extractor.

use crate::ws::{PresenceRegistry, WebSocketManager};
use sea_orm::DatabaseConnection;

/// Central application state shared across the server.
///
/// This includes:
/// - A cloned, thread-safe database connection for use with SeaORM.
/// - A global `WebSocketManager` for broadcasting and subscribing to topics.
/// - The `PresenceRegistry` tracking live sessions per user.
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    ws: WebSocketManager,
    presence: PresenceRegistry,
}

impl AppState {
    /// Creates a new `AppState` from the given parts.
    pub fn new(db: DatabaseConnection, ws: WebSocketManager, presence: PresenceRegistry) -> Self {
        Self { db, ws, presence }
    }

    /// Returns a shared reference to the internal `DatabaseConnection`.
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Returns a shared reference to the internal `WebSocketManager`.
    pub fn ws(&self) -> &WebSocketManager {
        &self.ws
    }

    /// Returns a shared reference to the internal `PresenceRegistry`.
    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    /// Returns a cloned copy of the database connection.
    ///
    /// Useful for spawned tasks that require ownership.
    pub fn db_clone(&self) -> DatabaseConnection {
        self.db.clone()
    }

    /// Returns a cloned instance of the `WebSocketManager`.
    pub fn ws_clone(&self) -> WebSocketManager {
        self.ws.clone()
    }

    /// Returns a cloned instance of the `PresenceRegistry`.
    pub fn presence_clone(&self) -> PresenceRegistry {
        self.presence.clone()
    }
}
