use serde::Deserialize;

/// Client-to-server frames on the chat gateway socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatIncoming {
    /// Switch the room this connection is viewing. `prev_room_id` is the
    /// room being left, if any; no synchronous reply.
    JoinRoom {
        prev_room_id: Option<i64>,
        current_room_id: i64,
    },
    /// Keepalive ping from client (app-level).
    Ping,
}
