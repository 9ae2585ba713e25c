//! Single-socket chat gateway.
//!
//! One socket per connection. On admission the connection is registered in
//! the presence registry and subscribed to the user's personal broadcast
//! group; `join_room` frames then switch which room group the socket pumps,
//! update the session's current room, and reset the unread counter for the
//! joined room. The socket's presence entry is removed only when this
//! connection's own close fires.

use axum::{
    Extension,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use sea_orm::EntityTrait;
use serde_json::json;
use std::collections::HashMap;
use util::state::AppState;
use util::ws::{Session, room_topic, user_topic};

use crate::auth::AuthUser;
use crate::services::notifications::{self, NotificationError};

use super::types::ChatIncoming;

pub async fn chat_gateway_handler(
    ws: WebSocketUpgrade,
    State(app): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve(socket, app, user))
}

struct Pumps {
    inner: HashMap<String, tokio::task::JoinHandle<()>>,
}

impl Pumps {
    fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    fn leave(&mut self, path: &str) {
        if let Some(handle) = self.inner.remove(path) {
            handle.abort();
        }
    }
}

async fn serve(socket: WebSocket, app: AppState, user: AuthUser) {
    let user_id = user.0.sub;
    let (mut sink, mut rx) = socket.split();

    let (tx_out, mut rx_out) = tokio::sync::mpsc::channel::<Message>(256);
    let writer = tokio::spawn(async move {
        while let Some(m) = rx_out.recv().await {
            if sink.send(m).await.is_err() {
                break;
            }
        }
    });

    let ws = app.ws_clone();
    let db = app.db_clone();
    let presence = app.presence_clone();

    // Admission: the auth layer has already verified the credential, so the
    // connection may enter the registry.
    let connection_id = presence.next_connection_id();
    presence.register(Session::new(connection_id, user_id));
    tracing::info!(user_id, connection_id, "Chat connection admitted");

    let spawn_pump = |path: String| {
        let ws = ws.clone();
        let tx_out = tx_out.clone();
        async move {
            let mut brx = ws.subscribe(&path).await;
            tokio::spawn(async move {
                while let Ok(text) = brx.recv().await {
                    if tx_out.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
            })
        }
    };

    let mut pumps = Pumps::new();

    // Personal channel first, so events addressed to this user arrive even
    // before the first join_room.
    let personal = user_topic(user_id);
    let pump = spawn_pump(personal.clone()).await;
    pumps.inner.insert(personal, pump);

    let ready = json!({ "type": "ready" }).to_string();
    let _ = tx_out.send(Message::Text(ready.into())).await;

    while let Some(Ok(frame)) = rx.next().await {
        match frame {
            Message::Text(txt) => match serde_json::from_str::<ChatIncoming>(txt.as_str()) {
                Ok(ChatIncoming::Ping) => {
                    let pong = json!({ "type": "pong" }).to_string();
                    let _ = tx_out.send(Message::Text(pong.into())).await;
                }

                Ok(ChatIncoming::JoinRoom {
                    prev_room_id,
                    current_room_id,
                }) => {
                    let room = match db::models::Room::find_by_id(current_room_id).one(&db).await
                    {
                        Ok(room) => room,
                        Err(e) => {
                            tracing::warn!(user_id, current_room_id, error = %e, "Room lookup failed on join");
                            let _ = tx_out
                                .send(error_frame("internal", "Failed to look up room"))
                                .await;
                            continue;
                        }
                    };
                    if room.is_none() {
                        let _ = tx_out.send(error_frame("not_found", "Room not found")).await;
                        continue;
                    }

                    match db::models::room::Model::is_member(&db, current_room_id, user_id).await
                    {
                        Ok(true) => {}
                        Ok(false) => {
                            let _ = tx_out
                                .send(error_frame("forbidden", "Not a member of this room"))
                                .await;
                            continue;
                        }
                        Err(e) => {
                            tracing::warn!(user_id, current_room_id, error = %e, "Membership check failed on join");
                            let _ = tx_out
                                .send(error_frame("internal", "Failed to check membership"))
                                .await;
                            continue;
                        }
                    }

                    if let Some(prev) = prev_room_id {
                        pumps.leave(&room_topic(prev));
                    }

                    let path = room_topic(current_room_id);
                    if !pumps.inner.contains_key(&path) {
                        let pump = spawn_pump(path.clone()).await;
                        pumps.inner.insert(path, pump);
                    }

                    if !presence.set_current_room(connection_id, current_room_id) {
                        // Disconnect raced the join; the socket is on its way out.
                        break;
                    }

                    match notifications::reset_on_join(&app, user_id, current_room_id).await {
                        Ok(()) => {}
                        Err(e @ NotificationError::MissingCounter { .. }) => {
                            tracing::warn!(user_id, current_room_id, error = %e, "Integrity fault on join");
                            let _ = tx_out
                                .send(error_frame("integrity", "Unread counter missing for room"))
                                .await;
                        }
                        Err(e) => {
                            tracing::warn!(user_id, current_room_id, error = %e, "Unread reset failed on join");
                            let _ = tx_out
                                .send(error_frame("internal", "Failed to reset unread counter"))
                                .await;
                        }
                    }
                }

                Err(e) => {
                    let _ = tx_out
                        .send(error_frame("bad_request", &format!("invalid frame: {e}")))
                        .await;
                }
            },

            Message::Ping(b) => {
                let _ = tx_out.send(Message::Pong(b)).await;
            }
            Message::Close(_) => break,
            Message::Pong(_) | Message::Binary(_) => {}
        }
    }

    // Cleanup: this connection's own disconnect removes its presence entry;
    // a newer session of the same user is left untouched.
    presence.unregister(connection_id);
    for (_, handle) in pumps.inner.into_iter() {
        handle.abort();
    }
    drop(spawn_pump);
    drop(tx_out);
    let _ = writer.await;
    tracing::info!(user_id, connection_id, "Chat connection closed");
}

fn error_frame(code: &str, message: &str) -> Message {
    let body = json!({ "type": "error", "code": code, "message": message }).to_string();
    Message::Text(body.into())
}
