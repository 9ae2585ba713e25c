use serde::Serialize;
use util::ws::{WebSocketManager, user_topic};

use crate::ws::core::{envelope, event::Event};

use super::payload;

/* ------------ Events (typed, stable names) ------------ */

#[derive(Debug, Serialize)]
pub struct UnreadCountChanged {
    pub room_id: i64,
    pub count: i64,
    #[serde(skip)]
    pub user_id: i64,
}
impl Event for UnreadCountChanged {
    const NAME: &'static str = "UNREAD_COUNT_CHANGED";
    fn topic_path(&self) -> String {
        user_topic(self.user_id)
    }
}

#[derive(Debug, Serialize)]
pub struct ReceivedChat {
    #[serde(flatten)]
    pub payload: payload::Message,
    #[serde(skip)]
    pub recipient_id: i64,
}
impl Event for ReceivedChat {
    const NAME: &'static str = "RECEIVED_CHAT";
    fn topic_path(&self) -> String {
        user_topic(self.recipient_id)
    }
}

#[derive(Debug, Serialize)]
pub struct RoomCreated {
    pub room_id: i64,
    pub created_by_user_id: i64,
    #[serde(skip)]
    pub recipient_id: i64,
}
impl Event for RoomCreated {
    const NAME: &'static str = "ROOM_CREATED";
    fn topic_path(&self) -> String {
        user_topic(self.recipient_id)
    }
}

/* ------------ One-liner emit helpers ------------ */

pub async fn unread_count_changed(ws: &WebSocketManager, user_id: i64, room_id: i64, count: i64) {
    let ev = UnreadCountChanged {
        room_id,
        count,
        user_id,
    };
    envelope::emit(ws, &ev).await;
}

pub async fn received_chat(ws: &WebSocketManager, recipient_id: i64, msg: payload::Message) {
    let ev = ReceivedChat {
        payload: msg,
        recipient_id,
    };
    envelope::emit(ws, &ev).await;
}

pub async fn room_created(
    ws: &WebSocketManager,
    recipient_id: i64,
    room_id: i64,
    created_by_user_id: i64,
) {
    let ev = RoomCreated {
        room_id,
        created_by_user_id,
        recipient_id,
    };
    envelope::emit(ws, &ev).await;
}
