use db::models::{message::Model as MessageModel, user::Model as UserModel};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct LightUser {
    pub id: i64,
    pub username: String,
}

/// Message record as delivered to clients.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: i64,
    pub room_id: i64,
    pub kind: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_path: Option<String>,
    pub created_at: String, // RFC3339
    pub user: LightUser,
}

impl Message {
    pub fn from_model(message: &MessageModel, author: &UserModel) -> Self {
        Self {
            id: message.id,
            room_id: message.room_id,
            kind: message.kind.to_string(),
            content: message.content.clone(),
            attachment_path: message.attachment_path.clone(),
            created_at: message.created_at.to_rfc3339(),
            user: LightUser {
                id: author.id,
                username: author.username.clone(),
            },
        }
    }
}
