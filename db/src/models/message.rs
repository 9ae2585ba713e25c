use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, PaginatorTrait, QueryOrder};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A chat message. Immutable once created; belongs to exactly one room and
/// one author.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub room_id: i64,
    pub user_id: i64,

    pub kind: MessageKind,

    pub content: String,

    /// Relative path under the chat storage root, for file messages.
    pub attachment_path: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Whether the message body is plain text or references an uploaded file.
#[derive(
    Debug, Clone, PartialEq, EnumIter, DeriveActiveEnum, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "message_kind")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MessageKind {
    #[sea_orm(string_value = "text")]
    Text,

    #[sea_orm(string_value = "file")]
    File,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::room::Entity",
        from = "Column::RoomId",
        to = "super::room::Column::Id"
    )]
    Room,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Room.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DbConn,
        room_id: i64,
        user_id: i64,
        kind: MessageKind,
        content: &str,
        attachment_path: Option<&str>,
    ) -> Result<Model, DbErr> {
        let active = ActiveModel {
            room_id: Set(room_id),
            user_id: Set(user_id),
            kind: Set(kind),
            content: Set(content.to_owned()),
            attachment_path: Set(attachment_path.map(|p| p.to_owned())),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        active.insert(db).await
    }

    /// One page of a room's messages, newest first.
    pub async fn find_for_room(
        db: &DbConn,
        room_id: i64,
        page: u64,
        per_page: u64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::RoomId.eq(room_id))
            .order_by_desc(Column::CreatedAt)
            .paginate(db, per_page.max(1))
            .fetch_page(page)
            .await
    }
}
