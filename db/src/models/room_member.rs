use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

/// Membership of a user in a room. Written at registration and at room
/// creation; read-only to the notification core.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "room_members")]
pub struct Model {
    /// User ID (foreign key to `users`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,

    /// Room ID (foreign key to `rooms`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub room_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::room::Entity",
        from = "Column::RoomId",
        to = "super::room::Column::Id"
    )]
    Room,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Room.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn add(db: &DbConn, user_id: i64, room_id: i64) -> Result<Model, DbErr> {
        let active = ActiveModel {
            user_id: Set(user_id),
            room_id: Set(room_id),
        };
        active.insert(db).await
    }

    pub async fn exists(db: &DbConn, user_id: i64, room_id: i64) -> Result<bool, DbErr> {
        Ok(Entity::find_by_id((user_id, room_id)).one(db).await?.is_some())
    }
}
