use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, QueryOrder};
use serde::Serialize;

use crate::models::room_member::{
    Column as MemberColumn, Entity as MemberEntity, Model as MemberModel,
};
use crate::models::user::{Entity as UserEntity, Model as UserModel};

/// Represents a chat room in the `rooms` table.
///
/// Direct (unnamed) rooms carry `name = None`; named rooms must have a
/// unique name.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "rooms")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub name: Option<String>,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::room_member::Entity")]
    RoomMember,

    #[sea_orm(has_many = "super::message::Entity")]
    Message,
}

impl Related<super::room_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RoomMember.def()
    }
}

impl Related<super::message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Message.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(db: &DbConn, name: Option<&str>) -> Result<Model, DbErr> {
        let active = ActiveModel {
            name: Set(name.map(|n| n.to_owned())),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        active.insert(db).await
    }

    pub async fn find_by_name(db: &DbConn, name: &str) -> Result<Option<Model>, DbErr> {
        Entity::find().filter(Column::Name.eq(name)).one(db).await
    }

    /// Fetches the named room, creating it on first use. Used for the
    /// default room every registration joins.
    pub async fn find_or_create_named(db: &DbConn, name: &str) -> Result<Model, DbErr> {
        match Self::find_by_name(db, name).await? {
            Some(room) => Ok(room),
            None => Self::create(db, Some(name)).await,
        }
    }

    /// IDs of every member of the room, ascending.
    pub async fn member_ids(db: &DbConn, room_id: i64) -> Result<Vec<i64>, DbErr> {
        let members = MemberEntity::find()
            .filter(MemberColumn::RoomId.eq(room_id))
            .order_by_asc(MemberColumn::UserId)
            .all(db)
            .await?;
        Ok(members.into_iter().map(|m| m.user_id).collect())
    }

    /// Full user records of every member of the room.
    pub async fn members(db: &DbConn, room_id: i64) -> Result<Vec<UserModel>, DbErr> {
        MemberEntity::find()
            .filter(MemberColumn::RoomId.eq(room_id))
            .find_also_related(UserEntity)
            .all(db)
            .await
            .map(|rows| rows.into_iter().filter_map(|(_, user)| user).collect())
    }

    pub async fn is_member(db: &DbConn, room_id: i64, user_id: i64) -> Result<bool, DbErr> {
        MemberModel::exists(db, user_id, room_id).await
    }

    /// Rooms the user belongs to, oldest first.
    pub async fn find_for_user(db: &DbConn, user_id: i64) -> Result<Vec<Model>, DbErr> {
        let memberships = MemberEntity::find()
            .filter(MemberColumn::UserId.eq(user_id))
            .find_also_related(Entity)
            .all(db)
            .await?;
        let mut rooms: Vec<Model> = memberships
            .into_iter()
            .filter_map(|(_, room)| room)
            .collect();
        rooms.sort_by_key(|r| r.id);
        Ok(rooms)
    }

    /// Looks for an existing room whose member set equals `member_ids`
    /// exactly. `member_ids` must be sorted ascending and deduplicated.
    ///
    /// Only rooms of the first member are candidates, which keeps the scan
    /// proportional to that user's room count rather than the whole table.
    pub async fn find_with_member_set(
        db: &DbConn,
        member_ids: &[i64],
    ) -> Result<Option<Model>, DbErr> {
        let Some(first) = member_ids.first() else {
            return Ok(None);
        };
        for room in Self::find_for_user(db, *first).await? {
            let ids = Self::member_ids(db, room.id).await?;
            if ids == member_ids {
                return Ok(Some(room));
            }
        }
        Ok(None)
    }
}
