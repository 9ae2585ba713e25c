use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveValue::Set, QueryOrder};
use serde::Serialize;

/// Per-(user, room) unread message counter.
///
/// A row exists for every `room_members` row and is created in the same
/// operation that establishes the membership. Both mutations below are
/// single UPDATE statements so concurrent messages into one room cannot
/// lose increments; callers must treat `rows_affected == 0` as a missing
/// row, which for an existing membership is a data-integrity fault rather
/// than a normal not-found.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "unread_counters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,

    #[sea_orm(primary_key, auto_increment = false)]
    pub room_id: i64,

    /// Non-negative; reset to 0 on join/author/viewing, +1 otherwise.
    pub count: i64,

    pub updated_at: DateTime<Utc>,
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
    /// Creates the counter row at zero. Called wherever a membership is
    /// established.
    pub async fn create(db: &DbConn, user_id: i64, room_id: i64) -> Result<Model, DbErr> {
        let active = ActiveModel {
            user_id: Set(user_id),
            room_id: Set(room_id),
            count: Set(0),
            updated_at: Set(Utc::now()),
        };
        active.insert(db).await
    }

    pub async fn get(db: &DbConn, user_id: i64, room_id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id((user_id, room_id)).one(db).await
    }

    /// Resets the counter to zero in a single UPDATE.
    ///
    /// Returns the number of affected rows; 0 means the row does not exist.
    pub async fn reset(db: &DbConn, user_id: i64, room_id: i64) -> Result<u64, DbErr> {
        let res = Entity::update_many()
            .col_expr(Column::Count, Expr::value(0i64))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::UserId.eq(user_id))
            .filter(Column::RoomId.eq(room_id))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }

    /// Increments the counter by one in a single UPDATE (`count = count + 1`),
    /// never read-then-write.
    ///
    /// Returns the number of affected rows; 0 means the row does not exist.
    pub async fn increment(db: &DbConn, user_id: i64, room_id: i64) -> Result<u64, DbErr> {
        let res = Entity::update_many()
            .col_expr(Column::Count, Expr::col(Column::Count).add(1))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::UserId.eq(user_id))
            .filter(Column::RoomId.eq(room_id))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }

    /// All counters belonging to a user, for the profile payload.
    pub async fn find_for_user(db: &DbConn, user_id: i64) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .order_by_asc(Column::RoomId)
            .all(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{room::Model as RoomModel, user::Model as UserModel};
    use crate::test_utils::setup_test_db;

    async fn seed(db: &DbConn) -> (i64, i64) {
        let user = UserModel::create(db, "alice", "alice@test.com", "password123")
            .await
            .unwrap();
        let room = RoomModel::create(db, Some("general")).await.unwrap();
        crate::models::room_member::Model::add(db, user.id, room.id)
            .await
            .unwrap();
        (user.id, room.id)
    }

    #[tokio::test]
    async fn create_initializes_at_zero() {
        let db = setup_test_db().await;
        let (user_id, room_id) = seed(&db).await;

        Model::create(&db, user_id, room_id).await.unwrap();
        let counter = Model::get(&db, user_id, room_id).await.unwrap().unwrap();
        assert_eq!(counter.count, 0);
    }

    #[tokio::test]
    async fn increment_and_reset_roundtrip() {
        let db = setup_test_db().await;
        let (user_id, room_id) = seed(&db).await;
        Model::create(&db, user_id, room_id).await.unwrap();

        assert_eq!(Model::increment(&db, user_id, room_id).await.unwrap(), 1);
        assert_eq!(Model::increment(&db, user_id, room_id).await.unwrap(), 1);
        let counter = Model::get(&db, user_id, room_id).await.unwrap().unwrap();
        assert_eq!(counter.count, 2);

        assert_eq!(Model::reset(&db, user_id, room_id).await.unwrap(), 1);
        let counter = Model::get(&db, user_id, room_id).await.unwrap().unwrap();
        assert_eq!(counter.count, 0);
    }

    #[tokio::test]
    async fn missing_row_reports_zero_rows_affected() {
        let db = setup_test_db().await;
        assert_eq!(Model::reset(&db, 1, 1).await.unwrap(), 0);
        assert_eq!(Model::increment(&db, 1, 1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_increments_lose_nothing() {
        let db = setup_test_db().await;
        let (user_id, room_id) = seed(&db).await;
        Model::create(&db, user_id, room_id).await.unwrap();

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let db = db.clone();
                async move { Model::increment(&db, user_id, room_id).await }
            })
            .collect();
        for res in futures::future::join_all(tasks).await {
            assert_eq!(res.unwrap(), 1);
        }

        let counter = Model::get(&db, user_id, room_id).await.unwrap().unwrap();
        assert_eq!(counter.count, 10);
    }
}
