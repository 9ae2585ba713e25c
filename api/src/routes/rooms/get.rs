use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::collections::HashMap;
use util::state::AppState;

use db::models::{
    message::Model as MessageModel,
    room::Model as RoomModel,
    user::{Column as UserColumn, Entity as UserEntity, Model as UserModel},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::ws::chat::payload;

const DEFAULT_PER_PAGE: u64 = 50;
const MAX_PER_PAGE: u64 = 200;

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// GET /rooms/{room_id}/messages?page=1&per_page=50
///
/// One page of the room's messages, newest first. Members only.
pub async fn list_messages(
    Path(room_id): Path<i64>,
    State(app_state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Query(query): Query<MessagesQuery>,
) -> impl IntoResponse {
    let db = app_state.db();

    match db::models::Room::find_by_id(room_id).one(db).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::<()>::error("Room not found")),
            )
                .into_response();
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(format!("Database error: {e}"))),
            )
                .into_response();
        }
    }

    match RoomModel::is_member(db, room_id, claims.sub).await {
        Ok(true) => {}
        Ok(false) => {
            return (
                StatusCode::FORBIDDEN,
                Json(ApiResponse::<()>::error("Not a member of this room")),
            )
                .into_response();
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(format!("Database error: {e}"))),
            )
                .into_response();
        }
    }

    let page = query.page.unwrap_or(1).max(1) - 1;
    let per_page = query
        .per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);

    let messages = match MessageModel::find_for_room(db, room_id, page, per_page).await {
        Ok(messages) => messages,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(format!("Database error: {e}"))),
            )
                .into_response();
        }
    };

    let mut author_ids: Vec<i64> = messages.iter().map(|m| m.user_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let authors: HashMap<i64, UserModel> = match UserEntity::find()
        .filter(UserColumn::Id.is_in(author_ids))
        .all(db)
        .await
    {
        Ok(users) => users.into_iter().map(|u| (u.id, u)).collect(),
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(format!("Database error: {e}"))),
            )
                .into_response();
        }
    };

    let records: Vec<payload::Message> = messages
        .iter()
        .filter_map(|m| {
            authors
                .get(&m.user_id)
                .map(|author| payload::Message::from_model(m, author))
        })
        .collect();

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            records,
            "Messages retrieved successfully",
        )),
    )
        .into_response()
}
