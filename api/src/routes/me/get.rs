use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;
use util::state::AppState;

use db::models::{
    room::Model as RoomModel, unread_counter::Model as UnreadCounterModel,
    user::Model as UserModel,
};
use sea_orm::EntityTrait;

use crate::auth::AuthUser;
use crate::response::ApiResponse;

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct RoomWithUnread {
    pub id: i64,
    pub name: Option<String>,
    pub members: Vec<MemberResponse>,
    pub unread_count: i64,
}

#[derive(Debug, Serialize, Default)]
pub struct MeResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub rooms: Vec<RoomWithUnread>,
}

/// GET /me
///
/// The caller's profile: identity plus every room they belong to, each with
/// its member list and the caller's unread count for that room.
pub async fn get_me(
    State(app_state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> impl IntoResponse {
    let db = app_state.db();

    let user = match db::models::User::find_by_id(claims.sub).one(db).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::<MeResponse>::error("User not found")),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<MeResponse>::error(format!(
                    "Database error: {e}"
                ))),
            );
        }
    };

    let rooms = match RoomModel::find_for_user(db, user.id).await {
        Ok(rooms) => rooms,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<MeResponse>::error(format!(
                    "Database error: {e}"
                ))),
            );
        }
    };

    let counters: HashMap<i64, i64> = match UnreadCounterModel::find_for_user(db, user.id).await {
        Ok(counters) => counters.into_iter().map(|c| (c.room_id, c.count)).collect(),
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<MeResponse>::error(format!(
                    "Database error: {e}"
                ))),
            );
        }
    };

    let mut room_payloads = Vec::with_capacity(rooms.len());
    for room in rooms {
        let members = match RoomModel::members(db, room.id).await {
            Ok(members) => members,
            Err(e) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::<MeResponse>::error(format!(
                        "Database error: {e}"
                    ))),
                );
            }
        };
        room_payloads.push(RoomWithUnread {
            id: room.id,
            name: room.name,
            members: members.into_iter().map(member_response).collect(),
            unread_count: counters.get(&room.id).copied().unwrap_or(0),
        });
    }

    let response = MeResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        rooms: room_payloads,
    };

    (
        StatusCode::OK,
        Json(ApiResponse::success(response, "Profile retrieved successfully")),
    )
}

fn member_response(user: UserModel) -> MemberResponse {
    MemberResponse {
        id: user.id,
        username: user.username,
        email: user.email,
    }
}
