use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use util::state::AppState;

use db::models::user::Model as UserModel;

use crate::auth::AuthUser;
use crate::response::ApiResponse;

#[derive(Debug, Serialize)]
pub struct UserListItem {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// GET /users
///
/// Every registered user except the caller, for starting new rooms.
pub async fn list_users(
    State(app_state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> impl IntoResponse {
    let db = app_state.db();

    match UserModel::find_all_except(db, claims.sub).await {
        Ok(users) => {
            let items: Vec<UserListItem> = users
                .into_iter()
                .map(|u| UserListItem {
                    id: u.id,
                    username: u.username,
                    email: u.email,
                })
                .collect();
            (
                StatusCode::OK,
                Json(ApiResponse::success(items, "Users retrieved successfully")),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<Vec<UserListItem>>::error(format!(
                "Database error: {e}"
            ))),
        ),
    }
}
