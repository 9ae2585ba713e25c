use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use util::{config, state::AppState};
use validator::Validate;

use db::models::{
    room::Model as RoomModel, room_member::Model as RoomMemberModel,
    unread_counter::Model as UnreadCounterModel, user::Model as UserModel,
};

use crate::auth::generate_jwt;
use crate::response::ApiResponse;
use crate::routes::common::format_validation_errors;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(regex(
        path = *USERNAME_REGEX,
        message = "Username may only contain letters, digits and underscores (3-32 chars)"
    ))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Default)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub token: String,
    pub expires_at: String,
}

lazy_static::lazy_static! {
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new("^[A-Za-z0-9_]{3,32}$").unwrap();
}

/// POST /auth/register
///
/// Register a new user. The user is added to the default room (created on
/// first use) with an unread counter initialized to zero.
///
/// ### Request Body
/// ```json
/// {
///   "username": "alice",
///   "email": "alice@example.com",
///   "password": "strongpassword"
/// }
/// ```
///
/// ### Responses
///
/// - `201 Created`
/// ```json
/// {
///   "success": true,
///   "data": {
///     "id": 1,
///     "username": "alice",
///     "email": "alice@example.com",
///     "token": "jwt_token_here",
///     "expires_at": "2025-08-07T11:00:00Z"
///   },
///   "message": "User registered successfully"
/// }
/// ```
///
/// - `400 Bad Request` (validation failure)
/// - `409 Conflict` (duplicate username or email)
/// - `500 Internal Server Error`
pub async fn register(
    State(app_state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    if let Err(validation_errors) = req.validate() {
        let error_message = format_validation_errors(&validation_errors);
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<UserResponse>::error(error_message)),
        );
    }

    let db = app_state.db();

    match UserModel::get_by_email(db, &req.email).await {
        Ok(Some(_)) => {
            return (
                StatusCode::CONFLICT,
                Json(ApiResponse::<UserResponse>::error(
                    "A user with this email already exists",
                )),
            );
        }
        Ok(None) => {}
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<UserResponse>::error(format!(
                    "Database error: {e}"
                ))),
            );
        }
    }

    match UserModel::get_by_username(db, &req.username).await {
        Ok(Some(_)) => {
            return (
                StatusCode::CONFLICT,
                Json(ApiResponse::<UserResponse>::error(
                    "A user with this username already exists",
                )),
            );
        }
        Ok(None) => {}
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<UserResponse>::error(format!(
                    "Database error: {e}"
                ))),
            );
        }
    }

    let user = match UserModel::create(db, &req.username, &req.email, &req.password).await {
        Ok(user) => user,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<UserResponse>::error(format!(
                    "Database error: {e}"
                ))),
            );
        }
    };

    // Every account starts in the default room, with its counter at zero so
    // unread bookkeeping is defined from the first message.
    let join_default_room = async {
        let room = RoomModel::find_or_create_named(db, &config::default_room_name()).await?;
        RoomMemberModel::add(db, user.id, room.id).await?;
        UnreadCounterModel::create(db, user.id, room.id).await?;
        Ok::<(), sea_orm::DbErr>(())
    };
    if let Err(e) = join_default_room.await {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<UserResponse>::error(format!(
                "Failed to join default room: {e}"
            ))),
        );
    }

    let (token, expires_at) = generate_jwt(user.id);
    let response = UserResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        token,
        expires_at,
    };

    (
        StatusCode::CREATED,
        Json(ApiResponse::success(
            response,
            "User registered successfully",
        )),
    )
}

/// POST /auth/login
///
/// Exchange email + password for a bearer token.
///
/// ### Responses
///
/// - `200 OK` with the same payload as registration
/// - `401 Unauthorized` on unknown email or wrong password
pub async fn login(
    State(app_state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    if let Err(validation_errors) = req.validate() {
        let error_message = format_validation_errors(&validation_errors);
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<UserResponse>::error(error_message)),
        );
    }

    let db = app_state.db();

    let user = match UserModel::get_by_email(db, &req.email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::<UserResponse>::error("Invalid credentials")),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<UserResponse>::error(format!(
                    "Database error: {e}"
                ))),
            );
        }
    };

    if !user.verify_password(&req.password) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<UserResponse>::error("Invalid credentials")),
        );
    }

    let (token, expires_at) = generate_jwt(user.id);
    let response = UserResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        token,
        expires_at,
    };

    (
        StatusCode::OK,
        Json(ApiResponse::success(response, "Login successful")),
    )
}
