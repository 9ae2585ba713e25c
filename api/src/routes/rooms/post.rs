use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use util::{config, state::AppState};
use validator::Validate;

use db::models::{
    message::{MessageKind, Model as MessageModel},
    room::Model as RoomModel,
    room_member::Model as RoomMemberModel,
    unread_counter::Model as UnreadCounterModel,
};
use sea_orm::EntityTrait;

use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::format_validation_errors;
use crate::services::notifications;
use crate::ws::chat::payload;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoomRequest {
    /// Users to invite; the caller is always included.
    #[validate(length(min = 1, message = "At least one target user is required"))]
    pub targets: Vec<i64>,

    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Default)]
pub struct RoomResponse {
    pub id: i64,
    pub name: Option<String>,
    pub member_ids: Vec<i64>,
    pub created_at: String,
}

/// POST /rooms
///
/// Create a room containing the caller and every target user. Counters for
/// all members are created at zero, and `ROOM_CREATED` is delivered to each
/// invited member's personal channel.
///
/// ### Request Body
/// ```json
/// { "targets": [2, 3], "name": "planning" }
/// ```
///
/// ### Responses
///
/// - `200 OK` with the created room
/// - `404 Not Found` if any target user does not exist (nothing is created)
/// - `409 Conflict` on duplicate room name or identical member set
pub async fn create_room(
    State(app_state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(req): Json<CreateRoomRequest>,
) -> impl IntoResponse {
    if let Err(validation_errors) = req.validate() {
        let error_message = format_validation_errors(&validation_errors);
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<RoomResponse>::error(error_message)),
        );
    }

    let db = app_state.db();

    if let Some(name) = req.name.as_deref() {
        match RoomModel::find_by_name(db, name).await {
            Ok(Some(_)) => {
                return (
                    StatusCode::CONFLICT,
                    Json(ApiResponse::<RoomResponse>::error(
                        "A room with this name already exists",
                    )),
                );
            }
            Ok(None) => {}
            Err(e) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::<RoomResponse>::error(format!(
                        "Database error: {e}"
                    ))),
                );
            }
        }
    }

    let mut member_ids = req.targets.clone();
    member_ids.push(claims.sub);
    member_ids.sort_unstable();
    member_ids.dedup();

    // A target that does not resolve to a user fails the whole operation;
    // silently skipping it would create a room with different members than
    // the caller asked for.
    for &member_id in &member_ids {
        match db::models::User::find_by_id(member_id).one(db).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return (
                    StatusCode::NOT_FOUND,
                    Json(ApiResponse::<RoomResponse>::error(format!(
                        "User {member_id} not found"
                    ))),
                );
            }
            Err(e) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::<RoomResponse>::error(format!(
                        "Database error: {e}"
                    ))),
                );
            }
        }
    }

    match RoomModel::find_with_member_set(db, &member_ids).await {
        Ok(Some(_)) => {
            return (
                StatusCode::CONFLICT,
                Json(ApiResponse::<RoomResponse>::error(
                    "A room with these members already exists",
                )),
            );
        }
        Ok(None) => {}
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<RoomResponse>::error(format!(
                    "Database error: {e}"
                ))),
            );
        }
    }

    let create_all = async {
        let room = RoomModel::create(db, req.name.as_deref()).await?;
        for &member_id in &member_ids {
            RoomMemberModel::add(db, member_id, room.id).await?;
            UnreadCounterModel::create(db, member_id, room.id).await?;
        }
        Ok::<RoomModel, sea_orm::DbErr>(room)
    };
    let room = match create_all.await {
        Ok(room) => room,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<RoomResponse>::error(format!(
                    "Failed to create room: {e}"
                ))),
            );
        }
    };

    notifications::room_created(&app_state, room.id, claims.sub, &member_ids).await;

    let response = RoomResponse {
        id: room.id,
        name: room.name,
        member_ids,
        created_at: room.created_at.to_rfc3339(),
    };

    (
        StatusCode::OK,
        Json(ApiResponse::success(response, "Room created successfully")),
    )
}

/// POST /rooms/{room_id}/messages
///
/// Persist a text message and fan out unread counters and events to every
/// room member.
///
/// ### Request Body
/// ```json
/// { "content": "hi" }
/// ```
///
/// ### Responses
///
/// - `200 OK` with the created message record
/// - `400 Bad Request` on empty content
/// - `403 Forbidden` when the caller is not a member of the room
/// - `404 Not Found` when the room does not exist
pub async fn send_message(
    Path(room_id): Path<i64>,
    State(app_state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(req): Json<SendMessageRequest>,
) -> impl IntoResponse {
    let content = req.content.trim().to_owned();
    if content.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error("Content is required")),
        )
            .into_response();
    }

    ingest_message(&app_state, room_id, claims.sub, MessageKind::Text, &content, None).await
}

/// POST /rooms/{room_id}/messages/files
///
/// Multipart upload: a `file` part (required) and an optional `content`
/// caption. The file is stored under the chat storage root and the message
/// goes through the same fan-out as a text message.
pub async fn send_file_message(
    Path(room_id): Path<i64>,
    State(app_state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut file_name: Option<String> = None;
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut content = String::new();

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(|n| n.to_owned());
        match name.as_deref() {
            Some("file") => {
                file_name = field.file_name().map(|n| n.to_owned());
                match field.bytes().await {
                    Ok(bytes) => file_bytes = Some(bytes.to_vec()),
                    Err(_) => {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(ApiResponse::<()>::error(
                                "Failed to read uploaded file",
                            )),
                        )
                            .into_response();
                    }
                }
            }
            Some("content") => {
                content = field.text().await.unwrap_or_default();
            }
            _ => {}
        }
    }

    let (Some(file_name), Some(file_bytes)) = (file_name, file_bytes) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error("File is required")),
        )
            .into_response();
    };

    // Flatten the client-supplied name; anything path-like must not escape
    // the storage root.
    let safe_name: String = file_name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let relative_path = format!("room_{room_id}/{}_{safe_name}", Utc::now().timestamp_millis());
    let full_path = std::path::Path::new(&config::chat_storage_root()).join(&relative_path);

    if let Some(parent) = full_path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(format!(
                    "Failed to store file: {e}"
                ))),
            )
                .into_response();
        }
    }
    if let Err(e) = tokio::fs::write(&full_path, &file_bytes).await {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<()>::error(format!(
                "Failed to store file: {e}"
            ))),
        )
            .into_response();
    }

    let body = if content.trim().is_empty() {
        safe_name
    } else {
        content.trim().to_owned()
    };

    ingest_message(
        &app_state,
        room_id,
        claims.sub,
        MessageKind::File,
        &body,
        Some(&relative_path),
    )
    .await
}

/// Shared persist-and-fan-out path for both message kinds.
async fn ingest_message(
    app_state: &AppState,
    room_id: i64,
    user_id: i64,
    kind: MessageKind,
    content: &str,
    attachment_path: Option<&str>,
) -> axum::response::Response {
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
                Json(ApiResponse::<()>::error(format!(
                    "Database error: {e}"
                ))),
            )
                .into_response();
        }
    }

    match RoomModel::is_member(db, room_id, user_id).await {
        Ok(true) => {}
        Ok(false) => {
            return (
                StatusCode::FORBIDDEN,
                Json(ApiResponse::<()>::error(
                    "Not a member of this room",
                )),
            )
                .into_response();
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(format!(
                    "Database error: {e}"
                ))),
            )
                .into_response();
        }
    }

    let author = match db::models::User::find_by_id(user_id).one(db).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::<()>::error("User not found")),
            )
                .into_response();
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(format!(
                    "Database error: {e}"
                ))),
            )
                .into_response();
        }
    };

    let message =
        match MessageModel::create(db, room_id, user_id, kind, content, attachment_path).await {
            Ok(message) => message,
            Err(e) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::<()>::error(format!(
                        "Failed to create message: {e}"
                    ))),
                )
                    .into_response();
            }
        };

    // The message is durable at this point. A fan-out failure is fatal to
    // this request but the counters already updated stay updated.
    if let Err(e) = notifications::message_created(app_state, &message, &author).await {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<()>::error(format!(
                "Failed to notify room members: {e}"
            ))),
        )
            .into_response();
    }

    let record = payload::Message::from_model(&message, &author);
    (
        StatusCode::OK,
        Json(ApiResponse::success(record, "Message sent successfully")),
    )
        .into_response()
}
