//! Unread-counter engine and event fan-out.
//!
//! Every mutation of an unread counter goes through here, paired with the
//! `UNREAD_COUNT_CHANGED` event that announces it. Counter updates are
//! single UPDATE statements; `rows_affected == 0` for a pair that ought to
//! exist (an established membership) is reported as an integrity fault, not
//! a not-found. One member's failure never blocks the rest of a fan-out
//! batch.

use db::models::{
    message::Model as MessageModel, room::Model as RoomModel,
    unread_counter::Model as UnreadCounterModel, user::Model as UserModel,
};
use sea_orm::DbErr;
use util::state::AppState;

use crate::ws::chat::{emit, payload};

/// Result type for notification engine operations
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors that can occur in the notification engine
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Unread counter missing for user {user_id} in room {room_id}")]
    MissingCounter { user_id: i64, room_id: i64 },
}

/// Resets the unread counter for (user, room) and announces the zero count
/// on the user's personal channel.
///
/// Used when a session joins a room. The counter row must already exist for
/// the membership; a zero-row update is an integrity fault surfaced to the
/// caller instead of being silently treated as success.
pub async fn reset_on_join(
    state: &AppState,
    user_id: i64,
    room_id: i64,
) -> NotificationResult<()> {
    let affected = UnreadCounterModel::reset(state.db(), user_id, room_id).await?;
    if affected == 0 {
        return Err(NotificationError::MissingCounter { user_id, room_id });
    }
    emit::unread_count_changed(state.ws(), user_id, room_id, 0).await;
    Ok(())
}

/// Fan-out for a newly persisted message.
///
/// For every member of the room: the author and anyone currently viewing the
/// room get their counter reset to zero, everyone else gets an atomic
/// increment. Each member then receives `UNREAD_COUNT_CHANGED`, and every
/// member except the author receives `RECEIVED_CHAT`. A failure for one
/// member is logged and the batch continues.
pub async fn message_created(
    state: &AppState,
    message: &MessageModel,
    author: &UserModel,
) -> NotificationResult<()> {
    let member_ids = RoomModel::member_ids(state.db(), message.room_id).await?;
    let record = payload::Message::from_model(message, author);

    for member_id in member_ids {
        if let Err(e) = notify_member(state, message, member_id, &record).await {
            tracing::warn!(
                member_id,
                room_id = message.room_id,
                message_id = message.id,
                error = %e,
                "Skipping member in unread fan-out"
            );
        }
    }
    Ok(())
}

async fn notify_member(
    state: &AppState,
    message: &MessageModel,
    member_id: i64,
    record: &payload::Message,
) -> NotificationResult<()> {
    let room_id = message.room_id;
    let is_author = member_id == message.user_id;
    let viewing = !is_author && state.presence().is_viewing(member_id, room_id);

    let count = if is_author || viewing {
        let affected = UnreadCounterModel::reset(state.db(), member_id, room_id).await?;
        if affected == 0 {
            return Err(NotificationError::MissingCounter {
                user_id: member_id,
                room_id,
            });
        }
        0
    } else {
        let affected = UnreadCounterModel::increment(state.db(), member_id, room_id).await?;
        if affected == 0 {
            return Err(NotificationError::MissingCounter {
                user_id: member_id,
                room_id,
            });
        }
        UnreadCounterModel::get(state.db(), member_id, room_id)
            .await?
            .map(|c| c.count)
            .ok_or(NotificationError::MissingCounter {
                user_id: member_id,
                room_id,
            })?
    };

    emit::unread_count_changed(state.ws(), member_id, room_id, count).await;
    if !is_author {
        emit::received_chat(state.ws(), member_id, record.clone()).await;
    }
    Ok(())
}

/// Announces a freshly created room to every invited member's personal
/// channel. The creator already has the room in hand and is not notified.
pub async fn room_created(state: &AppState, room_id: i64, created_by: i64, member_ids: &[i64]) {
    for &member_id in member_ids {
        if member_id != created_by {
            emit::room_created(state.ws(), member_id, room_id, created_by).await;
        }
    }
}
