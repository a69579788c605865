//! Authorization and time-window rules shared by the services
//!
//! Everything here is a pure check over records that are already loaded.

use crate::error::{AppError, AppResult};
use crate::models::{Conversation, Message, Principal};
use chrono::{DateTime, Duration, Utc};

pub const EDIT_WINDOW_MINUTES: i64 = 15;

/// Members only; administrative roles get no read override
pub fn ensure_member(conversation: &Conversation, principal: &Principal) -> AppResult<()> {
    if conversation.is_member(principal.user_id) {
        return Ok(());
    }
    tracing::warn!(
        conversation_id = %conversation.id,
        user_id = %principal.user_id,
        "non-member denied access to conversation"
    );
    Err(AppError::Forbidden)
}

pub fn ensure_author(message: &Message, principal: &Principal) -> AppResult<()> {
    if message.sender_id == principal.user_id {
        return Ok(());
    }
    tracing::warn!(
        message_id = %message.id,
        user_id = %principal.user_id,
        "non-author denied message mutation"
    );
    Err(AppError::Forbidden)
}

pub fn ensure_can_delete(message: &Message, principal: &Principal) -> AppResult<()> {
    if message.can_be_deleted_by(principal) {
        return Ok(());
    }
    tracing::warn!(
        message_id = %message.id,
        user_id = %principal.user_id,
        role = %principal.role,
        "delete denied"
    );
    Err(AppError::Forbidden)
}

/// Author only, text only, inside the window
pub fn ensure_can_edit(
    message: &Message,
    principal: &Principal,
    now: DateTime<Utc>,
    window_minutes: i64,
) -> AppResult<()> {
    let window = Duration::minutes(window_minutes);
    if message.can_be_edited_by(principal.user_id, now, window) && !message.is_file() {
        return Ok(());
    }

    ensure_author(message, principal)?;
    if message.is_file() {
        return Err(AppError::PolicyViolation(
            "file messages cannot be edited".into(),
        ));
    }
    ensure_within_edit_window(message, now, window_minutes)
}

pub fn ensure_within_edit_window(
    message: &Message,
    now: DateTime<Utc>,
    window_minutes: i64,
) -> AppResult<()> {
    if message.deleted {
        return Err(AppError::PolicyViolation(
            "deleted messages cannot be edited".into(),
        ));
    }
    if !message.edit_window_open(now, Duration::minutes(window_minutes)) {
        return Err(AppError::EditWindowExpired {
            max_edit_minutes: window_minutes,
        });
    }
    Ok(())
}
