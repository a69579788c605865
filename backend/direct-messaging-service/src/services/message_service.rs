use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::models::{Conversation, Message, MessagePayload, Principal};
use crate::policy::{self, EDIT_WINDOW_MINUTES};
use crate::repository::ChatStore;
use crate::services::ConversationDirectory;
use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

pub const HISTORY_PAGE_MAX: i64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    pub edit_window_minutes: i64,
    pub history_page_max: i64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            edit_window_minutes: EDIT_WINDOW_MINUTES,
            history_page_max: HISTORY_PAGE_MAX,
        }
    }
}

/// Message creation and the delivery/read/edit/delete lifecycle
#[derive(Clone)]
pub struct MessageLedger {
    store: Arc<dyn ChatStore>,
    directory: ConversationDirectory,
    clock: Arc<dyn Clock>,
    settings: LedgerSettings,
}

impl MessageLedger {
    pub fn new(
        store: Arc<dyn ChatStore>,
        directory: ConversationDirectory,
        clock: Arc<dyn Clock>,
        settings: LedgerSettings,
    ) -> Self {
        Self {
            store,
            directory,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> LedgerSettings {
        self.settings
    }

    /// Append a message to an already-loaded conversation
    pub async fn append(
        &self,
        conversation: &Conversation,
        author: &Principal,
        payload: MessagePayload,
        reply_to: Option<Uuid>,
    ) -> AppResult<Message> {
        payload.validate()?;
        policy::ensure_member(conversation, author)?;

        if let Some(reply_to) = reply_to {
            let target = self.store.find_message(reply_to).await?;
            if !matches!(target, Some(ref m) if m.conversation_id == conversation.id) {
                return Err(AppError::Validation(
                    "reply_to must reference a message in the same conversation".into(),
                ));
            }
        }

        let message = Message::new(
            conversation.id,
            author.user_id,
            payload,
            reply_to,
            self.clock.now(),
        );
        // Activity marker and reactivation are written together with the row
        self.store.insert_message(&message).await?;

        tracing::debug!(
            message_id = %message.id,
            conversation_id = %conversation.id,
            user_id = %author.user_id,
            is_file = message.is_file(),
            reactivated = !conversation.active,
            "message appended"
        );
        Ok(message)
    }

    pub async fn send(
        &self,
        principal: &Principal,
        conversation_id: Uuid,
        payload: MessagePayload,
        reply_to: Option<Uuid>,
    ) -> AppResult<Message> {
        let conversation = self.directory.find_by_id(conversation_id).await?;
        self.append(&conversation, principal, payload, reply_to)
            .await
    }

    /// Page of messages in send order; `limit` is clamped to the configured maximum
    pub async fn history(
        &self,
        principal: &Principal,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Message>> {
        if limit < 0 || offset < 0 {
            return Err(AppError::Validation(
                "limit and offset must not be negative".into(),
            ));
        }
        self.directory.get_for(conversation_id, principal).await?;

        let limit = limit.min(self.settings.history_page_max);
        let messages = self
            .store
            .list_messages(conversation_id, limit, offset)
            .await?;
        Ok(messages)
    }

    pub async fn get(&self, principal: &Principal, message_id: Uuid) -> AppResult<Message> {
        self.load_for_member(principal, message_id).await
    }

    /// Idempotent; the first signal stamps `delivered_at`
    pub async fn mark_delivered(
        &self,
        principal: &Principal,
        message_id: Uuid,
    ) -> AppResult<Message> {
        let message = self.load_for_member(principal, message_id).await?;
        if message.delivered {
            return Ok(message);
        }

        match self
            .store
            .mark_delivered(message_id, self.clock.now())
            .await?
        {
            Some(updated) => {
                tracing::debug!(message_id = %message_id, user_id = %principal.user_id, "message delivered");
                Ok(updated)
            }
            // Lost the race to a concurrent delivery signal
            None => self.reload(message_id).await,
        }
    }

    /// No-op for the author; a member's first read also implies delivery
    pub async fn mark_read(&self, principal: &Principal, message_id: Uuid) -> AppResult<Message> {
        let message = self.load_for_member(principal, message_id).await?;
        if message.sender_id == principal.user_id {
            tracing::debug!(message_id = %message_id, "author read of own message ignored");
            return Ok(message);
        }
        if message.read {
            return Ok(message);
        }

        match self.store.mark_read(message_id, self.clock.now()).await? {
            Some(updated) => {
                tracing::debug!(message_id = %message_id, user_id = %principal.user_id, "message read");
                Ok(updated)
            }
            None => self.reload(message_id).await,
        }
    }

    pub async fn edit(
        &self,
        principal: &Principal,
        message_id: Uuid,
        new_content: &str,
    ) -> AppResult<Message> {
        if new_content.trim().is_empty() {
            return Err(AppError::Validation("message content is blank".into()));
        }

        let message = self.reload(message_id).await?;
        let now = self.clock.now();
        let window = self.settings.edit_window_minutes;
        policy::ensure_can_edit(&message, principal, now, window)?;

        let not_before = now - Duration::minutes(window);
        match self
            .store
            .update_content(message_id, new_content, now, not_before)
            .await?
        {
            Some(updated) => {
                tracing::debug!(message_id = %message_id, user_id = %principal.user_id, "message edited");
                Ok(updated)
            }
            None => {
                // Deleted between the check and the write
                let current = self.reload(message_id).await?;
                policy::ensure_within_edit_window(&current, now, window)?;
                tracing::error!(message_id = %message_id, "guarded edit missed without a policy reason");
                Err(AppError::Internal)
            }
        }
    }

    /// Soft delete by the author or an administrative role; repeat deletes are no-ops
    pub async fn delete(&self, principal: &Principal, message_id: Uuid) -> AppResult<Message> {
        let message = self.reload(message_id).await?;
        policy::ensure_can_delete(&message, principal)?;
        if message.deleted {
            return Ok(message);
        }

        match self.store.soft_delete(message_id, self.clock.now()).await? {
            Some(updated) => {
                tracing::debug!(
                    message_id = %message_id,
                    user_id = %principal.user_id,
                    role = %principal.role,
                    "message deleted"
                );
                Ok(updated)
            }
            None => self.reload(message_id).await,
        }
    }

    async fn reload(&self, message_id: Uuid) -> AppResult<Message> {
        self.store
            .find_message(message_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn load_for_member(&self, principal: &Principal, message_id: Uuid) -> AppResult<Message> {
        let message = self.reload(message_id).await?;
        self.directory
            .get_for(message.conversation_id, principal)
            .await?;
        Ok(message)
    }
}
