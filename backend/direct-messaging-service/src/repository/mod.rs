//! Persistence contract for conversations and messages
//!
//! Flag transitions are guarded writes: they return `Some(updated)` only when this
//! call performed the transition and `None` when the guard did not hold.

use crate::models::{Conversation, Message, ParticipantPair};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryChatStore;
pub use postgres::PgChatStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Uniqueness violation, e.g. a second conversation for the same pair
    #[error("uniqueness conflict")]
    Conflict,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn find_conversation(&self, id: Uuid) -> StoreResult<Option<Conversation>>;

    async fn find_conversation_by_pair(
        &self,
        pair: ParticipantPair,
    ) -> StoreResult<Option<Conversation>>;

    /// Fails with `StoreError::Conflict` when the pair already has a conversation
    async fn insert_conversation(&self, conversation: &Conversation) -> StoreResult<()>;

    /// Moves the activity marker forward; never backwards
    async fn touch_conversation(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;

    async fn set_conversation_active(
        &self,
        id: Uuid,
        active: bool,
    ) -> StoreResult<Option<Conversation>>;

    /// Conversations of `user_id`, most recent activity first
    async fn list_conversations_for(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Conversation>>;

    /// Stores the message and, in the same write, moves the conversation's activity
    /// marker forward to `sent_at` and reactivates it
    async fn insert_message(&self, message: &Message) -> StoreResult<()>;

    async fn find_message(&self, id: Uuid) -> StoreResult<Option<Message>>;

    /// Messages of a conversation in send order
    async fn list_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Message>>;

    async fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Option<Message>>;

    /// Also marks delivered with the same instant if not yet delivered.
    /// `read_at` is never earlier than an existing `delivered_at`.
    async fn mark_read(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Option<Message>>;

    /// Replaces the text of a non-deleted text message sent at or after `not_before`
    async fn update_content(
        &self,
        id: Uuid,
        content: &str,
        at: DateTime<Utc>,
        not_before: DateTime<Utc>,
    ) -> StoreResult<Option<Message>>;

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Option<Message>>;

    /// Messages not sent by `viewer` and not yet read; deleted messages included
    async fn count_unread(&self, conversation_id: Uuid, viewer: Uuid) -> StoreResult<i64>;
}
