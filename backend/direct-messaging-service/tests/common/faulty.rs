//! `ChatStore` wrapper that injects races and failures around an in-memory store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use direct_messaging_service::{
    models::{Conversation, Message, ParticipantPair},
    repository::{ChatStore, InMemoryChatStore, StoreError, StoreResult},
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    /// A rival row for the same pair lands just before each conversation insert
    pub rival_wins_insert: bool,
    /// Pair lookups always miss and every conversation insert conflicts
    pub pair_never_readable: bool,
}

pub struct FaultyStore {
    pub inner: InMemoryChatStore,
    faults: Faults,
    insert_attempts: AtomicUsize,
    rivals: Mutex<Vec<Uuid>>,
    conversation_updates_down: AtomicBool,
}

impl FaultyStore {
    pub fn new(faults: Faults) -> Self {
        Self {
            inner: InMemoryChatStore::new(),
            faults,
            insert_attempts: AtomicUsize::new(0),
            rivals: Mutex::new(Vec::new()),
            conversation_updates_down: AtomicBool::new(false),
        }
    }

    /// While down, standalone activity and activation updates fail
    pub fn set_conversation_updates_down(&self, down: bool) {
        self.conversation_updates_down.store(down, Ordering::SeqCst);
    }

    fn conversation_updates_down(&self) -> bool {
        self.conversation_updates_down.load(Ordering::SeqCst)
    }

    pub fn insert_attempts(&self) -> usize {
        self.insert_attempts.load(Ordering::SeqCst)
    }

    pub fn rivals(&self) -> Vec<Uuid> {
        self.rivals.lock().unwrap().clone()
    }
}

fn unavailable() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl ChatStore for FaultyStore {
    async fn find_conversation(&self, id: Uuid) -> StoreResult<Option<Conversation>> {
        self.inner.find_conversation(id).await
    }

    async fn find_conversation_by_pair(
        &self,
        pair: ParticipantPair,
    ) -> StoreResult<Option<Conversation>> {
        if self.faults.pair_never_readable {
            return Ok(None);
        }
        self.inner.find_conversation_by_pair(pair).await
    }

    async fn insert_conversation(&self, conversation: &Conversation) -> StoreResult<()> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        if self.faults.pair_never_readable {
            return Err(StoreError::Conflict);
        }
        if self.faults.rival_wins_insert {
            let rival = Conversation::new(conversation.pair(), conversation.created_at);
            if self.inner.insert_conversation(&rival).await.is_ok() {
                self.rivals.lock().unwrap().push(rival.id);
            }
            return Err(StoreError::Conflict);
        }
        self.inner.insert_conversation(conversation).await
    }

    async fn touch_conversation(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        if self.conversation_updates_down() {
            return Err(unavailable());
        }
        self.inner.touch_conversation(id, at).await
    }

    async fn set_conversation_active(
        &self,
        id: Uuid,
        active: bool,
    ) -> StoreResult<Option<Conversation>> {
        if self.conversation_updates_down() {
            return Err(unavailable());
        }
        self.inner.set_conversation_active(id, active).await
    }

    async fn list_conversations_for(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Conversation>> {
        self.inner.list_conversations_for(user_id, limit, offset).await
    }

    async fn insert_message(&self, message: &Message) -> StoreResult<()> {
        self.inner.insert_message(message).await
    }

    async fn find_message(&self, id: Uuid) -> StoreResult<Option<Message>> {
        self.inner.find_message(id).await
    }

    async fn list_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Message>> {
        self.inner.list_messages(conversation_id, limit, offset).await
    }

    async fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Option<Message>> {
        self.inner.mark_delivered(id, at).await
    }

    async fn mark_read(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Option<Message>> {
        self.inner.mark_read(id, at).await
    }

    async fn update_content(
        &self,
        id: Uuid,
        content: &str,
        at: DateTime<Utc>,
        not_before: DateTime<Utc>,
    ) -> StoreResult<Option<Message>> {
        self.inner.update_content(id, content, at, not_before).await
    }

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Option<Message>> {
        self.inner.soft_delete(id, at).await
    }

    async fn count_unread(&self, conversation_id: Uuid, viewer: Uuid) -> StoreResult<i64> {
        self.inner.count_unread(conversation_id, viewer).await
    }
}
