use super::{ChatStore, StoreError, StoreResult};
use crate::models::{Conversation, Message, ParticipantPair};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    conversations: HashMap<Uuid, Conversation>,
    by_pair: HashMap<ParticipantPair, Uuid>,
    messages: HashMap<Uuid, Message>,
    // Insertion order, used to break `sent_at` ties
    message_order: Vec<Uuid>,
}

/// Process-local store with the same guarantees as the PostgreSQL schema
#[derive(Default)]
pub struct InMemoryChatStore {
    inner: RwLock<Inner>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn transition<F>(&self, id: Uuid, apply: F) -> StoreResult<Option<Message>>
    where
        F: FnOnce(&mut Message) -> bool + Send,
    {
        let mut inner = self.inner.write().await;
        let Some(message) = inner.messages.get_mut(&id) else {
            return Ok(None);
        };
        if apply(message) {
            Ok(Some(message.clone()))
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn find_conversation(&self, id: Uuid) -> StoreResult<Option<Conversation>> {
        Ok(self.inner.read().await.conversations.get(&id).cloned())
    }

    async fn find_conversation_by_pair(
        &self,
        pair: ParticipantPair,
    ) -> StoreResult<Option<Conversation>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_pair
            .get(&pair)
            .and_then(|id| inner.conversations.get(id))
            .cloned())
    }

    async fn insert_conversation(&self, conversation: &Conversation) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let pair = conversation.pair();
        if inner.by_pair.contains_key(&pair) || inner.conversations.contains_key(&conversation.id)
        {
            return Err(StoreError::Conflict);
        }
        inner.by_pair.insert(pair, conversation.id);
        inner
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(())
    }

    async fn touch_conversation(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(conversation) = inner.conversations.get_mut(&id) {
            conversation.last_activity_at = conversation.last_activity_at.max(at);
        }
        Ok(())
    }

    async fn set_conversation_active(
        &self,
        id: Uuid,
        active: bool,
    ) -> StoreResult<Option<Conversation>> {
        let mut inner = self.inner.write().await;
        Ok(inner.conversations.get_mut(&id).map(|conversation| {
            conversation.active = active;
            conversation.clone()
        }))
    }

    async fn list_conversations_for(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Conversation>> {
        let inner = self.inner.read().await;
        let mut conversations: Vec<Conversation> = inner
            .conversations
            .values()
            .filter(|c| c.is_member(user_id))
            .cloned()
            .collect();
        conversations.sort_by(|a, b| {
            b.last_activity_at
                .cmp(&a.last_activity_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(page(conversations, limit, offset))
    }

    async fn insert_message(&self, message: &Message) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.messages.contains_key(&message.id) {
            return Err(StoreError::Conflict);
        }
        let Some(conversation) = inner.conversations.get_mut(&message.conversation_id) else {
            return Err(StoreError::Corrupt(format!(
                "message {} references unknown conversation {}",
                message.id, message.conversation_id
            )));
        };
        conversation.active = true;
        conversation.last_activity_at = conversation.last_activity_at.max(message.sent_at);

        inner.message_order.push(message.id);
        inner.messages.insert(message.id, message.clone());
        Ok(())
    }

    async fn find_message(&self, id: Uuid) -> StoreResult<Option<Message>> {
        Ok(self.inner.read().await.messages.get(&id).cloned())
    }

    async fn list_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Message>> {
        let inner = self.inner.read().await;
        let mut messages: Vec<Message> = inner
            .message_order
            .iter()
            .filter_map(|id| inner.messages.get(id))
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps
        messages.sort_by_key(|m| m.sent_at);

        Ok(page(messages, limit, offset))
    }

    async fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Option<Message>> {
        self.transition(id, |m| m.apply_delivered(at)).await
    }

    async fn mark_read(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Option<Message>> {
        self.transition(id, |m| m.apply_read(at)).await
    }

    async fn update_content(
        &self,
        id: Uuid,
        content: &str,
        at: DateTime<Utc>,
        not_before: DateTime<Utc>,
    ) -> StoreResult<Option<Message>> {
        self.transition(id, |m| {
            if m.deleted || m.is_file() || m.sent_at < not_before {
                return false;
            }
            m.apply_edit(content, at);
            true
        })
        .await
    }

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Option<Message>> {
        self.transition(id, |m| m.apply_delete(at)).await
    }

    async fn count_unread(&self, conversation_id: Uuid, viewer: Uuid) -> StoreResult<i64> {
        let inner = self.inner.read().await;
        let count = inner
            .messages
            .values()
            .filter(|m| m.conversation_id == conversation_id && m.sender_id != viewer && !m.read)
            .count();
        Ok(count as i64)
    }
}

fn page<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(0);
    let limit = usize::try_from(limit).unwrap_or(0);
    items.into_iter().skip(offset).take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessagePayload;

    fn pair() -> ParticipantPair {
        ParticipantPair::new(Uuid::new_v4(), Uuid::new_v4()).unwrap()
    }

    #[tokio::test]
    async fn test_second_conversation_for_pair_conflicts() {
        let store = InMemoryChatStore::new();
        let pair = pair();
        let now = Utc::now();

        store
            .insert_conversation(&Conversation::new(pair, now))
            .await
            .unwrap();
        let err = store
            .insert_conversation(&Conversation::new(pair, now))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
    }

    #[tokio::test]
    async fn test_guarded_transition_fires_once() {
        let store = InMemoryChatStore::new();
        let conversation = Conversation::new(pair(), Utc::now());
        store.insert_conversation(&conversation).await.unwrap();

        let message = Message::new(
            conversation.id,
            conversation.participant_a,
            MessagePayload::text("hi"),
            None,
            Utc::now(),
        );
        store.insert_message(&message).await.unwrap();

        let at = Utc::now();
        assert!(store.mark_delivered(message.id, at).await.unwrap().is_some());
        assert!(store.mark_delivered(message.id, at).await.unwrap().is_none());
        assert!(store.mark_delivered(Uuid::new_v4(), at).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_after_later_delivery_keeps_order() {
        let store = InMemoryChatStore::new();
        let conversation = Conversation::new(pair(), Utc::now());
        store.insert_conversation(&conversation).await.unwrap();
        let message = Message::new(
            conversation.id,
            conversation.participant_a,
            MessagePayload::text("hi"),
            None,
            Utc::now(),
        );
        store.insert_message(&message).await.unwrap();

        // Reader sampled its clock before a concurrent delivery committed
        let read_sampled = Utc::now();
        let delivered = read_sampled + chrono::Duration::seconds(5);
        store.mark_delivered(message.id, delivered).await.unwrap();
        let read = store
            .mark_read(message.id, read_sampled)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(read.delivered_at, Some(delivered));
        assert_eq!(read.read_at, Some(delivered));
    }

    #[tokio::test]
    async fn test_insert_message_bumps_and_reactivates_conversation() {
        let store = InMemoryChatStore::new();
        let created = Utc::now();
        let conversation = Conversation::new(pair(), created);
        store.insert_conversation(&conversation).await.unwrap();
        store
            .set_conversation_active(conversation.id, false)
            .await
            .unwrap();

        let sent_at = created + chrono::Duration::minutes(3);
        let message = Message::new(
            conversation.id,
            conversation.participant_b,
            MessagePayload::text("back again"),
            None,
            sent_at,
        );
        store.insert_message(&message).await.unwrap();

        let stored = store
            .find_conversation(conversation.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.active);
        assert_eq!(stored.last_activity_at, sent_at);
    }

    #[tokio::test]
    async fn test_message_for_unknown_conversation_is_rejected() {
        let store = InMemoryChatStore::new();
        let message = Message::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            MessagePayload::text("orphan"),
            None,
            Utc::now(),
        );

        let err = store.insert_message(&message).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
        assert!(store.find_message(message.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_touch_never_moves_backwards() {
        let store = InMemoryChatStore::new();
        let now = Utc::now();
        let conversation = Conversation::new(pair(), now);
        store.insert_conversation(&conversation).await.unwrap();

        store
            .touch_conversation(conversation.id, now - chrono::Duration::hours(1))
            .await
            .unwrap();
        let stored = store
            .find_conversation(conversation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.last_activity_at, now);
    }
}
