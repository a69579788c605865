use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::models::{Conversation, ParticipantPair, Principal};
use crate::policy;
use crate::repository::{ChatStore, StoreError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Attempts at creating a conversation before a lost race is reported as internal
const MAX_CREATE_ATTEMPTS: u32 = 3;

/// Owns "at most one conversation per unordered pair of participants"
#[derive(Clone)]
pub struct ConversationDirectory {
    store: Arc<dyn ChatStore>,
    clock: Arc<dyn Clock>,
}

impl ConversationDirectory {
    pub fn new(store: Arc<dyn ChatStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Existing conversation for the pair, or a fresh active one
    ///
    /// A concurrent creator for the same pair makes the insert fail with a conflict;
    /// the loser re-reads and returns the winner's row.
    pub async fn get_or_create(
        &self,
        participant_a: Uuid,
        participant_b: Uuid,
    ) -> AppResult<Conversation> {
        let pair = ParticipantPair::new(participant_a, participant_b)?;

        for attempt in 1..=MAX_CREATE_ATTEMPTS {
            if let Some(existing) = self.store.find_conversation_by_pair(pair).await? {
                return Ok(existing);
            }

            let candidate = Conversation::new(pair, self.clock.now());
            match self.store.insert_conversation(&candidate).await {
                Ok(()) => {
                    tracing::info!(
                        conversation_id = %candidate.id,
                        participant_a = %candidate.participant_a,
                        participant_b = %candidate.participant_b,
                        "conversation created"
                    );
                    return Ok(candidate);
                }
                Err(StoreError::Conflict) => {
                    tracing::info!(attempt, "conversation creation raced, re-reading pair");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!(
            participant_a = %pair.low(),
            participant_b = %pair.high(),
            "conversation creation kept conflicting without a readable winner"
        );
        Err(AppError::Internal)
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Conversation> {
        self.store
            .find_conversation(id)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub fn is_member(&self, conversation: &Conversation, user_id: Uuid) -> bool {
        conversation.is_member(user_id)
    }

    pub fn other_participant(&self, conversation: &Conversation, user_id: Uuid) -> AppResult<Uuid> {
        conversation
            .other_participant(user_id)
            .ok_or(AppError::Forbidden)
    }

    /// Appends already move the marker inside `ChatStore::insert_message`
    pub async fn touch_activity(&self, conversation_id: Uuid, when: DateTime<Utc>) -> AppResult<()> {
        self.store.touch_conversation(conversation_id, when).await?;
        Ok(())
    }

    /// Caller-facing get-or-create with `peer`
    pub async fn open_with(&self, principal: &Principal, peer: Uuid) -> AppResult<Conversation> {
        self.get_or_create(principal.user_id, peer).await
    }

    pub async fn get_for(&self, id: Uuid, principal: &Principal) -> AppResult<Conversation> {
        let conversation = self.find_by_id(id).await?;
        policy::ensure_member(&conversation, principal)?;
        Ok(conversation)
    }

    pub async fn list_for(
        &self,
        principal: &Principal,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Conversation>> {
        if limit < 0 || offset < 0 {
            return Err(AppError::Validation(
                "limit and offset must not be negative".into(),
            ));
        }
        let conversations = self
            .store
            .list_conversations_for(principal.user_id, limit, offset)
            .await?;
        Ok(conversations)
    }

    /// Conversations are never removed, only switched off
    pub async fn deactivate(&self, id: Uuid, principal: &Principal) -> AppResult<Conversation> {
        self.get_for(id, principal).await?;
        let conversation = self
            .store
            .set_conversation_active(id, false)
            .await?
            .ok_or(AppError::NotFound)?;
        tracing::debug!(conversation_id = %id, user_id = %principal.user_id, "conversation deactivated");
        Ok(conversation)
    }
}
