use crate::error::AppResult;
use crate::models::{Conversation, Principal};
use crate::repository::ChatStore;
use crate::services::ConversationDirectory;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

const SUMMARY_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationUnread {
    pub conversation: Conversation,
    pub unread_count: i64,
}

/// Read-side projection over the ledger; counts are computed on demand
#[derive(Clone)]
pub struct UnreadTracker {
    store: Arc<dyn ChatStore>,
    directory: ConversationDirectory,
}

impl UnreadTracker {
    pub fn new(store: Arc<dyn ChatStore>, directory: ConversationDirectory) -> Self {
        Self { store, directory }
    }

    /// Messages not sent by `viewer` and not yet read
    pub async fn unread_count(&self, conversation: &Conversation, viewer: Uuid) -> AppResult<i64> {
        let count = self.store.count_unread(conversation.id, viewer).await?;
        Ok(count)
    }

    pub async fn unread_count_for(
        &self,
        principal: &Principal,
        conversation_id: Uuid,
    ) -> AppResult<i64> {
        let conversation = self.directory.get_for(conversation_id, principal).await?;
        self.unread_count(&conversation, principal.user_id).await
    }

    /// One page of the caller's conversations with their unread counts
    pub async fn page(
        &self,
        principal: &Principal,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<ConversationUnread>> {
        let conversations = self.directory.list_for(principal, limit, offset).await?;
        let mut summary = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let unread_count = self.unread_count(&conversation, principal.user_id).await?;
            summary.push(ConversationUnread {
                conversation,
                unread_count,
            });
        }
        Ok(summary)
    }

    /// Unread counts across all of the caller's conversations
    pub async fn unread_summary(&self, principal: &Principal) -> AppResult<Vec<ConversationUnread>> {
        let mut summary = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.page(principal, SUMMARY_PAGE_SIZE, offset).await?;
            let fetched = page.len() as i64;
            summary.extend(page);
            if fetched < SUMMARY_PAGE_SIZE {
                break;
            }
            offset += fetched;
        }
        Ok(summary)
    }
}
