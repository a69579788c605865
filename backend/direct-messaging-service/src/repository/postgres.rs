use super::{ChatStore, StoreError, StoreResult};
use crate::models::{Conversation, Message, MessagePayload, ParticipantPair};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const CONVERSATION_COLUMNS: &str =
    "id, participant_a, participant_b, active, last_activity_at, created_at";

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, content, is_file, file_url, \
     file_size, file_type, reply_to_id, sent_at, is_delivered, delivered_at, is_read, read_at, \
     is_edited, edited_at, is_deleted, deleted_at";

/// Row shape of the `messages` table
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    conversation_id: Uuid,
    sender_id: Uuid,
    content: String,
    is_file: bool,
    file_url: Option<String>,
    file_size: Option<i64>,
    file_type: Option<String>,
    reply_to_id: Option<Uuid>,
    sent_at: DateTime<Utc>,
    is_delivered: bool,
    delivered_at: Option<DateTime<Utc>>,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
    is_edited: bool,
    edited_at: Option<DateTime<Utc>>,
    is_deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<MessageRow> for Message {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let payload = if row.is_file {
            let (url, size) = match (row.file_url, row.file_size) {
                (Some(url), Some(size)) => (url, size),
                _ => {
                    return Err(StoreError::Corrupt(format!(
                        "file message {} is missing url or size",
                        row.id
                    )))
                }
            };
            MessagePayload::File {
                name: row.content,
                url,
                size,
                mime_type: row.file_type,
            }
        } else {
            MessagePayload::Text {
                content: row.content,
            }
        };

        Ok(Message {
            id: row.id,
            conversation_id: row.conversation_id,
            sender_id: row.sender_id,
            payload,
            reply_to: row.reply_to_id,
            sent_at: row.sent_at,
            delivered: row.is_delivered,
            delivered_at: row.delivered_at,
            read: row.is_read,
            read_at: row.read_at,
            edited: row.is_edited,
            edited_at: row.edited_at,
            deleted: row.is_deleted,
            deleted_at: row.deleted_at,
        })
    }
}

fn map_insert_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::Conflict,
        _ => StoreError::Database(e),
    }
}

fn into_message(row: Option<MessageRow>) -> StoreResult<Option<Message>> {
    row.map(Message::try_from).transpose()
}

/// PostgreSQL-backed chat store
#[derive(Clone)]
pub struct PgChatStore {
    pool: PgPool,
}

impl PgChatStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatStore for PgChatStore {
    async fn find_conversation(&self, id: Uuid) -> StoreResult<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(conversation)
    }

    async fn find_conversation_by_pair(
        &self,
        pair: ParticipantPair,
    ) -> StoreResult<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations \
             WHERE participant_a = $1 AND participant_b = $2"
        ))
        .bind(pair.low())
        .bind(pair.high())
        .fetch_optional(&self.pool)
        .await?;

        Ok(conversation)
    }

    async fn insert_conversation(&self, conversation: &Conversation) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO conversations (id, participant_a, participant_b, active, last_activity_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(conversation.id)
        .bind(conversation.participant_a)
        .bind(conversation.participant_b)
        .bind(conversation.active)
        .bind(conversation.last_activity_at)
        .bind(conversation.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;

        Ok(())
    }

    async fn touch_conversation(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE conversations
            SET last_activity_at = GREATEST(last_activity_at, $2)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_conversation_active(
        &self,
        id: Uuid,
        active: bool,
    ) -> StoreResult<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            "UPDATE conversations SET active = $2 WHERE id = $1 RETURNING {CONVERSATION_COLUMNS}"
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(conversation)
    }

    async fn list_conversations_for(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Conversation>> {
        let conversations = sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations \
             WHERE participant_a = $1 OR participant_b = $1 \
             ORDER BY last_activity_at DESC, id \
             LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(conversations)
    }

    async fn insert_message(&self, message: &Message) -> StoreResult<()> {
        let (file_url, file_size, file_type) = match &message.payload {
            MessagePayload::File {
                url,
                size,
                mime_type,
                ..
            } => (Some(url.as_str()), Some(*size), mime_type.as_deref()),
            MessagePayload::Text { .. } => (None, None, None),
        };

        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query(
            r#"
            UPDATE conversations
            SET active = TRUE, last_activity_at = GREATEST(last_activity_at, $2)
            WHERE id = $1
            "#,
        )
        .bind(message.conversation_id)
        .bind(message.sent_at)
        .execute(&mut *tx)
        .await?;
        if touched.rows_affected() == 0 {
            return Err(StoreError::Corrupt(format!(
                "message {} references unknown conversation {}",
                message.id, message.conversation_id
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO messages (
                id, conversation_id, sender_id, content, is_file, file_url, file_size, file_type,
                reply_to_id, sent_at, is_delivered, delivered_at, is_read, read_at,
                is_edited, edited_at, is_deleted, deleted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(message.content())
        .bind(message.is_file())
        .bind(file_url)
        .bind(file_size)
        .bind(file_type)
        .bind(message.reply_to)
        .bind(message.sent_at)
        .bind(message.delivered)
        .bind(message.delivered_at)
        .bind(message.read)
        .bind(message.read_at)
        .bind(message.edited)
        .bind(message.edited_at)
        .bind(message.deleted)
        .bind(message.deleted_at)
        .execute(&mut *tx)
        .await
        .map_err(map_insert_error)?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_message(&self, id: Uuid) -> StoreResult<Option<Message>> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        into_message(row)
    }

    async fn list_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE conversation_id = $1 \
             ORDER BY sent_at ASC, seq ASC \
             LIMIT $2 OFFSET $3"
        ))
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Message::try_from).collect()
    }

    async fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Option<Message>> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "UPDATE messages SET is_delivered = TRUE, delivered_at = $2 \
             WHERE id = $1 AND is_delivered = FALSE \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        into_message(row)
    }

    async fn mark_read(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Option<Message>> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "UPDATE messages SET is_read = TRUE, \
                 read_at = GREATEST($2, COALESCE(delivered_at, $2)), \
                 is_delivered = TRUE, delivered_at = COALESCE(delivered_at, $2) \
             WHERE id = $1 AND is_read = FALSE \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        into_message(row)
    }

    async fn update_content(
        &self,
        id: Uuid,
        content: &str,
        at: DateTime<Utc>,
        not_before: DateTime<Utc>,
    ) -> StoreResult<Option<Message>> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "UPDATE messages SET content = $2, is_edited = TRUE, \
                 edited_at = COALESCE(edited_at, $3) \
             WHERE id = $1 AND is_deleted = FALSE AND is_file = FALSE AND sent_at >= $4 \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(id)
        .bind(content)
        .bind(at)
        .bind(not_before)
        .fetch_optional(&self.pool)
        .await?;

        into_message(row)
    }

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Option<Message>> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "UPDATE messages SET is_deleted = TRUE, deleted_at = $2 \
             WHERE id = $1 AND is_deleted = FALSE \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        into_message(row)
    }

    async fn count_unread(&self, conversation_id: Uuid, viewer: Uuid) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM messages
            WHERE conversation_id = $1 AND sender_id <> $2 AND is_read = FALSE
            "#,
        )
        .bind(conversation_id)
        .bind(viewer)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
