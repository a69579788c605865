use crate::{
    error::AppError,
    middleware::AuthenticatedUser,
    models::{Message, MessagePayload},
    routes::conversations::PageQuery,
    state::AppState,
};
use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const DEFAULT_HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FileAttachment {
    pub name: String,
    pub url: String,
    pub size: i64,
    pub mime_type: Option<String>,
}

/// Exactly one of `content` or `file` must be present
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: Option<String>,
    pub file: Option<FileAttachment>,
    pub reply_to: Option<Uuid>,
}

impl SendMessageRequest {
    fn into_payload(self) -> Result<(MessagePayload, Option<Uuid>), AppError> {
        let payload = match (self.content, self.file) {
            (Some(content), None) => MessagePayload::text(content),
            (None, Some(file)) => MessagePayload::file(file.name, file.url, file.size, file.mime_type),
            (Some(_), Some(_)) => {
                return Err(AppError::Validation(
                    "send either content or file, not both".into(),
                ))
            }
            (None, None) => {
                return Err(AppError::Validation("content or file is required".into()))
            }
        };
        Ok((payload, self.reply_to))
    }
}

#[derive(Debug, Deserialize)]
pub struct EditMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub is_file: bool,
    /// Hidden once the message is deleted
    pub content: Option<String>,
    pub file: Option<FileAttachment>,
    pub reply_to: Option<Uuid>,
    pub sent_at: DateTime<Utc>,
    pub delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub is_image: bool,
    pub is_document: bool,
    pub formatted_size: String,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        let is_image = message.is_image();
        let is_document = message.is_document();
        let formatted_size = message.formatted_size();
        let (content, file) = if message.deleted {
            (None, None)
        } else {
            match &message.payload {
                MessagePayload::Text { content } => (Some(content.clone()), None),
                MessagePayload::File {
                    name,
                    url,
                    size,
                    mime_type,
                } => (
                    Some(name.clone()),
                    Some(FileAttachment {
                        name: name.clone(),
                        url: url.clone(),
                        size: *size,
                        mime_type: mime_type.clone(),
                    }),
                ),
            }
        };

        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            is_file: message.is_file(),
            content,
            file,
            reply_to: message.reply_to,
            sent_at: message.sent_at,
            delivered: message.delivered,
            delivered_at: message.delivered_at,
            read: message.read,
            read_at: message.read_at,
            edited: message.edited,
            edited_at: message.edited_at,
            deleted: message.deleted,
            deleted_at: message.deleted_at,
            is_image,
            is_document,
            formatted_size,
        }
    }
}

/// GET /conversations/{id}/messages
/// Message history in send order
#[get("/conversations/{id}/messages")]
pub async fn list_messages(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    conversation_id: web::Path<Uuid>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let messages = state
        .services
        .ledger
        .history(
            user.principal(),
            conversation_id.into_inner(),
            query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
            query.offset.unwrap_or(0),
        )
        .await?;

    let body: Vec<MessageResponse> = messages.into_iter().map(MessageResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// POST /conversations/{id}/messages
#[post("/conversations/{id}/messages")]
pub async fn send_message(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    conversation_id: web::Path<Uuid>,
    body: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let (payload, reply_to) = body.into_inner().into_payload()?;
    let message = state
        .services
        .ledger
        .send(user.principal(), conversation_id.into_inner(), payload, reply_to)
        .await?;

    Ok(HttpResponse::Created().json(MessageResponse::from(message)))
}

/// POST /messages/{id}/delivered
#[post("/messages/{id}/delivered")]
pub async fn mark_delivered(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    message_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let message = state
        .services
        .ledger
        .mark_delivered(user.principal(), message_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse::from(message)))
}

/// POST /messages/{id}/read
#[post("/messages/{id}/read")]
pub async fn mark_read(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    message_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let message = state
        .services
        .ledger
        .mark_read(user.principal(), message_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse::from(message)))
}

/// PUT /messages/{id}
#[put("/messages/{id}")]
pub async fn edit_message(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    message_id: web::Path<Uuid>,
    body: web::Json<EditMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let message = state
        .services
        .ledger
        .edit(user.principal(), message_id.into_inner(), &body.content)
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse::from(message)))
}

/// DELETE /messages/{id}
/// Soft delete; the record stays but its content is no longer shown
#[delete("/messages/{id}")]
pub async fn delete_message(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    message_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let message = state
        .services
        .ledger
        .delete(user.principal(), message_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse::from(message)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_requires_exactly_one_body_kind() {
        let neither = SendMessageRequest {
            content: None,
            file: None,
            reply_to: None,
        };
        assert!(neither.into_payload().is_err());

        let both = SendMessageRequest {
            content: Some("hi".into()),
            file: Some(FileAttachment {
                name: "a.pdf".into(),
                url: "https://x".into(),
                size: 1,
                mime_type: None,
            }),
            reply_to: None,
        };
        assert!(both.into_payload().is_err());
    }

    #[test]
    fn test_deleted_message_hides_content() {
        let mut message = Message::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            MessagePayload::file("grades.pdf", "https://x", 2_621_440, None),
            None,
            Utc::now(),
        );
        message.apply_delete(Utc::now());

        let response = MessageResponse::from(message);
        assert!(response.deleted);
        assert!(response.content.is_none());
        assert!(response.file.is_none());
        assert_eq!(response.formatted_size, "2.5 MB");
    }
}
