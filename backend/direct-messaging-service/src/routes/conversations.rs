use crate::{
    error::AppError, middleware::AuthenticatedUser, models::Conversation, state::AppState,
};
use actix_web::{get, post, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(Deserialize)]
pub struct OpenConversationRequest {
    pub peer_id: Uuid,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Serialize)]
pub struct ConversationResponse {
    pub id: Uuid,
    pub participant_a: Uuid,
    pub participant_b: Uuid,
    pub peer_id: Option<Uuid>,
    pub active: bool,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<i64>,
}

impl ConversationResponse {
    pub fn for_viewer(conversation: Conversation, viewer: Uuid, unread: Option<i64>) -> Self {
        Self {
            peer_id: conversation.other_participant(viewer),
            id: conversation.id,
            participant_a: conversation.participant_a,
            participant_b: conversation.participant_b,
            active: conversation.active,
            last_activity_at: conversation.last_activity_at,
            created_at: conversation.created_at,
            unread_count: unread,
        }
    }
}

#[derive(Serialize)]
pub struct UnreadCountResponse {
    pub conversation_id: Uuid,
    pub unread_count: i64,
}

/// POST /conversations
/// Open (or fetch) the conversation with a peer
#[post("/conversations")]
pub async fn open_conversation(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<OpenConversationRequest>,
) -> Result<HttpResponse, AppError> {
    let principal = user.principal();
    let conversation = state
        .services
        .directory
        .open_with(principal, body.peer_id)
        .await?;

    Ok(HttpResponse::Ok().json(ConversationResponse::for_viewer(
        conversation,
        principal.user_id,
        None,
    )))
}

/// GET /conversations
/// Caller's conversations, most recent first, with unread counts
#[get("/conversations")]
pub async fn list_conversations(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let principal = user.principal();
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    let page = state.services.unread.page(principal, limit, offset).await?;
    let body: Vec<ConversationResponse> = page
        .into_iter()
        .map(|entry| {
            ConversationResponse::for_viewer(
                entry.conversation,
                principal.user_id,
                Some(entry.unread_count),
            )
        })
        .collect();

    Ok(HttpResponse::Ok().json(body))
}

/// GET /conversations/{id}
#[get("/conversations/{id}")]
pub async fn get_conversation(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    conversation_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let principal = user.principal();
    let conversation = state
        .services
        .directory
        .get_for(conversation_id.into_inner(), principal)
        .await?;
    let unread = state
        .services
        .unread
        .unread_count(&conversation, principal.user_id)
        .await?;

    Ok(HttpResponse::Ok().json(ConversationResponse::for_viewer(
        conversation,
        principal.user_id,
        Some(unread),
    )))
}

/// POST /conversations/{id}/deactivate
#[post("/conversations/{id}/deactivate")]
pub async fn deactivate_conversation(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    conversation_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let principal = user.principal();
    let conversation = state
        .services
        .directory
        .deactivate(conversation_id.into_inner(), principal)
        .await?;

    Ok(HttpResponse::Ok().json(ConversationResponse::for_viewer(
        conversation,
        principal.user_id,
        None,
    )))
}

/// GET /conversations/{id}/unread-count
#[get("/conversations/{id}/unread-count")]
pub async fn get_unread_count(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    conversation_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let conversation_id = conversation_id.into_inner();
    let count = state
        .services
        .unread
        .unread_count_for(user.principal(), conversation_id)
        .await?;

    Ok(HttpResponse::Ok().json(UnreadCountResponse {
        conversation_id,
        unread_count: count,
    }))
}
