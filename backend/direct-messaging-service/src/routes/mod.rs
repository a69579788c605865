pub mod conversations;
pub mod messages;

use actix_web::{get, web, HttpResponse, Responder};

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Registers every route; `/health` stays outside the versioned scope
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(
        web::scope("/api/v1")
            .service(conversations::open_conversation)
            .service(conversations::list_conversations)
            .service(conversations::get_unread_count)
            .service(conversations::deactivate_conversation)
            .service(conversations::get_conversation)
            .service(messages::list_messages)
            .service(messages::send_message)
            .service(messages::mark_delivered)
            .service(messages::mark_read)
            .service(messages::edit_message)
            .service(messages::delete_message),
    );
}
