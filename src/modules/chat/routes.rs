use axum::{
    routing::{get, post},
    Router,
};

use crate::modules::chat::controller;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/chat/conversations",
            post(controller::create_conversation).get(controller::list_conversations),
        )
        .route(
            "/api/chat/conversations/{id}",
            get(controller::get_conversation).delete(controller::close_conversation),
        )
        .route(
            "/api/chat/conversations/{id}/messages",
            post(controller::submit_message),
        )
        .route(
            "/api/chat/conversations/{id}/events",
            get(controller::conversation_events),
        )
        .route("/api/chat/suggestions", get(controller::list_suggestions))
}
