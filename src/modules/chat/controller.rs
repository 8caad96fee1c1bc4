use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;
use validator::Validate;

use crate::modules::chat::{
    model::{Conversation, ConversationEvent, SubmitRejection},
    schema::{
        ChatMessageResponse, ConversationListResponse, ConversationResponse,
        ConversationSummary, MessageResponse, SubmitMessageRequest, SubmitResponse,
        SuggestionsResponse,
    },
};
use crate::services::catalog;
use crate::AppState;

type ApiError = (StatusCode, Json<MessageResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(MessageResponse { message: message.into() }))
}

async fn find_conversation(state: &AppState, id: &str) -> Result<Arc<Conversation>, ApiError> {
    let id = Uuid::parse_str(id).map_err(|_| error(StatusCode::BAD_REQUEST, "Invalid ID format"))?;

    state
        .conversations
        .find_by_id(&id)
        .await
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Conversation not found"))
}

pub async fn create_conversation(
    State(state): State<AppState>,
) -> (StatusCode, Json<ConversationResponse>) {
    let conversation = state.conversations.create(Conversation::with_greeting()).await;
    tracing::info!(conversation = %conversation.id(), "conversation opened");

    (
        StatusCode::CREATED,
        Json(ConversationResponse::from(conversation.as_ref())),
    )
}

pub async fn list_conversations(State(state): State<AppState>) -> Json<ConversationListResponse> {
    let conversations = state.conversations.find_all(50).await;
    let total = state.conversations.count().await;

    Json(ConversationListResponse {
        data: conversations
            .iter()
            .map(|c| ConversationSummary::from(c.as_ref()))
            .collect(),
        total,
    })
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let conversation = find_conversation(&state, &id).await?;
    Ok(Json(ConversationResponse::from(conversation.as_ref())))
}

pub async fn submit_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<SubmitMessageRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    if let Err(e) = payload.validate() {
        return Err(error(StatusCode::BAD_REQUEST, e.to_string()));
    }

    let conversation = find_conversation(&state, &id).await?;

    let turn = state
        .orchestrator
        .submit(&conversation, &payload.message)
        .map_err(|rejection| {
            let status = match rejection {
                SubmitRejection::Empty => StatusCode::BAD_REQUEST,
                SubmitRejection::Busy => StatusCode::CONFLICT,
                SubmitRejection::Closed => StatusCode::GONE,
            };
            error(status, rejection.to_string())
        })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            conversation_id: conversation.id().to_string(),
            message: ChatMessageResponse::from(&turn.message),
            state: conversation.state(),
        }),
    ))
}

pub async fn conversation_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let conversation = find_conversation(&state, &id).await?;
    let receiver = conversation.subscribe();

    let stream = futures::stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(ConversationEvent::Closed) | Err(RecvError::Closed) => return None,
                Ok(event) => {
                    let sse = Event::default()
                        .event(event.kind())
                        .json_data(&event)
                        .unwrap_or_else(|_| Event::default().event(event.kind()));
                    return Some((Ok::<Event, Infallible>(sse), receiver));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "event subscriber lagged");
                }
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

pub async fn close_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| error(StatusCode::BAD_REQUEST, "Invalid ID format"))?;

    if state.conversations.delete(&id).await {
        tracing::info!(conversation = %id, "conversation closed");
        Ok(Json(MessageResponse {
            message: "Conversation closed".to_string(),
        }))
    } else {
        Err(error(StatusCode::NOT_FOUND, "Conversation not found"))
    }
}

pub async fn list_suggestions() -> Json<SuggestionsResponse> {
    Json(SuggestionsResponse {
        suggestions: catalog::QUICK_SUGGESTIONS
            .iter()
            .map(|s| s.to_string())
            .collect(),
    })
}
