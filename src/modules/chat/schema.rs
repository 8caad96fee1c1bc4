use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::modules::chat::model::{ChatMessage, Conversation, Role, TurnState};

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitMessageRequest {
    #[validate(length(min = 1, max = 4000, message = "Message must be 1-4000 characters"))]
    pub message: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct ChatMessageResponse {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub created_at: String,
}

impl From<&ChatMessage> for ChatMessageResponse {
    fn from(m: &ChatMessage) -> Self {
        Self {
            id: m.id.to_string(),
            role: m.role,
            content: m.content.clone(),
            created_at: m.created_at_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub id: String,
    pub state: TurnState,
    pub notice: Option<String>,
    pub messages: Vec<ChatMessageResponse>,
    pub message_count: usize,
    pub created_at: String,
}

impl From<&Conversation> for ConversationResponse {
    fn from(c: &Conversation) -> Self {
        let messages: Vec<ChatMessageResponse> =
            c.transcript().iter().map(ChatMessageResponse::from).collect();
        Self {
            id: c.id().to_string(),
            state: c.state(),
            notice: c.notice(),
            message_count: messages.len(),
            messages,
            created_at: c.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConversationSummary {
    pub id: String,
    pub state: TurnState,
    pub message_count: usize,
    pub created_at: String,
}

impl From<&Conversation> for ConversationSummary {
    fn from(c: &Conversation) -> Self {
        Self {
            id: c.id().to_string(),
            state: c.state(),
            message_count: c.message_count(),
            created_at: c.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub data: Vec<ConversationSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub conversation_id: String,
    pub message: ChatMessageResponse,
    pub state: TurnState,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
