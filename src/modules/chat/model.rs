use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use uuid::Uuid;

use crate::services::catalog;

const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            role,
            content,
            created_at: Utc::now(),
        }
    }

    pub fn user(content: String) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: String) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn created_at_rfc3339(&self) -> String {
        self.created_at.to_rfc3339()
    }
}

/// Where a conversation is within the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Idle,
    AwaitingPrimary,
    AwaitingSecondary,
    AwaitingFallback,
    Delivering,
}

impl TurnState {
    pub fn is_idle(&self) -> bool {
        matches!(self, TurnState::Idle)
    }
}

/// Pushed to subscribers as the conversation changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ConversationEvent {
    Message(ChatMessage),
    Notice(String),
    State(TurnState),
    Closed,
}

impl ConversationEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ConversationEvent::Message(_) => "message",
            ConversationEvent::Notice(_) => "notice",
            ConversationEvent::State(_) => "state",
            ConversationEvent::Closed => "closed",
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    #[error("Message cannot be empty")]
    Empty,
    #[error("A reply is still on its way")]
    Busy,
    #[error("Conversation is closed")]
    Closed,
}

#[derive(Debug)]
struct ConversationInner {
    transcript: Vec<ChatMessage>,
    state: TurnState,
    notice: Option<String>,
    closed: bool,
    in_flight: Option<AbortHandle>,
    last_active: Instant,
}

/// One open chat: an append-only transcript plus the state of its current turn.
///
/// Only the orchestrator advances a turn. At most one turn is in flight; the
/// state is `Idle` between turns.
#[derive(Debug)]
pub struct Conversation {
    id: Uuid,
    created_at: DateTime<Utc>,
    inner: Mutex<ConversationInner>,
    events: broadcast::Sender<ConversationEvent>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            inner: Mutex::new(ConversationInner {
                transcript: Vec::new(),
                state: TurnState::Idle,
                notice: None,
                closed: false,
                in_flight: None,
                last_active: Instant::now(),
            }),
            events,
        }
    }

    /// A conversation that opens with the companion's greeting.
    pub fn with_greeting() -> Self {
        let conversation = Self::new();
        conversation
            .lock()
            .transcript
            .push(ChatMessage::assistant(catalog::GREETING.to_string()));
        conversation
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.lock().transcript.clone()
    }

    pub fn message_count(&self) -> usize {
        self.lock().transcript.len()
    }

    pub fn state(&self) -> TurnState {
        self.lock().state
    }

    /// The advisory raised during the latest turn, if any provider failed.
    pub fn notice(&self) -> Option<String> {
        self.lock().notice.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// When a message was last added, or creation time if none was.
    pub fn last_active(&self) -> Instant {
        self.lock().last_active
    }

    /// Time since the last message, counting only between turns. A turn in
    /// flight is never idle.
    pub fn idle_for(&self) -> Duration {
        let inner = self.lock();
        if inner.state.is_idle() {
            inner.last_active.elapsed()
        } else {
            Duration::ZERO
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.events.subscribe()
    }

    /// Disposes of the conversation. A turn still in flight is aborted and
    /// anything it would have delivered is dropped.
    pub fn close(&self) {
        let mut inner = self.lock();
        if inner.closed {
            return;
        }
        inner.closed = true;
        inner.state = TurnState::Idle;
        if let Some(handle) = inner.in_flight.take() {
            handle.abort();
        }
        self.emit(ConversationEvent::Closed);
    }

    /// Opens a turn for `text`: appends the user message and hands the turn to
    /// `start`, all under the conversation lock so two submissions cannot both
    /// pass the idle check.
    pub(crate) fn begin_turn<T, F>(
        &self,
        text: &str,
        start: F,
    ) -> Result<(ChatMessage, JoinHandle<T>), SubmitRejection>
    where
        F: FnOnce(String) -> JoinHandle<T>,
    {
        let content = text.trim();
        let mut inner = self.lock();

        if inner.closed {
            return Err(SubmitRejection::Closed);
        }
        if content.is_empty() {
            return Err(SubmitRejection::Empty);
        }
        if !inner.state.is_idle() {
            return Err(SubmitRejection::Busy);
        }

        let message = ChatMessage::user(content.to_string());
        inner.transcript.push(message.clone());
        inner.notice = None;
        inner.state = TurnState::AwaitingPrimary;
        inner.last_active = Instant::now();

        let handle = start(content.to_string());
        inner.in_flight = Some(handle.abort_handle());

        self.emit(ConversationEvent::Message(message.clone()));
        self.emit(ConversationEvent::State(TurnState::AwaitingPrimary));

        Ok((message, handle))
    }

    pub(crate) fn set_state(&self, state: TurnState) {
        let mut inner = self.lock();
        if inner.closed || inner.state == state {
            return;
        }
        inner.state = state;
        self.emit(ConversationEvent::State(state));
    }

    pub(crate) fn notify(&self, notice: String) {
        let mut inner = self.lock();
        if inner.closed {
            return;
        }
        inner.notice = Some(notice.clone());
        self.emit(ConversationEvent::Notice(notice));
    }

    /// Appends the assistant reply and ends the turn. Returns `None` when the
    /// conversation was closed in the meantime.
    pub(crate) fn deliver(&self, content: String) -> Option<ChatMessage> {
        let mut inner = self.lock();
        if inner.closed {
            return None;
        }

        let message = ChatMessage::assistant(content);
        inner.transcript.push(message.clone());
        inner.state = TurnState::Idle;
        inner.in_flight = None;
        inner.last_active = Instant::now();

        self.emit(ConversationEvent::Message(message.clone()));
        self.emit(ConversationEvent::State(TurnState::Idle));

        Some(message)
    }

    fn lock(&self) -> MutexGuard<'_, ConversationInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ConversationEvent) {
        // No subscribers is fine; the transcript is the source of truth.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_task() -> JoinHandle<()> {
        tokio::spawn(async {})
    }

    #[test]
    fn message_constructors_set_role() {
        assert_eq!(ChatMessage::user("hi".to_string()).role, Role::User);
        assert_eq!(ChatMessage::assistant("hey".to_string()).role, Role::Assistant);
    }

    #[test]
    fn message_ids_increase() {
        let first = ChatMessage::user("a".to_string());
        let second = ChatMessage::user("b".to_string());
        assert!(first.id < second.id);
    }

    #[test]
    fn greeting_seeds_the_transcript() {
        let conversation = Conversation::with_greeting();
        let transcript = conversation.transcript();

        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].role, Role::Assistant);
        assert_eq!(transcript[0].content, catalog::GREETING);
        assert!(conversation.state().is_idle());
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let value = serde_json::to_value(ConversationEvent::State(TurnState::AwaitingPrimary)).unwrap();
        assert_eq!(value["type"], "state");
        assert_eq!(value["data"], "awaiting_primary");
    }

    #[tokio::test]
    async fn blank_text_is_rejected_without_changes() {
        let conversation = Conversation::new();

        let err = conversation.begin_turn("  \n\t", |_| idle_task()).unwrap_err();

        assert_eq!(err, SubmitRejection::Empty);
        assert_eq!(conversation.message_count(), 0);
        assert_eq!(conversation.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn second_turn_is_rejected_while_first_is_open() {
        let conversation = Conversation::new();

        let (message, _) = conversation.begin_turn("  hello  ", |_| idle_task()).unwrap();
        assert_eq!(message.content, "hello");
        assert_eq!(conversation.state(), TurnState::AwaitingPrimary);

        let err = conversation.begin_turn("again", |_| idle_task()).unwrap_err();
        assert_eq!(err, SubmitRejection::Busy);
        assert_eq!(conversation.message_count(), 1);
    }

    #[tokio::test]
    async fn deliver_returns_to_idle() {
        let conversation = Conversation::new();
        conversation.begin_turn("hello", |_| idle_task()).unwrap();
        conversation.notify("local model is down".to_string());

        let reply = conversation.deliver("hi there".to_string()).unwrap();

        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(conversation.state(), TurnState::Idle);
        assert_eq!(conversation.message_count(), 2);
        assert_eq!(conversation.notice().as_deref(), Some("local model is down"));
    }

    #[tokio::test]
    async fn new_turn_clears_previous_notice() {
        let conversation = Conversation::new();
        conversation.begin_turn("one", |_| idle_task()).unwrap();
        conversation.notify("fallback used".to_string());
        conversation.deliver("reply".to_string());

        conversation.begin_turn("two", |_| idle_task()).unwrap();

        assert!(conversation.notice().is_none());
    }

    #[tokio::test]
    async fn closed_conversation_discards_late_reply() {
        let conversation = Conversation::new();
        conversation.begin_turn("hello", |_| idle_task()).unwrap();

        conversation.close();

        assert!(conversation.deliver("too late".to_string()).is_none());
        assert_eq!(conversation.message_count(), 1);
        assert_eq!(
            conversation.begin_turn("hello", |_| idle_task()).unwrap_err(),
            SubmitRejection::Closed
        );
    }

    #[tokio::test]
    async fn subscribers_see_turn_events() {
        let conversation = Conversation::new();
        let mut events = conversation.subscribe();

        conversation.begin_turn("hello", |_| idle_task()).unwrap();

        assert!(matches!(events.recv().await.unwrap(), ConversationEvent::Message(m) if m.role == Role::User));
        assert_eq!(
            events.recv().await.unwrap(),
            ConversationEvent::State(TurnState::AwaitingPrimary)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn idle_time_counts_only_between_turns() {
        let conversation = Conversation::new();
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(conversation.idle_for(), Duration::from_secs(30));

        conversation.begin_turn("hello", |_| idle_task()).unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(conversation.idle_for(), Duration::ZERO);

        conversation.deliver("hi".to_string());
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(conversation.idle_for(), Duration::from_secs(5));
    }
}
