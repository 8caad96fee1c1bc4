use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::modules::chat::model::Conversation;

const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(3600); // 1 hour
const DEFAULT_MAX_OPEN: usize = 1000;
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// How long an idle conversation survives and how many may be open at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    pub idle_ttl: Duration,
    pub max_open: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            idle_ttl: DEFAULT_IDLE_TTL,
            max_open: DEFAULT_MAX_OPEN,
        }
    }
}

/// Conversations open in this process. Nothing outlives a restart.
///
/// Evicted conversations are closed, so a reply still in flight is dropped
/// exactly as if the client had deleted it.
#[derive(Clone, Default)]
pub struct ConversationStore {
    conversations: Arc<RwLock<HashMap<Uuid, Arc<Conversation>>>>,
    limits: StoreLimits,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: StoreLimits) -> Self {
        Self {
            conversations: Arc::default(),
            limits,
        }
    }

    /// Stores `conversation`, first evicting the least recently active ones
    /// if the store is full.
    pub async fn create(&self, conversation: Conversation) -> Arc<Conversation> {
        let conversation = Arc::new(conversation);
        let mut conversations = self.conversations.write().await;

        while conversations.len() >= self.limits.max_open.max(1) {
            let Some(oldest) = conversations
                .values()
                .min_by_key(|c| c.last_active())
                .map(|c| c.id())
            else {
                break;
            };
            if let Some(evicted) = conversations.remove(&oldest) {
                evicted.close();
                tracing::info!(conversation = %oldest, "store full, evicted least recently active");
            }
        }

        conversations.insert(conversation.id(), Arc::clone(&conversation));
        conversation
    }

    pub async fn find_by_id(&self, id: &Uuid) -> Option<Arc<Conversation>> {
        self.conversations.read().await.get(id).cloned()
    }

    /// Most recently opened first.
    pub async fn find_all(&self, limit: usize) -> Vec<Arc<Conversation>> {
        let mut all: Vec<_> = self.conversations.read().await.values().cloned().collect();
        all.sort_by_key(|c| std::cmp::Reverse(c.created_at()));
        all.truncate(limit);
        all
    }

    pub async fn count(&self) -> usize {
        self.conversations.read().await.len()
    }

    /// Removes and closes the conversation. Returns `false` if it was unknown.
    pub async fn delete(&self, id: &Uuid) -> bool {
        let removed = self.conversations.write().await.remove(id);
        match removed {
            Some(conversation) => {
                conversation.close();
                true
            }
            None => false,
        }
    }

    /// Closes and drops every conversation idle for at least the TTL.
    /// Returns how many went.
    pub async fn evict_idle(&self) -> usize {
        let ttl = self.limits.idle_ttl;
        let mut conversations = self.conversations.write().await;

        let expired: Vec<Uuid> = conversations
            .values()
            .filter(|c| c.idle_for() >= ttl)
            .map(|c| c.id())
            .collect();

        for id in &expired {
            if let Some(conversation) = conversations.remove(id) {
                conversation.close();
            }
        }

        if !expired.is_empty() {
            tracing::info!(evicted = expired.len(), "evicted idle conversations");
        }
        expired.len()
    }

    /// Runs `evict_idle` in the background for the life of the process.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let store = self.clone();
        let period = (self.limits.idle_ttl / 2)
            .clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                store.evict_idle().await;
            }
        })
    }
}
