use std::sync::Arc;

use axum::Router;

use crate::config::settings::Settings;
use crate::modules::chat::crud::{ConversationStore, StoreLimits};
use crate::services::orchestrator::ResponseOrchestrator;

pub mod config;
pub mod modules;
pub mod services;

#[derive(Clone)]
pub struct AppState {
    pub conversations: ConversationStore,
    pub orchestrator: Arc<ResponseOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: ResponseOrchestrator) -> Self {
        Self::with_limits(orchestrator, StoreLimits::default())
    }

    pub fn with_limits(orchestrator: ResponseOrchestrator, limits: StoreLimits) -> Self {
        Self {
            conversations: ConversationStore::with_limits(limits),
            orchestrator: Arc::new(orchestrator),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_limits(
            ResponseOrchestrator::from_settings(settings),
            settings.store_limits,
        )
    }
}

/// Every route the service exposes, bound to `state`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(modules::chat::routes::routes())
        .merge(modules::health::routes::routes())
        .with_state(state)
}
