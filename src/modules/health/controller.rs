use axum::{extract::State, Json};

use crate::modules::health::schema::{HealthResponse, ProviderStatus};
use crate::AppState;

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let providers = state
        .orchestrator
        .providers()
        .map(|p| ProviderStatus {
            name: p.name().to_string(),
            configured: p.is_configured(),
        })
        .collect();

    Json(HealthResponse {
        status: "ok",
        open_conversations: state.conversations.count().await,
        providers,
    })
}
