use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ProviderStatus {
    pub name: String,
    pub configured: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub open_conversations: usize,
    pub providers: Vec<ProviderStatus>,
}
