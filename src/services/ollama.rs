use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::settings::Settings;
use crate::services::persona;
use crate::services::provider::{
    non_empty, GenerationParams, InferenceError, InferenceProvider, InferenceResult,
};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

/// Client for a local Ollama server's `/api/generate` endpoint.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.ollama_base_url.clone(),
            settings.ollama_model.clone(),
            settings.inference_timeout,
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl InferenceProvider for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, user_text: &str, params: &GenerationParams) -> InferenceResult {
        let request = GenerateRequest {
            model: &self.model,
            prompt: persona::local_prompt(user_text),
            stream: false,
            options: GenerateOptions {
                temperature: params.temperature,
                top_p: params.top_p,
                max_tokens: params.max_tokens,
            },
        };

        tracing::debug!(model = %self.model, url = %self.endpoint(), "requesting local generation");

        let response = self
            .client
            .post(self.endpoint())
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| InferenceError::from_transport(e, self.timeout))?;

        if !response.status().is_success() {
            return Err(InferenceError::ServiceUnreachable(format!(
                "Ollama returned {}",
                response.status()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::from_body(e, self.timeout))?;

        match body.response {
            Some(text) => non_empty(&text, "response"),
            None => Err(InferenceError::BadResponse(
                "missing `response` field".to_string(),
            )),
        }
    }
}
