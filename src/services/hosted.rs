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
struct HostedRequest {
    inputs: String,
    parameters: HostedParameters,
}

#[derive(Debug, Serialize)]
struct HostedParameters {
    max_length: u32,
    temperature: f32,
    do_sample: bool,
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    #[serde(default)]
    generated_text: Option<String>,
}

/// Client for a hosted text-generation API, used when the local model is down.
///
/// The client only talks to the network when an API token is configured.
#[derive(Clone)]
pub struct HostedClient {
    client: Client,
    model_url: String,
    api_token: Option<String>,
    timeout: Duration,
}

impl HostedClient {
    pub fn new(model_url: impl Into<String>, api_token: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            model_url: model_url.into(),
            api_token: api_token.filter(|t| !t.trim().is_empty()),
            timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.huggingface_model_url.clone(),
            settings.huggingface_token.clone(),
            settings.inference_timeout,
        )
    }
}

#[async_trait]
impl InferenceProvider for HostedClient {
    fn name(&self) -> &str {
        "huggingface"
    }

    fn is_configured(&self) -> bool {
        self.api_token.is_some()
    }

    async fn generate(&self, user_text: &str, params: &GenerationParams) -> InferenceResult {
        let Some(token) = self.api_token.as_deref() else {
            return Err(InferenceError::ServiceUnreachable(
                "no hosted inference token configured".to_string(),
            ));
        };

        let prompt = persona::hosted_prompt(user_text);
        let request = HostedRequest {
            inputs: prompt.clone(),
            parameters: HostedParameters {
                max_length: params.max_tokens,
                temperature: params.temperature,
                do_sample: true,
            },
        };

        tracing::debug!(url = %self.model_url, "requesting hosted generation");

        let response = self
            .client
            .post(&self.model_url)
            .timeout(self.timeout)
            .header("Authorization", format!("Bearer {}", token))
            .json(&request)
            .send()
            .await
            .map_err(|e| InferenceError::from_transport(e, self.timeout))?;

        if !response.status().is_success() {
            return Err(InferenceError::ServiceUnreachable(format!(
                "hosted inference returned {}",
                response.status()
            )));
        }

        let body: Vec<GeneratedText> = response
            .json()
            .await
            .map_err(|e| InferenceError::from_body(e, self.timeout))?;

        let generated = body
            .into_iter()
            .next()
            .and_then(|g| g.generated_text)
            .ok_or_else(|| InferenceError::BadResponse("missing `generated_text`".to_string()))?;

        non_empty(extract_reply(&generated, &prompt), "generated_text")
    }
}

/// Pulls the model's own turn out of `generated`.
///
/// Some models echo the prompt before continuing it; the echo is dropped first.
/// The remainder is cut at the next human turn so the continuation of the
/// dialogue never reaches the user.
fn extract_reply<'a>(generated: &'a str, prompt: &str) -> &'a str {
    let continuation = strip_echo(generated, prompt).unwrap_or(generated);
    persona::cut_at_stop_marker(continuation)
}

/// Returns what follows `prompt` at the start of `generated`, comparing
/// everything but whitespace. `None` if `generated` does not open with it.
fn strip_echo<'a>(generated: &'a str, prompt: &str) -> Option<&'a str> {
    let mut expected = prompt.chars().filter(|c| !c.is_whitespace()).peekable();

    for (idx, c) in generated.char_indices() {
        if expected.peek().is_none() {
            return Some(&generated[idx..]);
        }
        if c.is_whitespace() {
            continue;
        }
        if expected.next() != Some(c) {
            return None;
        }
    }

    expected.peek().is_none().then_some("")
}
