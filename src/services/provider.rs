use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

/// Coarse failure tag reported for a provider attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    ServiceUnreachable,
    BadResponse,
    Timeout,
}

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Service unreachable: {0}")]
    ServiceUnreachable(String),
    #[error("Bad response: {0}")]
    BadResponse(String),
    #[error("No response within {0:?}")]
    Timeout(Duration),
}

impl InferenceError {
    pub fn reason(&self) -> FailureReason {
        match self {
            InferenceError::ServiceUnreachable(_) => FailureReason::ServiceUnreachable,
            InferenceError::BadResponse(_) => FailureReason::BadResponse,
            InferenceError::Timeout(_) => FailureReason::Timeout,
        }
    }

    /// Classifies an error raised while sending a request.
    pub(crate) fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            InferenceError::Timeout(timeout)
        } else {
            InferenceError::ServiceUnreachable(err.to_string())
        }
    }

    /// Classifies an error raised while reading or decoding a successful response body.
    pub(crate) fn from_body(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            InferenceError::Timeout(timeout)
        } else {
            InferenceError::BadResponse(err.to_string())
        }
    }
}

/// Generated text on success, trimmed and never empty.
pub type InferenceResult = Result<String, InferenceError>;

/// Sampling options forwarded to every provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct GenerationParams {
    #[validate(range(min = 0.0, max = 1.0))]
    pub temperature: f32,
    #[validate(range(min = 1))]
    pub max_tokens: u32,
    #[validate(range(min = 0.0, max = 1.0))]
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 150,
            top_p: 0.9,
        }
    }
}

/// A text-generation backend the orchestrator can ask for a reply.
///
/// Implementations must resolve every failure into an [`InferenceError`];
/// nothing is allowed to panic or escape past `generate`.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the provider has what it needs to attempt a call.
    fn is_configured(&self) -> bool {
        true
    }

    async fn generate(&self, user_text: &str, params: &GenerationParams) -> InferenceResult;
}

/// Trims generated text, treating a blank result as a malformed payload.
pub(crate) fn non_empty(text: &str, field: &str) -> InferenceResult {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(InferenceError::BadResponse(format!("`{}` was empty", field)))
    } else {
        Ok(trimmed.to_string())
    }
}
