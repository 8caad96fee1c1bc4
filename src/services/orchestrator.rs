use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;

use crate::config::settings::Settings;
use crate::modules::chat::model::{ChatMessage, Conversation, SubmitRejection, TurnState};
use crate::services::catalog::{self, ResponseCategory};
use crate::services::hosted::HostedClient;
use crate::services::ollama::OllamaClient;
use crate::services::provider::{
    GenerationParams, InferenceError, InferenceProvider, InferenceResult,
};

const LOCAL_UNAVAILABLE: &str =
    "Local AI not running. Please start Ollama first, or using empathetic responses.";
const HOSTED_UNAVAILABLE: &str = "Hosted AI unavailable, using supportive fallback.";

/// Pause before a reply lands: `base` plus up to `jitter`, uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyDelay {
    pub base: Duration,
    pub jitter: Duration,
}

impl ReplyDelay {
    pub fn new(base: Duration, jitter: Duration) -> Self {
        Self { base, jitter }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.base;
        }
        self.base + Duration::from_millis(rng.gen_range(0..=jitter_ms))
    }
}

impl Default for ReplyDelay {
    fn default() -> Self {
        Self::new(Duration::from_millis(1500), Duration::from_millis(1000))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Primary,
    Secondary,
    Fallback(ResponseCategory),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
}

struct Stage {
    state: TurnState,
    source: ReplySource,
    advisory: &'static str,
    provider: Arc<dyn InferenceProvider>,
}

/// A turn that has been accepted and is running in the background.
#[derive(Debug)]
pub struct Turn {
    pub message: ChatMessage,
    handle: JoinHandle<Option<ChatMessage>>,
}

impl Turn {
    /// Waits for the assistant reply. `None` if the conversation was closed first.
    pub async fn reply(self) -> Option<ChatMessage> {
        self.handle.await.ok().flatten()
    }
}

/// Runs the reply pipeline: local model, then hosted model, then catalog.
pub struct ResponseOrchestrator {
    stages: Vec<Stage>,
    params: GenerationParams,
    delay: ReplyDelay,
    rng: Mutex<StdRng>,
}

impl ResponseOrchestrator {
    pub fn new(primary: Arc<dyn InferenceProvider>, secondary: Arc<dyn InferenceProvider>) -> Self {
        let stages = vec![
            Stage {
                state: TurnState::AwaitingPrimary,
                source: ReplySource::Primary,
                advisory: LOCAL_UNAVAILABLE,
                provider: primary,
            },
            Stage {
                state: TurnState::AwaitingSecondary,
                source: ReplySource::Secondary,
                advisory: HOSTED_UNAVAILABLE,
                provider: secondary,
            },
        ];

        Self {
            stages,
            params: GenerationParams::default(),
            delay: ReplyDelay::default(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(OllamaClient::from_settings(settings)),
            Arc::new(HostedClient::from_settings(settings)),
        )
        .with_params(settings.generation)
        .with_delay(settings.reply_delay)
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_delay(mut self, delay: ReplyDelay) -> Self {
        self.delay = delay;
        self
    }

    /// Makes template choice and reply delay reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn providers(&self) -> impl Iterator<Item = &dyn InferenceProvider> {
        self.stages.iter().map(|s| s.provider.as_ref())
    }

    /// Accepts `text` into `conversation` and starts its turn in the background.
    ///
    /// Blank text, a turn already in flight, or a closed conversation leave the
    /// conversation untouched.
    pub fn submit(
        self: &Arc<Self>,
        conversation: &Arc<Conversation>,
        text: &str,
    ) -> Result<Turn, SubmitRejection> {
        let (message, handle) = conversation.begin_turn(text, |user_text| {
            let orchestrator = Arc::clone(self);
            let conversation = Arc::clone(conversation);
            tokio::spawn(async move { orchestrator.run_turn(&conversation, &user_text).await })
        })?;

        tracing::info!(conversation = %conversation.id(), "turn started");
        Ok(Turn { message, handle })
    }

    /// Produces a reply for `user_text`, trying each provider before falling
    /// back to the catalog. Never fails.
    pub async fn respond(&self, conversation: &Conversation, user_text: &str) -> Reply {
        for stage in &self.stages {
            conversation.set_state(stage.state);
            let provider = stage.provider.name();

            tracing::debug!(provider, "asking provider");
            match self.ask(stage, user_text).await {
                Ok(text) => {
                    return Reply {
                        text,
                        source: stage.source,
                    }
                }
                Err(err) => {
                    self.report_failure(conversation, stage, &err);
                }
            }
        }

        conversation.set_state(TurnState::AwaitingFallback);
        let (category, text) = catalog::respond(user_text, &mut *self.rng());
        Reply {
            text: text.to_string(),
            source: ReplySource::Fallback(category),
        }
    }

    // A panicking provider counts as a bad answer so the turn still ends.
    async fn ask(&self, stage: &Stage, user_text: &str) -> InferenceResult {
        AssertUnwindSafe(stage.provider.generate(user_text, &self.params))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                Err(InferenceError::BadResponse(format!(
                    "{} panicked while generating",
                    stage.provider.name()
                )))
            })
    }

    async fn run_turn(&self, conversation: &Conversation, user_text: &str) -> Option<ChatMessage> {
        let reply = self.respond(conversation, user_text).await;

        conversation.set_state(TurnState::Delivering);
        let pause = self.delay.sample(&mut *self.rng());
        tokio::time::sleep(pause).await;

        let delivered = conversation.deliver(reply.text);
        match &delivered {
            Some(_) => tracing::info!(
                conversation = %conversation.id(),
                source = ?reply.source,
                "reply delivered"
            ),
            None => tracing::debug!(
                conversation = %conversation.id(),
                "conversation closed, reply dropped"
            ),
        }
        delivered
    }

    fn report_failure(&self, conversation: &Conversation, stage: &Stage, err: &InferenceError) {
        tracing::warn!(
            provider = stage.provider.name(),
            reason = ?err.reason(),
            "provider failed: {}",
            err
        );
        conversation.notify(stage.advisory.to_string());
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
