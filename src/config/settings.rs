use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use validator::Validate;

use crate::modules::chat::crud::StoreLimits;
use crate::services::orchestrator::ReplyDelay;
use crate::services::provider::GenerationParams;

const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:1b";
const DEFAULT_HOSTED_MODEL_URL: &str =
    "https://api-inference.huggingface.co/models/microsoft/DialoGPT-medium";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("Invalid generation parameters: {0}")]
    InvalidGeneration(#[from] validator::ValidationErrors),
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub inference_timeout: Duration,
    pub huggingface_token: Option<String>,
    pub huggingface_model_url: String,
    pub reply_delay: ReplyDelay,
    pub generation: GenerationParams,
    pub store_limits: StoreLimits,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let generation = GenerationParams {
            temperature: parse(&lookup, "GENERATION_TEMPERATURE", 0.7)?,
            max_tokens: parse(&lookup, "GENERATION_MAX_TOKENS", 150)?,
            top_p: parse(&lookup, "GENERATION_TOP_P", 0.9)?,
        };
        generation.validate()?;

        let reply_delay = ReplyDelay::new(
            Duration::from_millis(parse(&lookup, "REPLY_DELAY_BASE_MS", 1500)?),
            Duration::from_millis(parse(&lookup, "REPLY_DELAY_JITTER_MS", 1000)?),
        );

        let max_open: usize = parse(&lookup, "MAX_OPEN_CONVERSATIONS", 1000)?;
        if max_open == 0 {
            return Err(ConfigError::InvalidValue {
                key: "MAX_OPEN_CONVERSATIONS",
                value: max_open.to_string(),
            });
        }
        let store_limits = StoreLimits {
            idle_ttl: Duration::from_secs(parse(&lookup, "CONVERSATION_IDLE_TTL_SECS", 3600)?),
            max_open,
        };

        Ok(Self {
            host: text("HOST", "127.0.0.1"),
            port: parse(&lookup, "PORT", 8080)?,
            ollama_base_url: text("OLLAMA_BASE_URL", DEFAULT_OLLAMA_BASE_URL),
            ollama_model: text("OLLAMA_MODEL", DEFAULT_OLLAMA_MODEL),
            inference_timeout: Duration::from_secs(parse(&lookup, "INFERENCE_TIMEOUT_SECS", 20)?),
            huggingface_token: lookup("HUGGINGFACE_TOKEN").filter(|t| !t.trim().is_empty()),
            huggingface_model_url: text("HUGGINGFACE_MODEL_URL", DEFAULT_HOSTED_MODEL_URL),
            reply_delay,
            generation,
            store_limits,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_with(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_local_setup() {
        let settings = settings_with(&[]).unwrap();

        assert_eq!(settings.ollama_base_url, "http://localhost:11434");
        assert_eq!(settings.ollama_model, "llama3.2:1b");
        assert_eq!(settings.inference_timeout, Duration::from_secs(20));
        assert!(settings.huggingface_token.is_none());
        assert_eq!(settings.generation, GenerationParams::default());
        assert_eq!(settings.reply_delay, ReplyDelay::default());
        assert_eq!(settings.store_limits, StoreLimits::default());
        assert_eq!(settings.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn overrides_are_applied() {
        let settings = settings_with(&[
            ("PORT", "9000"),
            ("OLLAMA_BASE_URL", "http://gpu-box:11434"),
            ("HUGGINGFACE_TOKEN", "hf_secret"),
            ("REPLY_DELAY_BASE_MS", "0"),
            ("REPLY_DELAY_JITTER_MS", "0"),
            ("GENERATION_MAX_TOKENS", "64"),
            ("CONVERSATION_IDLE_TTL_SECS", "900"),
            ("MAX_OPEN_CONVERSATIONS", "50"),
        ])
        .unwrap();

        assert_eq!(settings.port, 9000);
        assert_eq!(settings.ollama_base_url, "http://gpu-box:11434");
        assert_eq!(settings.huggingface_token.as_deref(), Some("hf_secret"));
        assert_eq!(settings.reply_delay, ReplyDelay::none());
        assert_eq!(settings.generation.max_tokens, 64);
        assert_eq!(settings.store_limits.idle_ttl, Duration::from_secs(900));
        assert_eq!(settings.store_limits.max_open, 50);
    }

    #[test]
    fn zero_conversation_cap_is_rejected() {
        let err = settings_with(&[("MAX_OPEN_CONVERSATIONS", "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "MAX_OPEN_CONVERSATIONS",
                ..
            }
        ));
    }

    #[test]
    fn blank_token_counts_as_missing() {
        let settings = settings_with(&[("HUGGINGFACE_TOKEN", "   ")]).unwrap();
        assert!(settings.huggingface_token.is_none());
    }

    #[test]
    fn unparsable_number_is_rejected() {
        let err = settings_with(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "PORT", .. }));
    }

    #[test]
    fn out_of_range_temperature_is_rejected() {
        let err = settings_with(&[("GENERATION_TEMPERATURE", "1.5")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidGeneration(_)));
    }
}
