//! # Configuration Module
//!
//! Runtime configuration for the bot: credentials and endpoints read from the
//! environment, plus tuning for the generation retry loop and the image
//! status poll.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

// Constants for remote services
pub const DEFAULT_AI_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_AI_MODEL: &str = "deepseek/deepseek-chat";
pub const DEFAULT_FUSION_BRAIN_URL: &str = "https://api-key.fusionbrain.ai/key/api/v1/";
pub const DEFAULT_IMAGE_SIZE: u32 = 1024;

/// Sampling parameters for one kind of completion call
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Settings for the text-generation calls
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Model name sent with every completion request
    pub model: String,
    pub question: SamplingConfig,
    pub recommendation: SamplingConfig,
    pub explanation: SamplingConfig,
    /// Attempts for question generation before giving up
    pub question_attempts: u32,
    /// Attempts for the recommendation pair before falling back
    pub recommendation_attempts: u32,
    /// Fixed pause between two attempts
    pub retry_delay: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_AI_MODEL.to_string(),
            question: SamplingConfig {
                temperature: 1.5,
                max_tokens: 200,
            },
            recommendation: SamplingConfig {
                temperature: 0.7,
                max_tokens: 200,
            },
            explanation: SamplingConfig {
                temperature: 0.7,
                max_tokens: 1500,
            },
            question_attempts: 5,
            recommendation_attempts: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Bounded polling of an image job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            delay: Duration::from_secs(10),
        }
    }
}

/// Completion endpoint connection settings
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub base_url: String,
    pub token: String,
    pub timeout: Duration,
}

/// Image pipeline connection settings
#[derive(Debug, Clone)]
pub struct ImageServiceConfig {
    /// Base URL, ends with a slash
    pub base_url: String,
    pub api_key: String,
    pub secret_key: String,
    /// Timeout for the listing and status requests
    pub request_timeout: Duration,
    /// Timeout for the job submission
    pub submit_timeout: Duration,
    pub poll: PollSettings,
}

impl ImageServiceConfig {
    pub fn new(base_url: &str, api_key: &str, secret_key: &str) -> Self {
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            base_url,
            api_key: api_key.to_string(),
            secret_key: secret_key.to_string(),
            request_timeout: Duration::from_secs(10),
            submit_timeout: Duration::from_secs(30),
            poll: PollSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// `LOG_FORMAT=json` selects JSON lines, anything else plain text
    pub fn from_env() -> Self {
        match optional("LOG_FORMAT", "text").to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Complete bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram_token: String,
    pub completion: CompletionConfig,
    pub image: ImageServiceConfig,
    pub generation: GenerationSettings,
    pub log_format: LogFormat,
}

impl BotConfig {
    /// Build the configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let telegram_token = required("TELEGRAM_BOT_TOKEN")?;

        let completion = CompletionConfig {
            base_url: optional("AI_BASE_URL", DEFAULT_AI_BASE_URL),
            token: required("AI_TOKEN")?,
            timeout: Duration::from_secs(60),
        };

        let image = ImageServiceConfig::new(
            &optional("FUSION_BRAIN_URL", DEFAULT_FUSION_BRAIN_URL),
            &required("FUSION_BRAIN_API_KEY")?,
            &required("FUSION_BRAIN_SECRET_KEY")?,
        );

        let generation = GenerationSettings {
            model: optional("AI_MODEL", DEFAULT_AI_MODEL),
            ..Default::default()
        };

        let log_format = LogFormat::from_env();

        Ok(Self {
            telegram_token,
            completion,
            image,
            generation,
            log_format,
        })
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{name} must be set"))
}

fn optional(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
