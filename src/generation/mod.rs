//! # Text Generation Module
//!
//! Client for the chat-completion endpoint and the generation policies built
//! on top of it:
//!
//! - `generate_structured`: retry until the output passes a validator
//! - quiz questions and recommendation pairs, both delimiter-encoded
//! - single-shot free-form explanations

pub mod prompts;
pub mod quiz;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{CompletionConfig, GenerationSettings, SamplingConfig};
use crate::errors::GenerationError;

pub use quiz::{is_valid_question, is_valid_recommendation, Question, RecommendationPair};

const REFERER: &str = "https://github.com/school-helper/school-helper-bot";
const TITLE: &str = "School Quiz Bot";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

/// A chat-completion backend
#[async_trait]
pub trait CompletionApi: Send + Sync {
    /// Run one completion and return the text of the first choice
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// OpenAI-compatible completion endpoint (OpenRouter by default)
pub struct OpenRouterClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl OpenRouterClient {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build completion HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl CompletionApi for OpenRouterClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.token)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", TITLE)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<CompletionResponse>()
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("Completion response contained no message"))
    }
}

/// Question schema plus non-blank fields
fn is_complete_question(text: &str) -> bool {
    Question::parse(text).is_some()
}

/// Generation policies on top of a completion backend
#[derive(Clone)]
pub struct StructuredGenerator {
    api: Arc<dyn CompletionApi>,
    settings: GenerationSettings,
}

impl StructuredGenerator {
    pub fn new(api: Arc<dyn CompletionApi>, settings: GenerationSettings) -> Self {
        Self { api, settings }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    fn request(&self, messages: Vec<ChatMessage>, sampling: &SamplingConfig) -> CompletionRequest {
        CompletionRequest {
            model: self.settings.model.clone(),
            messages,
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
        }
    }

    /// Call the endpoint until `validator` accepts the trimmed output
    ///
    /// Request failures count against `max_attempts` like invalid output does.
    /// The configured pause separates attempts; none follows the last one.
    pub async fn generate_structured(
        &self,
        request: &CompletionRequest,
        validator: fn(&str) -> bool,
        max_attempts: u32,
    ) -> Result<String, GenerationError> {
        for attempt in 1..=max_attempts {
            match self.api.complete(request).await {
                Ok(text) => {
                    let text = text.trim();
                    if validator(text) {
                        debug!(attempt, "Structured generation accepted");
                        return Ok(text.to_string());
                    }
                    warn!(attempt, output = %text, "Generated output does not match the schema");
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Completion request failed");
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.settings.retry_delay).await;
            }
        }

        Err(GenerationError::Exhausted {
            attempts: max_attempts,
        })
    }

    /// Generate a quiz question for a grade and subject
    pub async fn generate_question(
        &self,
        grade: u8,
        subject: &str,
    ) -> Result<Question, GenerationError> {
        let request = self.request(
            vec![ChatMessage::user(prompts::question_prompt(grade, subject))],
            &self.settings.question,
        );
        let text = self
            .generate_structured(&request, is_complete_question, self.settings.question_attempts)
            .await?;

        info!(grade, subject, "Quiz question generated");
        // The validator guarantees a parsable question
        Question::parse(&text).ok_or(GenerationError::Exhausted {
            attempts: self.settings.question_attempts,
        })
    }

    /// Two follow-up topics for `topic`, falling back to a fixed pair
    pub async fn recommend(&self, topic: &str) -> RecommendationPair {
        let request = self.request(
            vec![ChatMessage::user(prompts::recommendation_prompt(topic))],
            &self.settings.recommendation,
        );

        let pair = match self
            .generate_structured(
                &request,
                is_valid_recommendation,
                self.settings.recommendation_attempts,
            )
            .await
        {
            Ok(text) => RecommendationPair::parse(&text),
            Err(e) => {
                warn!(topic, error = %e, "Recommendation generation failed");
                None
            }
        };

        pair.unwrap_or_else(RecommendationPair::fallback)
    }

    /// Free-form explanation of a topic, no retries
    pub async fn explain(&self, topic: &str, grade: Option<u8>) -> Result<String, GenerationError> {
        let request = self.request(
            vec![
                ChatMessage::system(prompts::TUTOR_SYSTEM_PROMPT),
                ChatMessage::user(prompts::explanation_prompt(topic, grade)),
            ],
            &self.settings.explanation,
        );

        match self.api.complete(&request).await {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!(topic, error = %e, "Explanation request failed");
                Err(GenerationError::ExplanationUnavailable(e.to_string()))
            }
        }
    }
}
