//! Shared fakes for the integration tests

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use teloxide::types::ChatId;

use school_helper::config::GenerationSettings;
use school_helper::dialogue::{OutboundText, SessionStore};
use school_helper::errors::ImageError;
use school_helper::generation::{CompletionApi, CompletionRequest, StructuredGenerator};
use school_helper::image_gen::{ImagePipeline, ImageRequest, SUPPORTED_STYLES};
use school_helper::orchestrator::{ChatTransport, Orchestrator};

/// Completion backend answering from a script, then failing
#[derive(Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = Result<S, S>>,
        S: Into<String>,
    {
        Arc::new(Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|reply| reply.map(Into::into).map_err(Into::into))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionApi for ScriptedCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("script exhausted")),
        }
    }
}

/// Settings with no pause between attempts
pub fn fast_settings() -> GenerationSettings {
    GenerationSettings {
        retry_delay: Duration::ZERO,
        ..Default::default()
    }
}

pub fn generator(api: Arc<ScriptedCompletion>) -> StructuredGenerator {
    StructuredGenerator::new(api, fast_settings())
}

/// Image service returning a fixed outcome
pub struct FakeImages {
    pub available: bool,
    pub payload: Result<String, ImageError>,
    pub submitted: Mutex<Vec<ImageRequest>>,
}

impl FakeImages {
    pub fn returning(payload: Result<String, ImageError>) -> Arc<Self> {
        Arc::new(Self {
            available: true,
            payload,
            submitted: Mutex::new(Vec::new()),
        })
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            available: false,
            payload: Err(ImageError::Unavailable),
            submitted: Mutex::new(Vec::new()),
        })
    }

    pub fn submitted(&self) -> Vec<ImageRequest> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImagePipeline for FakeImages {
    fn is_available(&self) -> bool {
        self.available
    }

    fn styles(&self) -> Vec<String> {
        SUPPORTED_STYLES.iter().map(|s| s.to_string()).collect()
    }

    async fn submit(&self, request: &ImageRequest) -> Result<String, ImageError> {
        if !self.available {
            return Err(ImageError::Unavailable);
        }
        self.submitted.lock().unwrap().push(request.clone());
        Ok("job-1".to_string())
    }

    async fn await_result(&self, _job_id: &str) -> Result<String, ImageError> {
        self.payload.clone()
    }
}

/// Something the orchestrator delivered
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text(OutboundText),
    Image(Vec<u8>),
}

/// Transport that records every delivery
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(ChatId, Sent)>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, sent)| sent.clone())
            .collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Text(message) => Some(message.text),
                Sent::Image(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(&self, chat_id: ChatId, message: &OutboundText) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((chat_id, Sent::Text(message.clone())));
        Ok(())
    }

    async fn send_image(&self, chat_id: ChatId, png: Vec<u8>) -> Result<()> {
        self.sent.lock().unwrap().push((chat_id, Sent::Image(png)));
        Ok(())
    }
}

pub fn orchestrator(api: Arc<ScriptedCompletion>, images: Arc<FakeImages>) -> Orchestrator {
    Orchestrator::new(SessionStore::new(), generator(api), images)
}

/// A valid question with the second answer correct
pub const QUESTION_REPLY: &str = "Сколько будет 2+2?_3_4_5_6_2";
