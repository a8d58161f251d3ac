//! # Orchestrator
//!
//! Drives one chat message through the dialogue: load the chat's state, run
//! the transition, store the new state, deliver the outbound messages and
//! execute the requested remote work. The work's result is fed back into the
//! transition function as the next event until no request remains.
//!
//! Teloxide handles updates of one chat sequentially, so a chat never has two
//! turns in flight.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::types::ChatId;
use tracing::{debug, error, info, warn};

use crate::dialogue::render::{self, Outbound, OutboundText};
use crate::dialogue::{transition, DialogueContext, DialogueState, Event, Request, SessionStore};
use crate::errors::ImageError;
use crate::generation::StructuredGenerator;
use crate::image_gen::postprocess::decode_to_png;
use crate::image_gen::{ImagePipeline, ImageRequest};

/// Outgoing side of a chat
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, message: &OutboundText) -> Result<()>;

    /// Send PNG bytes as a photo
    async fn send_image(&self, chat_id: ChatId, png: Vec<u8>) -> Result<()>;
}

pub struct Orchestrator {
    sessions: SessionStore,
    generator: StructuredGenerator,
    images: Arc<dyn ImagePipeline>,
}

impl Orchestrator {
    pub fn new(
        sessions: SessionStore,
        generator: StructuredGenerator,
        images: Arc<dyn ImagePipeline>,
    ) -> Self {
        Self {
            sessions,
            generator,
            images,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn context(&self) -> DialogueContext {
        DialogueContext {
            image_available: self.images.is_available(),
            styles: self.images.styles(),
        }
    }

    /// Process one text message from `chat_id`
    pub async fn handle_text(
        &self,
        transport: &dyn ChatTransport,
        chat_id: ChatId,
        text: &str,
    ) -> Result<()> {
        let context = self.context();
        let mut state = self.sessions.get(chat_id).await;
        let mut event = Event::Text(text.trim().to_string());

        loop {
            debug!(chat_id = %chat_id, state = state.name(), event = event.name(), "Dialogue step");

            let step = match transition(&state, &context, event) {
                Ok(step) => step,
                Err(e) => {
                    error!(chat_id = %chat_id, error = %e, "Dialogue reached an impossible step, resetting");
                    self.sessions.clear(chat_id).await;
                    transport
                        .send_text(chat_id, &render::internal_error())
                        .await?;
                    return Ok(());
                }
            };

            if step.state != state {
                info!(chat_id = %chat_id, from = state.name(), to = step.state.name(), "Dialogue state changed");
            }
            self.sessions.save(chat_id, step.state.clone()).await;
            state = step.state;

            self.deliver(transport, chat_id, step.outbound).await?;

            match step.request {
                Some(request) => event = self.run(request).await,
                None => return Ok(()),
            }
        }
    }

    /// Send messages in order, stopping at the first transport failure
    async fn deliver(
        &self,
        transport: &dyn ChatTransport,
        chat_id: ChatId,
        outbound: Vec<Outbound>,
    ) -> Result<()> {
        for message in outbound {
            match message {
                Outbound::Text(text) => transport.send_text(chat_id, &text).await?,
                Outbound::Image(png) => transport.send_image(chat_id, png).await?,
            }
        }
        Ok(())
    }

    /// Execute a remote request and turn its outcome into an event
    pub async fn run(&self, request: Request) -> Event {
        match request {
            Request::Question { grade, subject } => {
                let result = self.generator.generate_question(grade, &subject).await;
                Event::QuestionGenerated { subject, result }
            }
            Request::Explanation { topic, grade } => {
                let result = self.generator.explain(&topic, grade).await;
                Event::ExplanationGenerated { topic, result }
            }
            Request::Recommendations { topic } => {
                let pair = self.generator.recommend(&topic).await;
                Event::RecommendationsFetched { topic, pair }
            }
            Request::Image(request) => Event::ImageGenerated(self.generate_image(&request).await),
        }
    }

    async fn generate_image(&self, request: &ImageRequest) -> Result<Vec<u8>, ImageError> {
        let job_id = self.images.submit(request).await?;
        let payload = self.images.await_result(&job_id).await?;

        // Image decoding is CPU-bound
        tokio::task::spawn_blocking(move || decode_to_png(&payload))
            .await
            .map_err(|e| {
                warn!(error = %e, "Image decoding task failed");
                ImageError::Decode(e.to_string())
            })?
    }

    /// Current state of a chat
    pub async fn state(&self, chat_id: ChatId) -> DialogueState {
        self.sessions.get(chat_id).await
    }
}
