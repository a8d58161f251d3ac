//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, error};

use crate::dialogue::render;
use crate::orchestrator::{ChatTransport, Orchestrator};

use super::transport::TelegramTransport;

async fn handle_text_message(
    transport: &TelegramTransport,
    msg: &Message,
    orchestrator: &Orchestrator,
    text: &str,
) -> Result<()> {
    debug!(user_id = %msg.chat.id, message_length = text.len(), "Received text message from user");

    if let Err(e) = orchestrator.handle_text(transport, msg.chat.id, text).await {
        error!(user_id = %msg.chat.id, error = %e, "Failed to process text message");
        // Best effort, the transport itself may be what failed
        let _ = transport
            .send_text(msg.chat.id, &render::internal_error())
            .await;
    }
    Ok(())
}

async fn handle_unsupported_message(transport: &TelegramTransport, msg: &Message) -> Result<()> {
    debug!(user_id = %msg.chat.id, "Received unsupported message type from user");
    transport
        .send_text(msg.chat.id, &render::unknown_input())
        .await
}

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    orchestrator: Arc<Orchestrator>,
) -> Result<()> {
    let transport = TelegramTransport::new(bot);

    if let Some(text) = msg.text() {
        handle_text_message(&transport, &msg, &orchestrator, text).await?;
    } else {
        handle_unsupported_message(&transport, &msg).await?;
    }

    Ok(())
}
