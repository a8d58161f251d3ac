//! Bot API implementation of the chat transport

use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode};
use tracing::debug;

use super::ui_builder::reply_keyboard;
use crate::dialogue::{OutboundText, TextFormat};
use crate::orchestrator::ChatTransport;

const IMAGE_FILE_NAME: &str = "image.png";

#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat_id: ChatId, message: &OutboundText) -> Result<()> {
        let mut request = self.bot.send_message(chat_id, message.text.clone());
        if message.format == TextFormat::Html {
            request = request.parse_mode(ParseMode::Html);
        }
        if let Some(keyboard) = &message.keyboard {
            request = request.reply_markup(reply_keyboard(keyboard));
        }

        request.await?;
        Ok(())
    }

    async fn send_image(&self, chat_id: ChatId, png: Vec<u8>) -> Result<()> {
        debug!(chat_id = %chat_id, bytes = png.len(), "Sending generated image");
        self.bot
            .send_photo(chat_id, InputFile::memory(png).file_name(IMAGE_FILE_NAME))
            .await?;
        Ok(())
    }
}
