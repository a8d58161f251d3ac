use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use school_helper::bot;
use school_helper::config::{BotConfig, LogFormat};
use school_helper::dialogue::SessionStore;
use school_helper::generation::{OpenRouterClient, StructuredGenerator};
use school_helper::image_gen::FusionBrainClient;
use school_helper::localization::init_localization;
use school_helper::orchestrator::Orchestrator;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false),
            )
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_tracing(LogFormat::from_env());

    info!("Starting School Helper Telegram Bot");

    init_localization()?;
    let config = BotConfig::from_env()?;

    let completion = OpenRouterClient::new(&config.completion)?;
    let generator = StructuredGenerator::new(Arc::new(completion), config.generation.clone());

    info!(base_url = %config.image.base_url, "Connecting to image pipeline");
    let images = FusionBrainClient::connect(config.image.clone()).await;

    let orchestrator = Arc::new(Orchestrator::new(
        SessionStore::new(),
        generator,
        Arc::new(images),
    ));

    let bot = Bot::new(&config.telegram_token);

    info!("Bot initialized, starting dispatcher");

    let handler = dptree::entry().branch(Update::filter_message().endpoint({
        let orchestrator = Arc::clone(&orchestrator);
        move |bot: Bot, msg: Message| {
            let orchestrator = Arc::clone(&orchestrator);
            async move { bot::message_handler(bot, msg, orchestrator).await }
        }
    }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
