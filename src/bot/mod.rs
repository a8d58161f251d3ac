//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: Routes incoming messages to the orchestrator
//! - `transport`: Sends rendered messages through the Bot API
//! - `ui_builder`: Converts reply keyboards into Telegram markup

pub mod message_handler;
pub mod transport;
pub mod ui_builder;

// Re-export main handler function for use in main.rs
pub use message_handler::message_handler;
pub use transport::TelegramTransport;
pub use ui_builder::reply_keyboard;
