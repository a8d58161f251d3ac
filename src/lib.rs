//! # School Helper Telegram Bot
//!
//! A Telegram bot for schoolchildren: multiple-choice quizzes by grade and
//! subject, topic explanations with follow-up recommendations, image
//! generation through an asynchronous pipeline, and a keypad calculator.

pub mod bot;
pub mod calculator;
pub mod config;
pub mod dialogue;
pub mod errors;
pub mod generation;
pub mod image_gen;
pub mod localization;
pub mod orchestrator;
pub mod subjects;
