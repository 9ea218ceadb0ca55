//! Limoka Telegram frontend.
//!
//! Wires [`limoka_search::LimokaService`] to a teloxide dispatcher: search
//! commands, inline navigation, query prompts and the signed install
//! watcher.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod bot;
pub mod callback;
pub mod chat;
pub mod error;
pub mod handler;
pub mod render;

pub use callback::PayloadStore;
pub use error::{TelegramBotError, TelegramResult};
