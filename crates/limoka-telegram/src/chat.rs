//! Telegram side of the install pipeline.

use async_trait::async_trait;
use limoka_search::{DirectiveChat, DirectiveError, InboundMessage};
use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode};

/// Performs install replies, deletions and acknowledgements through the bot.
#[derive(Clone)]
pub struct TelegramDirectiveChat {
    bot: Bot,
}

impl TelegramDirectiveChat {
    /// Wrap a bot handle.
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn message_id(message: &InboundMessage) -> Result<MessageId, DirectiveError> {
    i32::try_from(message.id)
        .map(MessageId)
        .map_err(|_| DirectiveError::Chat(format!("message id {} out of range", message.id)))
}

fn chat_error(e: &teloxide::RequestError) -> DirectiveError {
    DirectiveError::Chat(e.to_string())
}

#[async_trait]
impl DirectiveChat for TelegramDirectiveChat {
    async fn reply(&self, message: &InboundMessage, html: &str) -> Result<(), DirectiveError> {
        self.bot
            .send_message(ChatId(message.chat_id), html)
            .parse_mode(ParseMode::Html)
            .await
            .map(|_| ())
            .map_err(|e| chat_error(&e))
    }

    async fn delete(&self, message: &InboundMessage) -> Result<(), DirectiveError> {
        self.bot
            .delete_message(ChatId(message.chat_id), message_id(message)?)
            .await
            .map(|_| ())
            .map_err(|e| chat_error(&e))
    }

    async fn notify(&self, user_id: i64, text: &str) -> Result<(), DirectiveError> {
        self.bot
            .send_message(ChatId(user_id), text)
            .await
            .map(|_| ())
            .map_err(|e| chat_error(&e))
    }
}
