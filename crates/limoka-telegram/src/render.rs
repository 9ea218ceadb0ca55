//! Turning navigation views into Telegram messages.

use limoka_search::nav::{Keyboard, View};
use teloxide::prelude::*;
use teloxide::{ApiError, RequestError};
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, InputFile, InputMedia, InputMediaPhoto, MessageId,
    ParseMode,
};
use tracing::{debug, warn};
use url::Url;

use crate::callback::PayloadStore;
use crate::error::TelegramResult;

/// Build the inline keyboard, storing oversized payloads.
pub async fn markup(keyboard: &Keyboard, payloads: &PayloadStore) -> InlineKeyboardMarkup {
    let mut rows = Vec::with_capacity(keyboard.rows.len());
    for row in &keyboard.rows {
        let mut buttons = Vec::with_capacity(row.len());
        for button in row {
            buttons.push(InlineKeyboardButton::callback(
                button.text.clone(),
                payloads.encode(&button.payload).await,
            ));
        }
        rows.push(buttons);
    }
    InlineKeyboardMarkup::new(rows)
}

fn photo_url(view: &View) -> Option<Url> {
    let photo = view.photo.as_deref()?;
    match Url::parse(photo) {
        Ok(url) => Some(url),
        Err(e) => {
            debug!(photo, error = %e, "unusable photo url");
            None
        },
    }
}

/// Send `view` as a new message.
///
/// A photo Telegram refuses falls back to a text message carrying the full
/// body rather than the caption.
pub async fn send_view(
    bot: &Bot,
    chat_id: ChatId,
    view: &View,
    payloads: &PayloadStore,
) -> TelegramResult<Message> {
    let markup = markup(&view.keyboard, payloads).await;
    if let Some(url) = photo_url(view) {
        match bot
            .send_photo(chat_id, InputFile::url(url))
            .caption(view.text.clone())
            .parse_mode(ParseMode::Html)
            .reply_markup(markup.clone())
            .await
        {
            Ok(message) => return Ok(message),
            Err(e) => warn!(error = %e, "failed to send photo, sending text"),
        }
    }
    Ok(bot
        .send_message(chat_id, view.text_without_photo().to_owned())
        .parse_mode(ParseMode::Html)
        .reply_markup(markup)
        .await?)
}

/// Replace the interactive message `message_id` with `view`.
///
/// Edits in place when the message kind (photo or text) is unchanged;
/// otherwise the old message is deleted and a new one sent.
pub async fn replace_view(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    had_photo: bool,
    view: &View,
    payloads: &PayloadStore,
) -> TelegramResult<()> {
    let url = photo_url(view);
    let edited = match (&url, had_photo) {
        (Some(url), true) => {
            let media = InputMedia::Photo(
                InputMediaPhoto::new(InputFile::url(url.clone()))
                    .caption(view.text.clone())
                    .parse_mode(ParseMode::Html),
            );
            bot.edit_message_media(chat_id, message_id, media)
                .reply_markup(markup(&view.keyboard, payloads).await)
                .await
                .map(|_| ())
        },
        (None, false) => bot
            .edit_message_text(chat_id, message_id, view.text_without_photo().to_owned())
            .parse_mode(ParseMode::Html)
            .reply_markup(markup(&view.keyboard, payloads).await)
            .await
            .map(|_| ()),
        _ => {
            if let Err(e) = bot.delete_message(chat_id, message_id).await {
                debug!(error = %e, "failed to delete message before resend");
            }
            send_view(bot, chat_id, view, payloads).await?;
            return Ok(());
        },
    };

    match edited {
        Ok(()) => Ok(()),
        Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
        Err(e) => {
            warn!(error = %e, "edit failed, resending view");
            if let Err(e) = bot.delete_message(chat_id, message_id).await {
                debug!(error = %e, "failed to delete message before resend");
            }
            send_view(bot, chat_id, view, payloads).await?;
            Ok(())
        },
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use limoka_search::nav::Button;

    use super::*;

    #[tokio::test]
    async fn markup_preserves_layout_and_shortens_payloads() {
        let mut keyboard = Keyboard::default();
        keyboard.push_row(vec![
            Button {
                text: "a".into(),
                payload: "v1|x|n|0|||q".into(),
            },
            Button {
                text: "b".into(),
                payload: format!("v1|x|n|0|||{}", "q".repeat(90)),
            },
        ]);
        keyboard.push_row(vec![Button {
            text: "c".into(),
            payload: "v1|x|z|0|||".into(),
        }]);

        let store = PayloadStore::new(Duration::from_secs(60));
        let markup = markup(&keyboard, &store).await;
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[0].len(), 2);
        assert_eq!(markup.inline_keyboard[0][0].text, "a");
        assert_eq!(store.len().await, 1);
    }

    #[test]
    fn invalid_photo_is_dropped() {
        let view = View {
            text: "t".into(),
            photo: Some("not a url".into()),
            keyboard: Keyboard::default(),
            full_text: Some("full".into()),
        };
        assert!(photo_url(&view).is_none());
        assert_eq!(view.text_without_photo(), "full");
    }
}
