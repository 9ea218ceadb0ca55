//! Update handlers: commands, prompt replies, button presses and the install
//! watcher.

use std::sync::Arc;

use limoka_config::TelegramSection;
use limoka_search::nav::{NavOutcome, QueryMode};
use limoka_search::{InboundMessage, InstallOutcome, LimokaService};
use limoka_telemetry::RequestContext;
use teloxide::prelude::*;
use teloxide::types::{ForceReply, MessageId, ParseMode};
use tracing::{Instrument, debug, info, warn};

use crate::callback::PayloadStore;
use crate::render::{replace_view, send_view};

const HELP: &str = "<b>Limoka</b> finds plugins in the catalog.\n\n\
<code>/limoka &lt;query&gt;</code> - search modules\n\
<code>/lshistory</code> - show your search history\n\
<code>/lshistory clear</code> - clear it\n\
<code>/external_install on|off</code> - allow signed remote installs";
const NOT_ADMIN: &str = "⛔ You are not allowed to change this setting.";
const INSTALL_UNAVAILABLE: &str = "⚠️ The install watcher is not configured.";
const INSTALL_USAGE: &str = "<b>Usage:</b> <code>/external_install on|off</code>";

/// Shared bot state passed to all handlers.
#[derive(Clone)]
pub struct BotState {
    /// Search, navigation and install service.
    pub service: Arc<LimokaService>,
    /// Store for callback payloads too long for a button.
    pub payloads: PayloadStore,
    /// Telegram settings.
    pub settings: Arc<TelegramSection>,
}

/// A recognised bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/limoka` or `/search` with an optional query.
    Search(String),
    /// `/lshistory` with an optional argument.
    History(String),
    /// `/external_install` with an optional `on`/`off`.
    ExternalInstall(String),
    /// `/start` or `/help`.
    Help,
}

impl Command {
    /// Parse a `/command@bot args` message. Unknown commands yield `None`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.trim_start().strip_prefix('/')?;
        let (head, arg) = rest
            .split_once(char::is_whitespace)
            .map_or((rest, ""), |(h, a)| (h, a.trim()));
        let name = head.split_once('@').map_or(head, |(n, _)| n);
        match name.to_ascii_lowercase().as_str() {
            "limoka" | "search" => Some(Self::Search(arg.to_owned())),
            "lshistory" => Some(Self::History(arg.to_owned())),
            "external_install" => Some(Self::ExternalInstall(arg.to_owned())),
            "start" | "help" => Some(Self::Help),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Search(_) => "search",
            Self::History(_) => "history",
            Self::ExternalInstall(_) => "external_install",
            Self::Help => "help",
        }
    }
}

/// The install watcher's view of a Telegram message.
#[must_use]
pub fn inbound(msg: &Message) -> InboundMessage {
    let has_entities = msg.entities().is_some_and(|e| !e.is_empty())
        || msg.caption_entities().is_some_and(|e| !e.is_empty());
    InboundMessage {
        id: i64::from(msg.id.0),
        chat_id: msg.chat.id.0,
        sender_id: msg.from.as_ref().and_then(|u| i64::try_from(u.id.0).ok()),
        text: msg.text().or_else(|| msg.caption()).map(str::to_owned),
        has_entities,
    }
}

fn user_id(msg: &Message) -> i64 {
    msg.from
        .as_ref()
        .and_then(|u| i64::try_from(u.id.0).ok())
        .unwrap_or(msg.chat.id.0)
}

/// Handle an incoming message.
pub async fn handle_message(bot: Bot, msg: Message, state: BotState) -> anyhow::Result<()> {
    let mut ctx = RequestContext::new("telegram")
        .with_operation("message")
        .with_chat(msg.chat.id.0);
    if let Some(user) = &msg.from
        && let Ok(id) = i64::try_from(user.id.0)
    {
        ctx = ctx.with_user(id);
    }
    let span = ctx.span();
    let result = dispatch_message(&bot, &msg, &state)
        .instrument(span.clone())
        .await;
    span.in_scope(|| {
        debug!(elapsed_ms = ctx.elapsed_ms(), ok = result.is_ok(), "message handled");
    });
    result
}

async fn dispatch_message(bot: &Bot, msg: &Message, state: &BotState) -> anyhow::Result<()> {
    match state.service.handle_inbound(&inbound(msg)).await {
        InstallOutcome::Ignored | InstallOutcome::NoDirective => {},
        outcome => {
            info!(?outcome, "install directive handled");
            return Ok(());
        },
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };

    if let Some(command) = Command::parse(text) {
        debug!(command = command.name(), "command");
        return handle_command(bot, msg, state, command).await;
    }

    let mode = msg
        .reply_to_message()
        .and_then(Message::text)
        .and_then(QueryMode::from_prompt);
    if let Some(mode) = mode {
        let outcome = state.service.submit_query(mode, text).await;
        deliver_new(bot, msg.chat.id, outcome, state).await?;
    }
    Ok(())
}

async fn handle_command(
    bot: &Bot,
    msg: &Message,
    state: &BotState,
    command: Command,
) -> anyhow::Result<()> {
    let chat_id = msg.chat.id;
    match command {
        Command::Search(query) if query.trim().is_empty() => {
            deliver_new(bot, chat_id, state.service.start(), state).await?;
        },
        Command::Search(query) => {
            let wait = bot
                .send_message(chat_id, state.service.wait_text(&query))
                .parse_mode(ParseMode::Html)
                .await?;
            let outcome = state.service.search(user_id(msg), &query).await;
            deliver_edit(bot, chat_id, wait.id, false, outcome, state).await?;
        },
        Command::History(arg) => {
            let text = state.service.history(user_id(msg), &arg).await;
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::Html)
                .await?;
        },
        Command::ExternalInstall(arg) => {
            let text = external_install(msg, state, &arg);
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::Html)
                .await?;
        },
        Command::Help => {
            bot.send_message(chat_id, HELP)
                .parse_mode(ParseMode::Html)
                .await?;
        },
    }
    Ok(())
}

fn external_install(msg: &Message, state: &BotState, arg: &str) -> String {
    let Some(current) = state.service.external_install_enabled() else {
        return INSTALL_UNAVAILABLE.to_owned();
    };
    let enabled = match arg.to_ascii_lowercase().as_str() {
        "" => return switch_text(current),
        "on" | "true" | "1" => true,
        "off" | "false" | "0" => false,
        _ => return INSTALL_USAGE.to_owned(),
    };
    let allowed = msg
        .from
        .as_ref()
        .is_some_and(|u| state.settings.is_admin(u.id.0));
    if !allowed {
        warn!("external install switch denied");
        return NOT_ADMIN.to_owned();
    }
    state.service.set_external_install(enabled);
    info!(enabled, "external install switch changed");
    switch_text(enabled)
}

fn switch_text(enabled: bool) -> String {
    format!(
        "External install is <b>{}</b>.",
        if enabled { "enabled" } else { "disabled" }
    )
}

/// Deliver an outcome as a new message.
async fn deliver_new(
    bot: &Bot,
    chat_id: ChatId,
    outcome: NavOutcome,
    state: &BotState,
) -> anyhow::Result<()> {
    match outcome {
        NavOutcome::Render(view) => {
            send_view(bot, chat_id, &view, &state.payloads).await?;
        },
        NavOutcome::Notice(text) if !text.is_empty() => {
            bot.send_message(chat_id, text).await?;
        },
        NavOutcome::Prompt(mode) => {
            send_prompt(bot, chat_id, mode).await?;
        },
        NavOutcome::Notice(_) | NavOutcome::Close => {},
    }
    Ok(())
}

/// Deliver an outcome over the interactive message `message_id`.
async fn deliver_edit(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    had_photo: bool,
    outcome: NavOutcome,
    state: &BotState,
) -> anyhow::Result<()> {
    match outcome {
        NavOutcome::Render(view) => {
            replace_view(bot, chat_id, message_id, had_photo, &view, &state.payloads).await?;
        },
        NavOutcome::Notice(text) if !text.is_empty() => {
            bot.edit_message_text(chat_id, message_id, text).await?;
        },
        NavOutcome::Prompt(mode) => {
            send_prompt(bot, chat_id, mode).await?;
        },
        NavOutcome::Close => {
            bot.delete_message(chat_id, message_id).await?;
        },
        NavOutcome::Notice(_) => {},
    }
    Ok(())
}

async fn send_prompt(bot: &Bot, chat_id: ChatId, mode: QueryMode) -> anyhow::Result<()> {
    bot.send_message(chat_id, mode.prompt_text())
        .reply_markup(ForceReply::new())
        .await?;
    Ok(())
}

/// Handle a button press.
pub async fn handle_callback(bot: Bot, query: CallbackQuery, state: BotState) -> anyhow::Result<()> {
    let mut ctx = RequestContext::new("telegram").with_operation("callback");
    if let Ok(id) = i64::try_from(query.from.id.0) {
        ctx = ctx.with_user(id);
    }
    if let Some(message) = &query.message {
        ctx = ctx.with_chat(message.chat().id.0);
    }
    let span = ctx.span();
    let result = dispatch_callback(&bot, &query, &state)
        .instrument(span.clone())
        .await;
    span.in_scope(|| {
        debug!(elapsed_ms = ctx.elapsed_ms(), ok = result.is_ok(), "callback handled");
    });
    result
}

async fn dispatch_callback(bot: &Bot, query: &CallbackQuery, state: &BotState) -> anyhow::Result<()> {
    let data = query.data.as_deref().unwrap_or_default();
    let payload = state.payloads.resolve(data).await.unwrap_or_default();
    let outcome = state.service.handle_callback(&payload).await;

    let answer = match &outcome {
        NavOutcome::Notice(text) => text.clone(),
        _ => String::new(),
    };

    if let Some(message) = &query.message
        && !matches!(outcome, NavOutcome::Notice(_))
    {
        let had_photo = message
            .regular_message()
            .is_some_and(|m| m.photo().is_some());
        if let Err(e) = deliver_edit(
            bot,
            message.chat().id,
            message.id(),
            had_photo,
            outcome,
            state,
        )
        .await
        {
            warn!(error = %e, "failed to update interactive message");
        }
    }

    let mut request = bot.answer_callback_query(&query.id);
    if !answer.is_empty() {
        request = request.text(answer);
    }
    if let Err(e) = request.await {
        debug!(error = %e, "failed to answer callback query");
    }
    Ok(())
}
