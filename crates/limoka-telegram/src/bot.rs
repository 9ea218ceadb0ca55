//! Teloxide bot setup, dispatcher, and handler registration.

use std::sync::Arc;
use std::time::Duration;

use limoka_config::Config;
use limoka_search::{FsPluginLoader, LimokaService, ReqwestClient, TrustAnchor};
use limoka_storage::JsonFileKvStore;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::callback::PayloadStore;
use crate::chat::TelegramDirectiveChat;
use crate::error::TelegramBotError;
use crate::handler::{self, BotState};

/// Build the service, bot state and teloxide handler tree from a config.
fn build_state_and_handler(
    config: &Config,
    token: &str,
) -> anyhow::Result<(
    BotState,
    Bot,
    teloxide::dispatching::UpdateHandler<anyhow::Error>,
)> {
    if config.telegram.admin_user_ids.is_empty() {
        warn!(
            "no admin_user_ids configured, any user can toggle external installs. \
             Set [telegram] admin_user_ids to restrict it."
        );
    }

    let bot = Bot::new(token);

    let http = Arc::new(ReqwestClient::new()?);
    let kv = Arc::new(JsonFileKvStore::open(config.kv_path())?);
    let service = LimokaService::open(config, http, kv).with_installer(
        TrustAnchor::official()?,
        Arc::new(FsPluginLoader::new(config.plugin_dir())),
        Arc::new(TelegramDirectiveChat::new(bot.clone())),
    );

    let state = BotState {
        service: Arc::new(service),
        payloads: PayloadStore::new(Duration::from_secs(config.telegram.payload_ttl_secs)),
        settings: Arc::new(config.telegram.clone()),
    };

    let message_handler = Update::filter_message().endpoint({
        let state = state.clone();
        move |bot: Bot, msg: Message| {
            let state = state.clone();
            async move { Box::pin(handler::handle_message(bot, msg, state)).await }
        }
    });

    let callback_handler = Update::filter_callback_query().endpoint({
        let state = state.clone();
        move |bot: Bot, query: CallbackQuery| {
            let state = state.clone();
            async move { Box::pin(handler::handle_callback(bot, query, state)).await }
        }
    });

    let handler = dptree::entry()
        .branch(message_handler)
        .branch(callback_handler);

    Ok((state, bot, handler))
}

/// Refresh the catalog periodically until the process exits.
fn spawn_refresh(service: Arc<LimokaService>) -> Option<tokio::task::JoinHandle<()>> {
    let period = service.refresh_interval()?;
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; the initial refresh already ran.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match service.refresh().await {
                Ok(modules) => info!(modules, "catalog refreshed"),
                Err(e) => warn!(error = %e, "catalog refresh failed, keeping previous snapshot"),
            }
        }
    }))
}

/// Run the Telegram bot until Ctrl+C.
///
/// # Errors
///
/// Fails when no bot token is configured or the service cannot be set up.
/// A failed initial catalog fetch is logged and the bot starts with the
/// persisted snapshot, if any.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let token = config
        .telegram
        .bot_token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            TelegramBotError::Config(
                "telegram.bot_token is not set (or LIMOKA_BOT_TOKEN / TELOXIDE_TOKEN)".to_owned(),
            )
        })?;

    let (state, bot, handler) = build_state_and_handler(&config, &token)?;

    info!("Fetching catalog...");
    match state.service.refresh().await {
        Ok(modules) => info!(modules, "catalog loaded"),
        Err(e) => warn!(error = %e, "initial catalog fetch failed"),
    }
    state.service.log_summary();

    let refresher = spawn_refresh(Arc::clone(&state.service));

    info!("Starting Telegram bot...");
    Box::pin(
        Dispatcher::builder(bot, handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch(),
    )
    .await;

    if let Some(task) = refresher {
        task.abort();
    }
    info!("Bot stopped");
    Ok(())
}
