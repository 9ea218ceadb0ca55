//! Limoka Telegram bot binary.

use std::path::PathBuf;

use clap::Parser;
use limoka_config::Config;
use limoka_telemetry::{LogConfig, setup_logging};

/// Limoka plugin search bot.
#[derive(Debug, Parser)]
#[command(name = "limoka-telegram", version, about)]
struct Args {
    /// Explicit config file (layered over the user and system configs).
    #[arg(short, long, env = "LIMOKA_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let resolved = Config::load(args.config.as_deref())?;
    setup_logging(&LogConfig::from_section(&resolved.config.logging)?)?;
    tracing::debug!(files = ?resolved.loaded_files, "configuration loaded");

    Box::pin(limoka_telegram::bot::run(resolved.config)).await
}
