use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pollbot::commands::CommandRegistry;
use pollbot::config::{self, Config};
use pollbot::engine::PollingEngine;
use pollbot::handlers;
use pollbot::telegram::{Bot, HttpTransport};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pollbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Token may also live in dev.env as TELEGRAM_BOT_TOKEN=...
    match dotenvy::from_filename("dev.env") {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Failed to read dev.env"),
    }

    // Optional explicit config path; it must exist when given
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let shown = config_path
        .as_deref()
        .unwrap_or_else(|| Path::new(config::DEFAULT_PATH))
        .display()
        .to_string();

    info!("Loading configuration from: {}", shown);
    let config = Config::load(config_path.as_deref())
        .with_context(|| format!("Failed to load config from {}", shown))?;

    info!("  API: {}", config.telegram.api_url);
    info!("  Long-poll timeout: {}s", config.polling.timeout_secs);

    let transport = HttpTransport::new(
        &config.telegram.api_url,
        &config.telegram.bot_token,
        config.polling.request_timeout(),
    )
    .context("Failed to build HTTP client")?;

    let bot = Bot::connect(Arc::new(transport))
        .await
        .context("Failed to connect to Telegram API (is the bot token valid?)")?;

    let mut registry = CommandRegistry::new();
    handlers::register_defaults(&mut registry);
    info!("{} commands registered", registry.len());

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        info!("Stopping bot...");
        signal.cancel();
    });

    info!("Bot started. Press Ctrl+C to stop.");
    let mut engine = PollingEngine::new(bot, registry, config.polling);
    engine.run(shutdown).await;

    Ok(())
}
