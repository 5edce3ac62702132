mod config;
mod error;
mod mirror;
mod pacing;
mod platform;
mod relay;
mod transform;
mod webhook;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::mirror::MirrorMap;
use crate::pacing::Pacing;
use crate::platform::discord::{self, DiscordFetcher};
use crate::relay::Relay;
use crate::transform::MentionRules;
use crate::webhook::WebhookClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mirrorbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let mirrors = MirrorMap::build(&config.mirrors).context("Invalid mirror configuration")?;

    info!("Configuration loaded successfully");
    info!("  Mirror rules: {}", config.mirrors.len());
    info!("  Source channels: {}", config.source_channel_count());
    info!("  Webhooks: {}", config.webhook_count());
    info!(
        "  Webhook delay: {}-{}ms, batch delay: {}-{}ms",
        config.pacing.min_webhook_delay_ms,
        config.pacing.max_webhook_delay_ms,
        config.pacing.min_batch_delay_ms,
        config.pacing.max_batch_delay_ms
    );
    info!("  Status: {}", config.status);

    let relay = Relay::new(
        mirrors,
        MentionRules::new(config.mentions.clone()),
        Pacing::new(&config.pacing),
        Arc::new(DiscordFetcher::new(&config.token)),
        Arc::new(WebhookClient::new()),
    );
    info!("Relaying {} channels", relay.mirrors().channel_count());

    let mut client = discord::build_client(&config.token, relay.clone(), config.status).await?;

    info!("Bot is starting...");
    tokio::select! {
        result = client.start() => {
            result.context("Discord client stopped")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
        }
    }

    let pending = relay.pending().await;
    info!(state = ?relay.state(), "Relay stopped");
    if pending > 0 {
        warn!("Exiting with {} queued messages not relayed", pending);
    }

    Ok(())
}
