//! mcbridge - Discord bot for a Minecraft server
//!
//! Keeps a live status embed up to date, manages the whitelist through
//! slash commands and bridges chat between Minecraft and Discord.

mod bridge;
mod common;
mod config;
mod discord;
mod http;
mod status;
mod whitelist;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use bridge::RelayClient;
use config::load_and_validate;
use discord::{BotHandler, BotPresence, DiscordBotBuilder};
use http::AppState;
use status::{ServerProber, StatusSource};
use whitelist::WhitelistStore;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to read .env: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("mcbridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = load_and_validate().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Set DISCORD_TOKEN and the other variables in the environment or a .env file.");
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  Minecraft server: {}:{}", config.minecraft.host, config.minecraft.port);
    info!("  Display name: {}", config.minecraft.display_name);
    info!("  Status interval: {}", status::embed::format_interval(config.status.interval()));
    info!("  HTTP port: {}", config.http.port);

    let whitelist = Arc::new(WhitelistStore::open(&config.whitelist.path).await);
    if whitelist.is_persistent() {
        info!("  Whitelist file: {}", config.whitelist.path.display());
    }

    let prober: Arc<dyn StatusSource> = Arc::new(ServerProber::from_config(&config.minecraft, &config.status));
    let relay = RelayClient::new(&config.relay)?;
    if !relay.is_enabled() {
        warn!("MC_RELAY_URL not set, Discord -> Minecraft relay disabled");
    }
    let presence = Arc::new(BotPresence::new());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ============================================================
    // HTTP server
    // ============================================================
    let app_state = AppState {
        whitelist: whitelist.clone(),
        status: prober.clone(),
        presence: presence.clone(),
        webhook_secret: config.http.webhook_secret.clone(),
    };
    let http_task = {
        let mut shutdown_rx = shutdown_rx.clone();
        let port = config.http.port;
        tokio::spawn(async move {
            let shutdown = async move {
                while shutdown_rx.changed().await.is_ok() {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            };
            if let Err(e) = http::serve(app_state, port, shutdown).await {
                error!("HTTP server error: {}", e);
            }
        })
    };

    // ============================================================
    // Discord bot
    // ============================================================
    let handler = BotHandler::new(&config, whitelist, prober, relay, presence);
    let discord_bot = DiscordBotBuilder::new(config.discord.token.clone(), handler)
        .build()
        .await?;

    info!("Starting Discord bot...");
    let mut discord_task = tokio::spawn(discord_bot.run(shutdown_rx));

    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            true
        }
        _ = &mut discord_task => false,
    };

    // Stop the HTTP server either way; the Discord task only ends on its own if the gateway is gone.
    if let Err(e) = shutdown_tx.send(true) {
        warn!("Shutdown channel closed: {}", e);
    }

    let timeout = Duration::from_secs(5);
    if shutdown {
        match tokio::time::timeout(timeout, discord_task).await {
            Ok(Ok(())) => info!("Discord disconnected gracefully"),
            Ok(Err(e)) => warn!("Discord task panicked: {}", e),
            Err(_) => warn!("Discord shutdown timed out"),
        }
    }
    match tokio::time::timeout(timeout, http_task).await {
        Ok(Ok(())) => info!("HTTP server stopped"),
        Ok(Err(e)) => warn!("HTTP server task panicked: {}", e),
        Err(_) => warn!("HTTP server shutdown timed out"),
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
