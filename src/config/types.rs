//! Configuration type definitions.

use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    pub http: HttpConfig,
    pub discord: DiscordConfig,
    pub minecraft: MinecraftConfig,
    pub status: StatusConfig,
    pub whitelist: WhitelistConfig,
    pub relay: RelayConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub port: u16,
    /// Shared secret expected in `X-Webhook-Secret` on `POST /chat`.
    pub webhook_secret: Option<String>,
}

/// Discord bot configuration.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub token: String,
    pub status_channel_id: Option<u64>,
    pub chat_channel_id: Option<u64>,
    pub admin_role_id: Option<u64>,
    pub owner_id: Option<u64>,
}

/// Minecraft server to probe.
#[derive(Debug, Clone)]
pub struct MinecraftConfig {
    pub host: String,
    pub port: u16,
    pub display_name: String,
}

/// Status announcer settings.
#[derive(Debug, Clone)]
pub struct StatusConfig {
    pub interval_ms: u64,
    pub query_timeout_ms: u64,
}

impl StatusConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// Whitelist persistence settings.
#[derive(Debug, Clone)]
pub struct WhitelistConfig {
    pub path: PathBuf,
}

/// Discord -> Minecraft relay endpoint. No URL disables the relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub url: Option<String>,
    pub secret: String,
}
