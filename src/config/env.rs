//! Configuration from environment variables.
//!
//! Every setting is read from the process environment (a `.env` file is
//! loaded first by `main` when present):
//! - `PORT` - HTTP listen port (default 3000)
//! - `DISCORD_TOKEN` - Discord bot token (required)
//! - `STATUS_CHANNEL_ID` / `CHAT_CHANNEL_ID` - target Discord channels
//! - `ADMIN_ROLE_ID` / `OWNER_ID` - whitelist admin gate
//! - `MC_SERVER_IP` / `MC_SERVER_PORT` / `MC_SERVER_DISPLAY_NAME` - probed server
//! - `CHAT_WEBHOOK_SECRET` - shared secret for `POST /chat`
//! - `STATUS_CHECK_INTERVAL_MS` / `MC_QUERY_TIMEOUT_MS` - announcer timing
//! - `WHITELIST_PATH` - persisted whitelist file
//! - `MC_RELAY_URL` / `MC_RELAY_SECRET` - Discord -> Minecraft relay

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

use crate::common::error::ConfigError;
use crate::config::types::*;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MC_HOST: &str = "127.0.0.1";
pub const DEFAULT_MC_PORT: u16 = 25565;
pub const DEFAULT_DISPLAY_NAME: &str = "My MC Server";
pub const DEFAULT_INTERVAL_MS: u64 = 30_000;
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_WHITELIST_PATH: &str = "/data/whitelist.json";

/// Load configuration from the process environment.
pub fn load_from_env() -> Result<Config, ConfigError> {
    load_with(|key| env::var(key).ok())
}

/// Load configuration through an arbitrary variable lookup.
///
/// Empty values are treated as unset. Only a missing token is an error;
/// malformed optional values are logged and replaced by their defaults.
pub fn load_with<F>(lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let token = get("DISCORD_TOKEN").ok_or_else(|| ConfigError::MissingField {
        field: "DISCORD_TOKEN".to_string(),
    })?;

    Ok(Config {
        http: HttpConfig {
            port: number_or(&get, "PORT", DEFAULT_PORT),
            webhook_secret: get("CHAT_WEBHOOK_SECRET"),
        },
        discord: DiscordConfig {
            token,
            status_channel_id: snowflake(&get, "STATUS_CHANNEL_ID"),
            chat_channel_id: snowflake(&get, "CHAT_CHANNEL_ID"),
            admin_role_id: snowflake(&get, "ADMIN_ROLE_ID"),
            owner_id: snowflake(&get, "OWNER_ID"),
        },
        minecraft: MinecraftConfig {
            host: get("MC_SERVER_IP").unwrap_or_else(|| DEFAULT_MC_HOST.to_string()),
            port: number_or(&get, "MC_SERVER_PORT", DEFAULT_MC_PORT),
            display_name: get("MC_SERVER_DISPLAY_NAME")
                .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
        },
        status: StatusConfig {
            interval_ms: number_or(&get, "STATUS_CHECK_INTERVAL_MS", DEFAULT_INTERVAL_MS),
            query_timeout_ms: number_or(&get, "MC_QUERY_TIMEOUT_MS", DEFAULT_QUERY_TIMEOUT_MS),
        },
        whitelist: WhitelistConfig {
            path: PathBuf::from(
                get("WHITELIST_PATH").unwrap_or_else(|| DEFAULT_WHITELIST_PATH.to_string()),
            ),
        },
        relay: RelayConfig {
            url: relay_url(&get),
            secret: get("MC_RELAY_SECRET").unwrap_or_default(),
        },
    })
}

/// Numeric setting with a default. Unparseable and zero values use the default.
fn number_or<T, G>(get: &G, key: &str, default: T) -> T
where
    T: FromStr + PartialEq + Default + Display,
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return default;
    };
    match raw.parse::<T>() {
        Ok(value) if value != T::default() => value,
        _ => {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }
    }
}

/// Discord id. Unparseable and zero values are ignored.
fn snowflake<G>(get: &G, key: &str) -> Option<u64>
where
    G: Fn(&str) -> Option<String>,
{
    let raw = get(key)?;
    match raw.parse::<u64>() {
        Ok(id) if id != 0 => Some(id),
        _ => {
            warn!("{} has invalid value '{}', ignoring it", key, raw);
            None
        }
    }
}

/// Relay endpoint. Anything that is not an http(s) URL disables the relay.
fn relay_url<G>(get: &G) -> Option<String>
where
    G: Fn(&str) -> Option<String>,
{
    let url = get("MC_RELAY_URL")?;
    if url.starts_with("http://") || url.starts_with("https://") {
        Some(url)
    } else {
        warn!("MC_RELAY_URL '{}' must start with http:// or https://, relay disabled", url);
        None
    }
}
