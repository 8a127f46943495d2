//! Discord -> Minecraft relay over HTTP.
//!
//! Messages typed in the chat channel are POSTed to an endpoint on the
//! Minecraft side, which injects them into the game. Without a configured
//! URL the relay is off and messages are silently skipped.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::common::error::RelayError;
use crate::config::types::RelayConfig;

pub const RELAY_SECRET_HEADER: &str = "X-Relay-Secret";

/// Messages starting with this are commands, not chat.
pub const COMMAND_PREFIX: char = '/';

#[derive(Debug, Serialize)]
pub struct RelayPayload<'a> {
    pub player: &'a str,
    pub message: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Sent,
    /// No relay URL configured.
    Skipped,
}

/// Whether a Discord message should be relayed into the game.
pub fn should_relay(
    channel_id: u64,
    author_id: u64,
    self_id: u64,
    content: &str,
    chat_channel_id: Option<u64>,
) -> bool {
    chat_channel_id == Some(channel_id)
        && author_id != self_id
        && !content.starts_with(COMMAND_PREFIX)
}

#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    url: Option<String>,
    secret: String,
}

impl RelayClient {
    pub fn new(config: &RelayConfig) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            url: config.url.clone(),
            secret: config.secret.clone(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    pub async fn relay(&self, player: &str, message: &str) -> Result<RelayOutcome, RelayError> {
        let Some(url) = &self.url else {
            return Ok(RelayOutcome::Skipped);
        };

        let response = self
            .http
            .post(url)
            .header(RELAY_SECRET_HEADER, &self.secret)
            .json(&RelayPayload { player, message })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Relayed message from {} to {}", player, url);
        Ok(RelayOutcome::Sent)
    }
}
