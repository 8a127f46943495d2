//! Discord-backed implementations of the chat sink and the status board.

use std::sync::Arc;

use anyhow::Context as _;
use serenity::all::{Cache, Channel, ChannelId, CreateEmbed, CreateMessage, EditMessage, Http, MessageId};
use serenity::async_trait;

use crate::bridge::{ChatPost, ChatSink};
use crate::common::error::BridgeError;
use crate::common::Embed;
use crate::status::StatusBoard;

/// `ChannelId::new` panics on 0, so ids pass through here.
pub fn channel_id(raw: u64) -> Option<ChannelId> {
    (raw != 0).then(|| ChannelId::new(raw))
}

/// Posts bridged Minecraft events to the chat channel.
pub struct DiscordChatSink {
    http: Arc<Http>,
    cache: Arc<Cache>,
    channel_id: Option<ChannelId>,
}

impl DiscordChatSink {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>, channel_id: Option<u64>) -> Self {
        Self {
            http,
            cache,
            channel_id: channel_id.and_then(self::channel_id),
        }
    }
}

#[async_trait]
impl ChatSink for DiscordChatSink {
    async fn post(&self, post: ChatPost) -> Result<(), BridgeError> {
        let channel_id = self.channel_id.ok_or(BridgeError::ChannelUnavailable)?;

        // Cache first, HTTP fallback.
        channel_id
            .to_channel((&self.cache, self.http.as_ref()))
            .await
            .map_err(|_| BridgeError::ChannelUnavailable)?;

        match post {
            ChatPost::Embed(embed) => {
                channel_id
                    .send_message(&self.http, CreateMessage::new().embed(CreateEmbed::from(&embed)))
                    .await?;
            }
            ChatPost::Text(text) => {
                channel_id.say(&self.http, text).await?;
            }
        }
        Ok(())
    }
}

/// The status channel.
pub struct DiscordStatusBoard {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl DiscordStatusBoard {
    /// `None` for an id of 0.
    pub fn new(http: Arc<Http>, channel_id: u64) -> Option<Self> {
        Some(Self {
            http,
            channel_id: self::channel_id(channel_id)?,
        })
    }
}

#[async_trait]
impl StatusBoard for DiscordStatusBoard {
    async fn resolve(&self) -> anyhow::Result<String> {
        let channel = self
            .channel_id
            .to_channel(&self.http)
            .await
            .with_context(|| format!("channel {}", self.channel_id))?;

        Ok(match channel {
            Channel::Guild(channel) => channel.name,
            _ => self.channel_id.to_string(),
        })
    }

    async fn send(&self, embed: &Embed) -> anyhow::Result<MessageId> {
        let message = self
            .channel_id
            .send_message(&self.http, CreateMessage::new().embed(CreateEmbed::from(embed)))
            .await?;
        Ok(message.id)
    }

    async fn edit(&self, id: MessageId, embed: &Embed) -> anyhow::Result<()> {
        self.channel_id
            .edit_message(&self.http, id, EditMessage::new().embed(CreateEmbed::from(embed)))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_channel_id_is_rejected() {
        assert_eq!(channel_id(0), None);
        assert_eq!(channel_id(42), Some(ChannelId::new(42)));
    }

    #[test]
    fn test_status_board_needs_nonzero_channel() {
        let http = Arc::new(Http::new("token"));
        assert!(DiscordStatusBoard::new(http.clone(), 0).is_none());
        assert!(DiscordStatusBoard::new(http, 7).is_some());
    }

    #[tokio::test]
    async fn test_chat_sink_with_zero_channel_is_unavailable() {
        let sink = DiscordChatSink::new(Arc::new(Http::new("token")), Arc::new(Cache::new()), Some(0));
        let result = sink.post(ChatPost::Text("hi".to_string())).await;
        assert!(matches!(result, Err(BridgeError::ChannelUnavailable)));
    }
}
