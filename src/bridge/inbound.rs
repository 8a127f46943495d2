//! Minecraft -> Discord: chat, join and leave events.

use serenity::async_trait;
use tracing::{info, warn};

use crate::common::embed::{Embed, COLOR_INFO};
use crate::common::error::BridgeError;

/// Kinds of events the Minecraft side reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatEventKind {
    Chat,
    Join,
    Leave,
}

impl ChatEventKind {
    pub const ALL: [ChatEventKind; 3] = [Self::Chat, Self::Join, Self::Leave];

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Join => "join",
            Self::Leave => "leave",
        }
    }
}

/// A message ready to post in the chat channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatPost {
    Embed(Embed),
    Text(String),
}

/// The Discord chat channel, as seen by the bridge.
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Post to the channel. `BridgeError::ChannelUnavailable` if it cannot be resolved.
    async fn post(&self, post: ChatPost) -> Result<(), BridgeError>;
}

pub fn avatar_url(player: &str) -> Option<String> {
    reqwest::Url::parse_with_params("https://api.dicebear.com/7.x/minecraft/svg", &[("seed", player)])
        .ok()
        .map(String::from)
}

/// Format an event for Discord. A chat event without a message posts an empty body.
pub fn format_event(kind: ChatEventKind, player: &str, message: Option<&str>) -> ChatPost {
    match kind {
        ChatEventKind::Chat => ChatPost::Embed(
            Embed::new()
                .color(COLOR_INFO)
                .author(player, avatar_url(player))
                .description(message.unwrap_or_default())
                .timestamped(),
        ),
        ChatEventKind::Join => ChatPost::Text(format!("🟢 **{}** joined the game.", player)),
        ChatEventKind::Leave => ChatPost::Text(format!("🔴 **{}** left the game.", player)),
    }
}

/// Forward an event to Discord.
///
/// Unknown kinds, a missing sink (bot not ready) and an unresolvable channel
/// are logged and dropped. Only send failures are returned.
pub async fn forward_to_discord(
    sink: Option<&dyn ChatSink>,
    kind: &str,
    player: &str,
    message: Option<&str>,
) -> Result<(), BridgeError> {
    let Some(kind) = ChatEventKind::parse(kind) else {
        warn!("Unknown chat event type: {}", kind);
        return Ok(());
    };

    let Some(sink) = sink else {
        warn!("Discord not ready, dropping {} event from {}", kind.as_str(), player);
        return Ok(());
    };

    match sink.post(format_event(kind, player, message)).await {
        Ok(()) => {
            info!("Minecraft -> Discord [{}] {}: {}", kind.as_str(), player, message.unwrap_or_default());
            Ok(())
        }
        Err(BridgeError::ChannelUnavailable) => {
            warn!("Chat channel not found, dropping {} event from {}", kind.as_str(), player);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records posts; optionally pretends the channel is missing or broken.
    #[derive(Default)]
    pub struct RecordingSink {
        pub posts: Mutex<Vec<ChatPost>>,
        pub missing_channel: bool,
        pub broken: bool,
    }

    #[async_trait]
    impl ChatSink for RecordingSink {
        async fn post(&self, post: ChatPost) -> Result<(), BridgeError> {
            if self.missing_channel {
                return Err(BridgeError::ChannelUnavailable);
            }
            if self.broken {
                return Err(BridgeError::Serenity(serenity::Error::Other("Missing Permissions")));
            }
            self.posts.lock().unwrap().push(post);
            Ok(())
        }
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!(ChatEventKind::parse("chat"), Some(ChatEventKind::Chat));
        assert_eq!(ChatEventKind::parse("join"), Some(ChatEventKind::Join));
        assert_eq!(ChatEventKind::parse("leave"), Some(ChatEventKind::Leave));
        assert_eq!(ChatEventKind::parse("Chat"), None);
        assert_eq!(ChatEventKind::parse("death"), None);
    }

    #[test]
    fn test_chat_event_embed() {
        let ChatPost::Embed(embed) = format_event(ChatEventKind::Chat, "Steve", Some("hi all")) else {
            panic!("chat events are embeds");
        };
        assert_eq!(embed.description.as_deref(), Some("hi all"));
        assert_eq!(embed.color, Some(COLOR_INFO));
        let author = embed.author.unwrap();
        assert_eq!(author.name, "Steve");
        assert_eq!(
            author.icon_url.as_deref(),
            Some("https://api.dicebear.com/7.x/minecraft/svg?seed=Steve")
        );
    }

    #[test]
    fn test_join_leave_lines() {
        assert_eq!(
            format_event(ChatEventKind::Join, "Alex", None),
            ChatPost::Text("🟢 **Alex** joined the game.".to_string())
        );
        assert_eq!(
            format_event(ChatEventKind::Leave, "Alex", None),
            ChatPost::Text("🔴 **Alex** left the game.".to_string())
        );
    }

    #[test]
    fn test_avatar_url_is_encoded() {
        let url = avatar_url("a b&c").unwrap();
        assert!(url.ends_with("seed=a+b%26c"), "{}", url);
    }

    #[tokio::test]
    async fn test_forward_posts_to_sink() {
        let sink = RecordingSink::default();
        forward_to_discord(Some(&sink), "join", "Steve", None).await.unwrap();
        assert_eq!(sink.posts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_kind_dropped() {
        let sink = RecordingSink::default();
        forward_to_discord(Some(&sink), "death", "Steve", None).await.unwrap();
        assert!(sink.posts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_channel_or_sink_dropped_quietly() {
        let sink = RecordingSink {
            missing_channel: true,
            ..RecordingSink::default()
        };
        assert!(forward_to_discord(Some(&sink), "chat", "Steve", Some("hi")).await.is_ok());
        assert!(forward_to_discord(None, "chat", "Steve", Some("hi")).await.is_ok());
    }

    #[tokio::test]
    async fn test_send_failure_propagates() {
        let sink = RecordingSink {
            broken: true,
            ..RecordingSink::default()
        };
        let result = forward_to_discord(Some(&sink), "leave", "Steve", None).await;
        assert!(matches!(result, Err(BridgeError::Serenity(_))));
    }
}
