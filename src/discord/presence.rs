//! What the rest of the process knows about the Discord connection.
//!
//! Filled in once the gateway reports ready; read by the HTTP surface.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::bridge::ChatSink;

struct Connected {
    tag: String,
    chat: Arc<dyn ChatSink>,
}

#[derive(Default)]
pub struct BotPresence {
    inner: RwLock<Option<Connected>>,
}

impl BotPresence {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_ready(&self, tag: impl Into<String>, chat: Arc<dyn ChatSink>) {
        *self.inner.write().await = Some(Connected {
            tag: tag.into(),
            chat,
        });
    }

    /// Bot user tag, once ready.
    pub async fn tag(&self) -> Option<String> {
        self.inner.read().await.as_ref().map(|c| c.tag.clone())
    }

    pub async fn chat_sink(&self) -> Option<Arc<dyn ChatSink>> {
        self.inner.read().await.as_ref().map(|c| c.chat.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::inbound::tests::RecordingSink;

    #[tokio::test]
    async fn test_presence_before_and_after_ready() {
        let presence = BotPresence::new();
        assert_eq!(presence.tag().await, None);
        assert!(presence.chat_sink().await.is_none());

        presence.set_ready("bridge#0001", Arc::new(RecordingSink::default())).await;
        assert_eq!(presence.tag().await.as_deref(), Some("bridge#0001"));
        assert!(presence.chat_sink().await.is_some());
    }
}
