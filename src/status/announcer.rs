//! Live status message kept up to date in the status channel.

use std::sync::Arc;
use std::time::Duration;

use serenity::all::MessageId;
use serenity::async_trait;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::common::Embed;
use crate::status::embed::{build_status_embed, format_interval};
use crate::status::prober::StatusSource;

/// Where the status message lives.
#[async_trait]
pub trait StatusBoard: Send + Sync {
    /// Check the channel is reachable. Returns a name for logging.
    async fn resolve(&self) -> anyhow::Result<String>;

    /// Post a new message and return its id.
    async fn send(&self, embed: &Embed) -> anyhow::Result<MessageId>;

    /// Replace the content of an existing message.
    async fn edit(&self, id: MessageId, embed: &Embed) -> anyhow::Result<()>;
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Posted(MessageId),
    Edited(MessageId),
    Failed,
}

pub struct StatusAnnouncer<B> {
    source: Arc<dyn StatusSource>,
    board: B,
    display_name: String,
    interval: Duration,
    /// The message being kept up to date, if any.
    message_id: Option<MessageId>,
}

impl<B: StatusBoard> StatusAnnouncer<B> {
    pub fn new(
        source: Arc<dyn StatusSource>,
        board: B,
        display_name: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            board,
            display_name: display_name.into(),
            interval,
            message_id: None,
        }
    }

    #[cfg(test)]
    pub fn message_id(&self) -> Option<MessageId> {
        self.message_id
    }

    /// Resolve the channel, then tick immediately and on every interval.
    ///
    /// Returns right away if the channel cannot be resolved.
    pub async fn run(mut self) {
        match self.board.resolve().await {
            Ok(name) => info!(
                "Status monitor running in #{} every {}",
                name,
                format_interval(self.interval)
            ),
            Err(e) => {
                error!("Status channel not found or bot has no access: {}", e);
                return;
            }
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    pub async fn tick(&mut self) -> TickOutcome {
        let snapshot = self.source.query().await;
        let embed = build_status_embed(&self.display_name, &snapshot, self.interval);

        let result = match self.message_id {
            Some(id) => self.board.edit(id, &embed).await.map(|_| TickOutcome::Edited(id)),
            None => self.board.send(&embed).await.map(TickOutcome::Posted),
        };

        match result {
            Ok(TickOutcome::Posted(id)) => {
                info!("Status embed posted (id {})", id);
                self.message_id = Some(id);
                TickOutcome::Posted(id)
            }
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Status tick failed: {}", e);
                self.message_id = None;
                TickOutcome::Failed
            }
        }
    }
}
