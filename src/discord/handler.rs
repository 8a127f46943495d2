//! Discord event handling.
//!
//! Gateway events arrive here from the client's event loop: ready starts the
//! status announcer and registers commands, interactions go through the
//! command registry, and chat channel messages are relayed into Minecraft.

use std::sync::Arc;
use std::time::Duration;

use serenity::all::{
    CommandInteraction, CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage,
    EditInteractionResponse, Interaction,
};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bridge::{should_relay, RelayClient, RelayOutcome};
use crate::config::types::Config;
use crate::discord::commands::{AdminPolicy, CommandContext, CommandRegistry, Invocation, Reply};
use crate::discord::presence::BotPresence;
use crate::discord::sinks::{DiscordChatSink, DiscordStatusBoard};
use crate::status::{StatusAnnouncer, StatusSource};
use crate::whitelist::WhitelistStore;

/// Sent when a command fails for any reason we did not anticipate.
pub const GENERIC_FAILURE: &str = "❌ Something went wrong.";

pub struct BotHandler {
    registry: Arc<CommandRegistry>,
    commands: Arc<CommandContext>,
    relay: RelayClient,
    presence: Arc<BotPresence>,
    chat_channel_id: Option<u64>,
    status_channel_id: Option<u64>,
    status_interval: Duration,
    announcer: Option<JoinHandle<()>>,
}

impl BotHandler {
    pub fn new(
        config: &Config,
        whitelist: Arc<WhitelistStore>,
        status: Arc<dyn StatusSource>,
        relay: RelayClient,
        presence: Arc<BotPresence>,
    ) -> Self {
        let commands = CommandContext {
            whitelist,
            status,
            admins: AdminPolicy::from_config(&config.discord),
            display_name: config.minecraft.display_name.clone(),
        };

        Self {
            registry: Arc::new(CommandRegistry::standard()),
            commands: Arc::new(commands),
            relay,
            presence,
            chat_channel_id: config.discord.chat_channel_id,
            status_channel_id: config.discord.status_channel_id,
            status_interval: config.status.interval(),
            announcer: None,
        }
    }

    pub async fn handle_ready(&mut self, ctx: Context, ready: Ready) {
        let tag = ready.user.tag();
        info!("Discord bot connected as {}", tag);

        let chat = DiscordChatSink::new(ctx.http.clone(), ctx.cache.clone(), self.chat_channel_id);
        self.presence.set_ready(tag, Arc::new(chat)).await;

        match ready.guilds.first() {
            Some(guild) => match guild.id.set_commands(&ctx.http, self.registry.definitions()).await {
                Ok(registered) => info!("Registered {} slash commands in guild {}", registered.len(), guild.id),
                Err(e) => error!("Failed to register slash commands: {}", e),
            },
            None => error!("Bot is not in any guild, slash commands not registered"),
        }

        // Ready fires again after a reconnect; keep the one announcer.
        if self.announcer.is_some() {
            return;
        }
        let board = self
            .status_channel_id
            .and_then(|id| DiscordStatusBoard::new(ctx.http.clone(), id));
        match board {
            Some(board) => {
                let announcer = StatusAnnouncer::new(
                    self.commands.status.clone(),
                    board,
                    self.commands.display_name.clone(),
                    self.status_interval,
                );
                self.announcer = Some(tokio::spawn(announcer.run()));
            }
            None => warn!("STATUS_CHANNEL_ID not set, live status disabled"),
        }
    }

    pub async fn handle_interaction(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };

        let registry = self.registry.clone();
        let commands = self.commands.clone();
        tokio::spawn(async move {
            run_command(ctx, command, registry, commands).await;
        });
    }

    pub async fn handle_message(&self, ctx: Context, msg: Message) {
        let self_id = ctx.cache.current_user().id.get();
        if !should_relay(
            msg.channel_id.get(),
            msg.author.id.get(),
            self_id,
            &msg.content,
            self.chat_channel_id,
        ) {
            return;
        }

        if !self.relay.is_enabled() {
            debug!("MC_RELAY_URL not set, not relaying message from {}", msg.author.name);
            return;
        }

        let player = author_display_name(&msg);
        let relay = self.relay.clone();
        tokio::spawn(async move {
            match relay.relay(&player, &msg.content).await {
                Ok(RelayOutcome::Sent) => info!("Discord -> Minecraft {}: {}", player, msg.content),
                Ok(RelayOutcome::Skipped) => {}
                Err(e) => {
                    error!("Failed to relay message from {}: {}", player, e);
                    if let Err(e) = msg.react(&ctx.http, '❌').await {
                        warn!("Failed to react to message: {}", e);
                    }
                }
            }
        });
    }

    pub fn shutdown(&mut self) {
        if let Some(announcer) = self.announcer.take() {
            announcer.abort();
        }
    }
}

/// Server nickname, then global display name, then username.
fn author_display_name(msg: &Message) -> String {
    msg.member
        .as_ref()
        .and_then(|m| m.nick.clone())
        .or_else(|| msg.author.global_name.clone())
        .unwrap_or_else(|| msg.author.name.clone())
}

async fn run_command(
    ctx: Context,
    command: CommandInteraction,
    registry: Arc<CommandRegistry>,
    commands: Arc<CommandContext>,
) {
    let invocation = Invocation::from_interaction(&command);
    let deferred = registry
        .get(&invocation.command)
        .map(|c| c.defers())
        .unwrap_or(false);

    if deferred {
        if let Err(e) = command.defer(&ctx.http).await {
            error!("Failed to defer /{}: {}", invocation.command, e);
            return;
        }
    }

    let reply = execute_command(registry, commands, invocation.clone()).await;

    let sent = if deferred {
        command
            .edit_response(&ctx.http, edit_response(&reply))
            .await
            .map(|_| ())
    } else {
        command
            .create_response(&ctx.http, CreateInteractionResponse::Message(response_message(&reply)))
            .await
    };

    if let Err(e) = sent {
        error!("Failed to respond to /{}: {}", invocation.command, e);
    }
}

/// Runs the command in its own task so an error or a panic still
/// produces a reply for the user.
async fn execute_command(
    registry: Arc<CommandRegistry>,
    commands: Arc<CommandContext>,
    invocation: Invocation,
) -> Reply {
    let name = invocation.command.clone();
    let task = tokio::spawn(async move { registry.dispatch(&commands, &invocation).await });

    match task.await {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            error!("Command /{} failed: {:#}", name, e);
            Reply::private(GENERIC_FAILURE)
        }
        Err(e) => {
            error!("Command /{} panicked: {}", name, e);
            Reply::private(GENERIC_FAILURE)
        }
    }
}

fn response_message(reply: &Reply) -> CreateInteractionResponseMessage {
    let mut message = CreateInteractionResponseMessage::new().ephemeral(reply.ephemeral);
    if let Some(content) = &reply.content {
        message = message.content(content);
    }
    if let Some(embed) = &reply.embed {
        message = message.embed(CreateEmbed::from(embed));
    }
    message
}

fn edit_response(reply: &Reply) -> EditInteractionResponse {
    let mut edit = EditInteractionResponse::new();
    if let Some(content) = &reply.content {
        edit = edit.content(content);
    }
    if let Some(embed) = &reply.embed {
        edit = edit.embed(CreateEmbed::from(embed));
    }
    edit
}
