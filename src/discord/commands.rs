//! Slash commands (/whitelist, /status, /help).
//!
//! Each command implements [`SlashCommand`]; the [`CommandRegistry`] maps
//! command names to handlers and is built once at startup.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use serenity::all::{
    CommandInteraction, CommandOptionType, CreateCommand, CreateCommandOption, ResolvedValue,
};
use serenity::async_trait;
use tracing::info;

use crate::common::embed::{Embed, COLOR_INFO};
use crate::config::types::DiscordConfig;
use crate::status::embed::build_live_status_embed;
use crate::status::StatusSource;
use crate::whitelist::WhitelistStore;

/// The parts of a slash command interaction the handlers need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub subcommand: Option<String>,
    pub player: Option<String>,
    pub user_id: u64,
    pub user_name: String,
    pub role_ids: Vec<u64>,
}

impl Invocation {
    pub fn from_interaction(interaction: &CommandInteraction) -> Self {
        let mut invocation = Self {
            command: interaction.data.name.clone(),
            user_id: interaction.user.id.get(),
            user_name: interaction.user.name.clone(),
            role_ids: interaction
                .member
                .as_ref()
                .map(|m| m.roles.iter().map(|r| r.get()).collect())
                .unwrap_or_default(),
            ..Self::default()
        };

        for option in interaction.data.options() {
            match option.value {
                ResolvedValue::SubCommand(sub_options) => {
                    invocation.subcommand = Some(option.name.to_string());
                    for sub in sub_options {
                        if let ("player", ResolvedValue::String(value)) = (sub.name, sub.value) {
                            invocation.player = Some(value.to_string());
                        }
                    }
                }
                ResolvedValue::String(value) if option.name == "player" => {
                    invocation.player = Some(value.to_string());
                }
                _ => {}
            }
        }

        invocation
    }
}

/// A reply to a slash command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub content: Option<String>,
    pub embed: Option<Embed>,
    /// Visible only to the invoking user.
    pub ephemeral: bool,
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn private(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ephemeral: true,
            ..Self::default()
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            embed: Some(embed),
            ..Self::default()
        }
    }
}

/// Who may modify the whitelist.
#[derive(Debug, Clone, Default)]
pub struct AdminPolicy {
    pub owner_id: Option<u64>,
    pub admin_role_id: Option<u64>,
}

impl AdminPolicy {
    pub fn from_config(config: &DiscordConfig) -> Self {
        Self {
            owner_id: config.owner_id,
            admin_role_id: config.admin_role_id,
        }
    }

    pub fn is_admin(&self, user_id: u64, role_ids: &[u64]) -> bool {
        if self.owner_id == Some(user_id) {
            return true;
        }
        self.admin_role_id
            .map(|role| role_ids.contains(&role))
            .unwrap_or(false)
    }
}

/// Services available to command handlers.
pub struct CommandContext {
    pub whitelist: Arc<WhitelistStore>,
    pub status: Arc<dyn StatusSource>,
    pub admins: AdminPolicy,
    pub display_name: String,
}

#[async_trait]
pub trait SlashCommand: Send + Sync {
    fn name(&self) -> &'static str;

    /// Registration payload sent to Discord.
    fn definition(&self) -> CreateCommand;

    /// Acknowledge before executing (for slow commands).
    fn defers(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: &CommandContext, invocation: &Invocation) -> anyhow::Result<Reply>;
}

/// Command name -> handler.
pub struct CommandRegistry {
    commands: HashMap<&'static str, Box<dyn SlashCommand>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Registry with every built-in command.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(WhitelistCommand);
        registry.register(StatusCommand);
        registry.register(HelpCommand);
        registry
    }

    pub fn register(&mut self, command: impl SlashCommand + 'static) {
        self.commands.insert(command.name(), Box::new(command));
    }

    pub fn get(&self, name: &str) -> Option<&dyn SlashCommand> {
        self.commands.get(name).map(|c| c.as_ref())
    }

    pub fn definitions(&self) -> Vec<CreateCommand> {
        self.commands.values().map(|c| c.definition()).collect()
    }

    pub async fn dispatch(&self, ctx: &CommandContext, invocation: &Invocation) -> anyhow::Result<Reply> {
        let command = self
            .get(&invocation.command)
            .ok_or_else(|| anyhow!("unknown command /{}", invocation.command))?;
        command.execute(ctx, invocation).await
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn player_option(description: &str) -> CreateCommandOption {
    CreateCommandOption::new(CommandOptionType::String, "player", description).required(true)
}

/// /whitelist add|remove|list|check
pub struct WhitelistCommand;

#[async_trait]
impl SlashCommand for WhitelistCommand {
    fn name(&self) -> &'static str {
        "whitelist"
    }

    fn definition(&self) -> CreateCommand {
        CreateCommand::new("whitelist")
            .description("Manage the server whitelist")
            .add_option(
                CreateCommandOption::new(CommandOptionType::SubCommand, "add", "Add a player to the whitelist")
                    .add_sub_option(player_option("Minecraft username")),
            )
            .add_option(
                CreateCommandOption::new(CommandOptionType::SubCommand, "remove", "Remove a player from the whitelist")
                    .add_sub_option(player_option("Minecraft username")),
            )
            .add_option(CreateCommandOption::new(
                CommandOptionType::SubCommand,
                "list",
                "Show everyone on the whitelist",
            ))
            .add_option(
                CreateCommandOption::new(CommandOptionType::SubCommand, "check", "Check if a player is whitelisted")
                    .add_sub_option(player_option("Minecraft username")),
            )
    }

    async fn execute(&self, ctx: &CommandContext, invocation: &Invocation) -> anyhow::Result<Reply> {
        let sub = invocation.subcommand.as_deref().unwrap_or_default();
        let player = || {
            invocation
                .player
                .as_deref()
                .ok_or_else(|| anyhow!("/whitelist {} is missing the player option", sub))
        };

        match sub {
            "list" => Ok(Reply::embed(whitelist_embed(&ctx.whitelist).await)),
            "check" => {
                let player = player()?;
                let content = if ctx.whitelist.is_whitelisted(player).await {
                    format!("✅ `{}` **is** on the whitelist.", player)
                } else {
                    format!("❌ `{}` is **not** on the whitelist.", player)
                };
                Ok(Reply::private(content))
            }
            "add" | "remove" => {
                if !ctx.admins.is_admin(invocation.user_id, &invocation.role_ids) {
                    info!("Rejected /whitelist {} from {}", sub, invocation.user_name);
                    return Ok(Reply::private("🚫 Only admins can modify the whitelist."));
                }

                let player = player()?;
                let result = if sub == "add" {
                    ctx.whitelist.add(player, &invocation.user_name).await
                } else {
                    ctx.whitelist.remove(player).await
                };

                Ok(match result {
                    Ok(message) => Reply::text(message),
                    Err(e) => Reply::private(e.to_string()),
                })
            }
            other => Ok(Reply::private(format!("Unknown subcommand `{}`.", other))),
        }
    }
}

async fn whitelist_embed(store: &WhitelistStore) -> Embed {
    let list = store.list().await;
    let embed = Embed::new().title("📋 Whitelist").color(COLOR_INFO).timestamped();

    if list.is_empty() {
        return embed.description("The whitelist is currently **empty**.");
    }

    let lines: Vec<String> = list
        .iter()
        .enumerate()
        .map(|(i, entry)| format!("{}. `{}`", i + 1, entry.name))
        .collect();
    let plural = if list.len() == 1 { "" } else { "s" };

    embed
        .description(lines.join("\n"))
        .footer(format!("{} player{} whitelisted", list.len(), plural))
}

/// /status
pub struct StatusCommand;

#[async_trait]
impl SlashCommand for StatusCommand {
    fn name(&self) -> &'static str {
        "status"
    }

    fn definition(&self) -> CreateCommand {
        CreateCommand::new("status").description("Get the current server status right now")
    }

    fn defers(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &CommandContext, _invocation: &Invocation) -> anyhow::Result<Reply> {
        let snapshot = ctx.status.query().await;
        Ok(Reply::embed(build_live_status_embed(&ctx.display_name, &snapshot)))
    }
}

/// /help
pub struct HelpCommand;

#[async_trait]
impl SlashCommand for HelpCommand {
    fn name(&self) -> &'static str {
        "help"
    }

    fn definition(&self) -> CreateCommand {
        CreateCommand::new("help").description("Show all bot commands")
    }

    async fn execute(&self, _ctx: &CommandContext, _invocation: &Invocation) -> anyhow::Result<Reply> {
        let embed = Embed::new()
            .title("🤖 Bot Commands & Endpoints")
            .color(COLOR_INFO)
            .description("Everything this bot can do:")
            .field(
                "📋 Whitelist",
                "`/whitelist add <player>` — Add a player *(admin)*\n\
                 `/whitelist remove <player>` — Remove a player *(admin)*\n\
                 `/whitelist list` — View the full whitelist\n\
                 `/whitelist check <player>` — Check if someone is whitelisted",
                false,
            )
            .field(
                "🟢 Server Status",
                "`/status` — Instant server status\n\
                 A live embed also auto-updates in the status channel.\n\
                 `GET /status` — same data as JSON via HTTP",
                false,
            )
            .field(
                "💬 Chat Bridge",
                "Your MC server POSTs chat events to `POST /chat`.\n\
                 Type in the chat channel to send a message back into Minecraft.\n\
                 `GET /whitelist` — current whitelist as JSON via HTTP",
                false,
            )
            .footer("Admin commands require the configured admin role.")
            .timestamped();

        Ok(Reply::embed(embed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::announcer::tests::FixedSource;
    use crate::status::embed::FIELD_PLAYERS;
    use crate::status::prober::{PlayerCounts, StatusSnapshot};

    const OWNER: u64 = 1;
    const ADMIN_ROLE: u64 = 500;

    fn context() -> CommandContext {
        CommandContext {
            whitelist: Arc::new(WhitelistStore::in_memory()),
            status: Arc::new(FixedSource(StatusSnapshot {
                online: true,
                latency: Some(5),
                players: Some(PlayerCounts {
                    online: 0,
                    max: 10,
                    sample: Vec::new(),
                }),
                version: Some("1.20.4".to_string()),
                description: Some("hi".to_string()),
                error: None,
            })),
            admins: AdminPolicy {
                owner_id: Some(OWNER),
                admin_role_id: Some(ADMIN_ROLE),
            },
            display_name: "Blocky".to_string(),
        }
    }

    fn whitelist(sub: &str, player: Option<&str>, user_id: u64, roles: &[u64]) -> Invocation {
        Invocation {
            command: "whitelist".to_string(),
            subcommand: Some(sub.to_string()),
            player: player.map(str::to_string),
            user_id,
            user_name: format!("user{}", user_id),
            role_ids: roles.to_vec(),
        }
    }

    #[test]
    fn test_admin_policy() {
        let policy = AdminPolicy {
            owner_id: Some(OWNER),
            admin_role_id: Some(ADMIN_ROLE),
        };
        assert!(policy.is_admin(OWNER, &[]));
        assert!(policy.is_admin(2, &[7, ADMIN_ROLE]));
        assert!(!policy.is_admin(2, &[7]));
        assert!(!AdminPolicy::default().is_admin(0, &[0]));
    }

    #[test]
    fn test_standard_registry() {
        let registry = CommandRegistry::standard();
        assert_eq!(registry.definitions().len(), 3);
        for name in ["whitelist", "status", "help"] {
            assert_eq!(registry.get(name).map(|c| c.name()), Some(name));
        }
        assert!(registry.get("status").unwrap().defers());
        assert!(!registry.get("whitelist").unwrap().defers());
    }

    #[tokio::test]
    async fn test_non_admin_add_rejected_and_store_unchanged() {
        let ctx = context();
        let registry = CommandRegistry::standard();

        let reply = registry
            .dispatch(&ctx, &whitelist("add", Some("Steve"), 2, &[7]))
            .await
            .unwrap();

        assert_eq!(reply, Reply::private("🚫 Only admins can modify the whitelist."));
        assert_eq!(ctx.whitelist.len().await, 0);
    }

    #[tokio::test]
    async fn test_owner_add_succeeds() {
        let ctx = context();
        let registry = CommandRegistry::standard();

        let reply = registry
            .dispatch(&ctx, &whitelist("add", Some("Steve"), OWNER, &[]))
            .await
            .unwrap();

        assert!(!reply.ephemeral);
        assert_eq!(reply.content.as_deref(), Some("✅ `Steve` has been added to the whitelist."));
        assert!(ctx.whitelist.is_whitelisted("steve").await);
        assert_eq!(ctx.whitelist.list().await[0].added_by, "user1");
    }

    #[tokio::test]
    async fn test_admin_role_remove_and_failure_is_private() {
        let ctx = context();
        let registry = CommandRegistry::standard();

        let reply = registry
            .dispatch(&ctx, &whitelist("remove", Some("Ghost"), 3, &[ADMIN_ROLE]))
            .await
            .unwrap();

        assert!(reply.ephemeral);
        assert_eq!(reply.content.as_deref(), Some("`Ghost` is not on the whitelist."));
    }

    #[tokio::test]
    async fn test_list_and_check_open_to_everyone() {
        let ctx = context();
        let registry = CommandRegistry::standard();

        let empty = registry.dispatch(&ctx, &whitelist("list", None, 9, &[])).await.unwrap();
        assert_eq!(
            empty.embed.unwrap().description.as_deref(),
            Some("The whitelist is currently **empty**.")
        );

        ctx.whitelist.add("Steve", "admin").await.unwrap();
        ctx.whitelist.add("Alex", "admin").await.unwrap();

        let list = registry.dispatch(&ctx, &whitelist("list", None, 9, &[])).await.unwrap();
        let embed = list.embed.unwrap();
        assert_eq!(embed.description.as_deref(), Some("1. `Steve`\n2. `Alex`"));
        assert_eq!(embed.footer.as_deref(), Some("2 players whitelisted"));

        let check = registry
            .dispatch(&ctx, &whitelist("check", Some("ALEX"), 9, &[]))
            .await
            .unwrap();
        assert!(check.ephemeral);
        assert_eq!(check.content.as_deref(), Some("✅ `ALEX` **is** on the whitelist."));
    }

    #[tokio::test]
    async fn test_status_reply_uses_snapshot() {
        let ctx = context();
        let invocation = Invocation {
            command: "status".to_string(),
            ..Invocation::default()
        };

        let reply = CommandRegistry::standard().dispatch(&ctx, &invocation).await.unwrap();
        let embed = reply.embed.unwrap();
        assert_eq!(embed.title.as_deref(), Some("🟢 Blocky — Live Status"));
        assert_eq!(embed.field_value(FIELD_PLAYERS), Some("0 / 10"));
    }

    #[tokio::test]
    async fn test_unknown_command_and_missing_option_are_errors() {
        let ctx = context();
        let registry = CommandRegistry::standard();

        let unknown = Invocation {
            command: "teleport".to_string(),
            ..Invocation::default()
        };
        assert!(registry.dispatch(&ctx, &unknown).await.is_err());
        assert!(registry
            .dispatch(&ctx, &whitelist("add", None, OWNER, &[]))
            .await
            .is_err());
    }
}
