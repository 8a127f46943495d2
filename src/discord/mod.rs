//! Discord bot integration.
//!
//! ## Module Structure
//!
//! - `client`: gateway connection, reconnects and the event loop
//! - `handler`: ready, interaction and message handling
//! - `commands`: slash command definitions and dispatch
//! - `sinks`: Discord-backed chat sink and status board
//! - `presence`: bot readiness as seen by the HTTP surface

pub mod client;
pub mod commands;
pub mod handler;
pub mod presence;
pub mod sinks;

pub use client::{DiscordBot, DiscordBotBuilder};
pub use handler::BotHandler;
pub use presence::BotPresence;
