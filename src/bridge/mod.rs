//! Chat bridge between Minecraft and Discord.
//!
//! ## Module Structure
//!
//! - `inbound`: Minecraft events (chat/join/leave) posted to Discord
//! - `relay`: Discord chat messages POSTed to the Minecraft-side endpoint

pub mod inbound;
pub mod relay;

pub use inbound::{forward_to_discord, ChatEventKind, ChatPost, ChatSink};
pub use relay::{should_relay, RelayClient, RelayOutcome};
