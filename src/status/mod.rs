//! Minecraft server status: probing, formatting and the live status message.

pub mod announcer;
pub mod embed;
pub mod prober;
pub mod protocol;

pub use announcer::{StatusAnnouncer, StatusBoard};
pub use prober::{ServerProber, StatusSnapshot, StatusSource};
