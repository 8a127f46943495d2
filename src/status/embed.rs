//! Status embed formatting shared by the announcer and `/status`.

use std::time::Duration;

use crate::common::embed::{Embed, COLOR_OFFLINE, COLOR_ONLINE};
use crate::status::prober::StatusSnapshot;

pub const FIELD_PLAYERS: &str = "👥 Players";
pub const FIELD_LATENCY: &str = "📡 Latency";
pub const FIELD_VERSION: &str = "📦 Version";
pub const FIELD_WHO: &str = "🎮 Who's Online";

/// Embed for the live status message, with a refresh-interval footer.
pub fn build_status_embed(display_name: &str, snapshot: &StatusSnapshot, interval: Duration) -> Embed {
    let embed = base_embed(display_name.to_string(), snapshot, "No description set.");
    if !snapshot.online {
        return embed;
    }
    embed.footer(format!("Updates every {}", format_interval(interval)))
}

/// Seconds with a fractional part only when needed ("30s", "1.5s").
pub fn format_interval(interval: Duration) -> String {
    format!("{}s", interval.as_secs_f64())
}

/// Embed for an on-demand `/status` reply.
pub fn build_live_status_embed(display_name: &str, snapshot: &StatusSnapshot) -> Embed {
    base_embed(format!("{} — Live Status", display_name), snapshot, "No description.")
}

fn base_embed(name: String, snapshot: &StatusSnapshot, no_description: &str) -> Embed {
    let icon = if snapshot.online { "🟢" } else { "🔴" };
    let embed = Embed::new()
        .title(format!("{} {}", icon, name))
        .color(if snapshot.online { COLOR_ONLINE } else { COLOR_OFFLINE })
        .timestamped();

    if !snapshot.online {
        return embed.description("Server is **offline** or unreachable.");
    }

    let description = snapshot
        .description
        .as_deref()
        .filter(|d| !d.is_empty())
        .unwrap_or(no_description);

    let players = snapshot.players.clone().unwrap_or_default();
    let who = if players.sample.is_empty() {
        "No players online".to_string()
    } else {
        players
            .sample
            .iter()
            .map(|p| format!("`{}`", p.name))
            .collect::<Vec<_>>()
            .join(", ")
    };

    embed
        .description(description)
        .field(FIELD_PLAYERS, format!("{} / {}", players.online, players.max), true)
        .field(FIELD_LATENCY, format!("{} ms", snapshot.latency.unwrap_or_default()), true)
        .field(FIELD_VERSION, snapshot.version.as_deref().unwrap_or("Unknown"), true)
        .field(FIELD_WHO, who, false)
}
