//! Minecraft server status probing.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use fancy_regex::Regex;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serenity::async_trait;
use tokio::net::TcpStream;
use tracing::debug;

use crate::common::error::{ProbeError, ProbeResult};
use crate::config::types::{MinecraftConfig, StatusConfig};
use crate::status::protocol::{
    new_connection, Handshake, PacketDecode, PacketEncode, Ping, SlpConnection, StatusRequest,
    StatusResponse, PROTOCOL_VERSION,
};

/// Legacy `§` formatting codes (colors and styles).
static COLOR_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("(?i)§[0-9a-fk-or]").expect("color code pattern is valid")
});

/// Point-in-time result of a probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub players: Option<PlayerCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusSnapshot {
    pub fn offline(error: impl Into<String>) -> Self {
        Self {
            online: false,
            latency: None,
            players: None,
            version: None,
            description: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCounts {
    pub online: u32,
    pub max: u32,
    pub sample: Vec<PlayerSample>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSample {
    pub name: String,
}

/// Anything that can produce a status snapshot.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Never fails: every error is folded into an offline snapshot.
    async fn query(&self) -> StatusSnapshot;
}

/// Probes a server over TCP with the Server List Ping protocol.
#[derive(Debug, Clone)]
pub struct ServerProber {
    host: String,
    port: u16,
    timeout: Duration,
}

impl ServerProber {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    pub fn from_config(minecraft: &MinecraftConfig, status: &StatusConfig) -> Self {
        Self::new(minecraft.host.clone(), minecraft.port, status.query_timeout())
    }

    pub async fn query_server(&self) -> StatusSnapshot {
        match tokio::time::timeout(self.timeout, self.ping()).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                debug!("Status query to {}:{} failed: {}", self.host, self.port, e);
                StatusSnapshot::offline(e.to_string())
            }
            Err(_) => {
                let e = ProbeError::Timeout(self.timeout.as_millis() as u64);
                debug!("Status query to {}:{} failed: {}", self.host, self.port, e);
                StatusSnapshot::offline(e.to_string())
            }
        }
    }

    async fn ping(&self) -> ProbeResult<StatusSnapshot> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|source| ProbeError::ConnectFailed {
                host: self.host.clone(),
                port: self.port,
                source,
            })?;
        let mut conn = new_connection(stream);

        let handshake = Handshake {
            protocol_version: PROTOCOL_VERSION,
            host: self.host.clone(),
            port: self.port,
        };
        conn.send(handshake.to_packet()).await?;
        conn.send(StatusRequest.to_packet()).await?;
        let response = StatusResponse::from_packet(next_packet(&mut conn).await?)?;

        let started = Instant::now();
        let token = chrono::Utc::now().timestamp_millis();
        conn.send(Ping(token).to_packet()).await?;
        let pong = Ping::from_packet(next_packet(&mut conn).await?)?;
        let latency = started.elapsed().as_millis() as u64;
        if pong.0 != token {
            debug!("Pong payload {} does not match ping {}", pong.0, token);
        }

        let raw: RawStatus = serde_json::from_str(&response.json)?;
        Ok(normalize(raw, latency))
    }
}

#[async_trait]
impl StatusSource for ServerProber {
    async fn query(&self) -> StatusSnapshot {
        self.query_server().await
    }
}

async fn next_packet(
    conn: &mut SlpConnection<TcpStream>,
) -> ProbeResult<crate::status::protocol::Packet> {
    conn.next().await.ok_or(ProbeError::ConnectionClosed)?
}

/// Remove legacy `§x` formatting codes.
pub fn strip_color(text: &str) -> String {
    COLOR_CODE.replace_all(text, "").into_owned()
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    version: Option<RawVersion>,
    players: Option<RawPlayers>,
    description: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawVersion {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPlayers {
    #[serde(default)]
    online: u32,
    #[serde(default)]
    max: u32,
    #[serde(default)]
    sample: Option<Vec<PlayerSample>>,
}

fn normalize(raw: RawStatus, latency: u64) -> StatusSnapshot {
    let players = raw
        .players
        .map(|p| PlayerCounts {
            online: p.online,
            max: p.max,
            sample: p.sample.unwrap_or_default(),
        })
        .unwrap_or_default();

    let version = raw
        .version
        .and_then(|v| v.name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    let description = raw
        .description
        .map(|d| strip_color(&flatten_text(&d)))
        .unwrap_or_default();

    StatusSnapshot {
        online: true,
        latency: Some(latency),
        players: Some(players),
        version: Some(version),
        description: Some(description),
        error: None,
    }
}

/// Flatten a chat component (string, object with `text`/`extra`, or array).
fn flatten_text(value: &serde_json::Value) -> String {
    use serde_json::Value;

    match value {
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts.iter().map(flatten_text).collect(),
        Value::Object(map) => {
            let mut out = map
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if let Some(Value::Array(extra)) = map.get("extra") {
                for part in extra {
                    out.push_str(&flatten_text(part));
                }
            }
            out
        }
        _ => String::new(),
    }
}
