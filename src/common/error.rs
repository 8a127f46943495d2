//! Error types for the application.

use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config validation failed: {message}")]
    ValidationError { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },
}

/// Whitelist mutation failures. The `Display` text is shown to Discord users as-is.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WhitelistError {
    #[error("`{0}` is already whitelisted.")]
    AlreadyWhitelisted(String),

    #[error("`{0}` is not on the whitelist.")]
    NotWhitelisted(String),

    #[error("Player name must not be empty.")]
    InvalidName,
}

/// Whitelist file bootstrap failures. Never surfaced to callers, only logged.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Failed to access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Server List Ping failures. Collapsed into an offline snapshot by the prober.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Failed to connect to {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out after {0} ms")]
    Timeout(u64),

    #[error("Invalid packet: {message}")]
    InvalidPacket { message: String },

    #[error("Unexpected packet id: expected {expected:#04x}, got {actual:#04x}")]
    UnexpectedPacket { expected: i32, actual: i32 },

    #[error("Connection closed by remote")]
    ConnectionClosed,

    #[error("Invalid status response: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outbound relay failures (Discord -> Minecraft).
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Relay returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Relay request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Inbound bridge failures (Minecraft -> Discord).
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Chat channel not found or bot has no access")]
    ChannelUnavailable,

    #[error("Serenity error: {0}")]
    Serenity(#[from] serenity::Error),
}

/// Result type alias for whitelist mutations.
pub type WhitelistResult<T> = std::result::Result<T, WhitelistError>;

/// Result type alias for probe operations.
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;
