//! Player whitelist with best-effort file persistence.
//!
//! The in-memory list is authoritative. After every mutation the whole list
//! is rewritten to the backing JSON file, but only if the file could be
//! bootstrapped at startup. A failed bootstrap switches the store to
//! in-memory mode for the rest of the process lifetime; it is never re-probed.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::common::error::{PersistError, WhitelistError, WhitelistResult};

/// A whitelisted player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistEntry {
    pub name: String,
    pub added_by: String,
    pub added_at: DateTime<Utc>,
}

/// Whitelist store shared by the command and HTTP handlers.
#[derive(Debug)]
pub struct WhitelistStore {
    entries: RwLock<Vec<WhitelistEntry>>,
    /// Backing file. `None` once persistence is disabled.
    path: Option<PathBuf>,
}

impl WhitelistStore {
    /// Open the store backed by `path`, falling back to in-memory mode on any
    /// bootstrap failure.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match bootstrap(&path).await {
            Ok(entries) => {
                info!("Loaded {} whitelisted player(s) from {}", entries.len(), path.display());
                Self {
                    entries: RwLock::new(entries),
                    path: Some(path),
                }
            }
            Err(e) => {
                warn!("Persistent whitelist storage not available ({}), using in-memory storage", e);
                warn!("Whitelist changes will be lost on restart");
                Self::in_memory()
            }
        }
    }

    /// Create a store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            path: None,
        }
    }

    /// Whether mutations are mirrored to disk.
    pub fn is_persistent(&self) -> bool {
        self.path.is_some()
    }

    pub async fn is_whitelisted(&self, name: &str) -> bool {
        let entries = self.entries.read().await;
        position(&entries, name).is_some()
    }

    /// Add a player. Returns the confirmation message shown to users.
    pub async fn add(&self, name: &str, added_by: &str) -> WhitelistResult<String> {
        let name = normalize(name)?;
        let mut entries = self.entries.write().await;

        if position(&entries, name).is_some() {
            return Err(WhitelistError::AlreadyWhitelisted(name.to_string()));
        }

        entries.push(WhitelistEntry {
            name: name.to_string(),
            added_by: added_by.to_string(),
            added_at: Utc::now(),
        });
        self.persist(&entries).await;

        info!("Whitelisted {} (added by {})", name, added_by);
        Ok(format!("✅ `{}` has been added to the whitelist.", name))
    }

    /// Remove the first case-insensitive match. Returns the confirmation message.
    pub async fn remove(&self, name: &str) -> WhitelistResult<String> {
        let name = normalize(name)?;
        let mut entries = self.entries.write().await;

        let index = position(&entries, name)
            .ok_or_else(|| WhitelistError::NotWhitelisted(name.to_string()))?;
        let removed = entries.remove(index);
        self.persist(&entries).await;

        info!("Removed {} from whitelist", removed.name);
        Ok(format!("🗑️ `{}` has been removed from the whitelist.", name))
    }

    /// Snapshot of the current list in insertion order.
    pub async fn list(&self) -> Vec<WhitelistEntry> {
        self.entries.read().await.clone()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn persist(&self, entries: &[WhitelistEntry]) {
        let Some(path) = &self.path else {
            return;
        };

        let json = match serde_json::to_string_pretty(entries) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize whitelist: {}", e);
                return;
            }
        };

        if let Err(e) = tokio::fs::write(path, json).await {
            error!("Whitelist write to {} failed: {}", path.display(), e);
        }
    }
}

fn normalize(name: &str) -> WhitelistResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(WhitelistError::InvalidName);
    }
    Ok(name)
}

fn position(entries: &[WhitelistEntry], name: &str) -> Option<usize> {
    let needle = name.trim().to_lowercase();
    entries.iter().position(|e| e.name.to_lowercase() == needle)
}

/// Ensure the directory and file exist, then read the list.
async fn bootstrap(path: &Path) -> Result<Vec<WhitelistEntry>, PersistError> {
    let io_err = |source| PersistError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await.map_err(io_err)?;
    }

    if !tokio::fs::try_exists(path).await.map_err(io_err)? {
        tokio::fs::write(path, "[]").await.map_err(io_err)?;
    }

    let raw = tokio::fs::read_to_string(path).await.map_err(io_err)?;
    serde_json::from_str(&raw).map_err(|source| PersistError::Parse {
        path: path.display().to_string(),
        source,
    })
}
