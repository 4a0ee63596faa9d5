use crate::domain::{config::Endpoint, error::{HexLinkError, HexLinkResult}};
use crate::core::log::millis;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// One remembered connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub host: String,
    pub port: u16,
    #[serde(with = "millis")]
    pub connected_at: DateTime<Local>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    connections: Vec<HistoryEntry>,
}

/// Recent successful connections, most recent first
pub struct HistoryStore {
    path: PathBuf,
    limit: usize,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            path: path.into(),
            limit,
            write_lock: Mutex::new(()),
        }
    }

    /// Store under the user's config directory
    pub fn in_config_dir(limit: usize) -> HexLinkResult<Self> {
        let home = dirs::home_dir().ok_or_else(|| HexLinkError::Config {
            message: "Could not determine home directory".to_string(),
        })?;

        Ok(Self::new(
            home.join(".config").join("hexlink").join("history.toml"),
            limit,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the history. A missing or unreadable file is an empty history.
    pub fn load(&self) -> Vec<HistoryEntry> {
        if !self.path.exists() {
            return Vec::new();
        }

        let parsed = fs::read_to_string(&self.path)
            .map_err(|e| e.to_string())
            .and_then(|content| {
                toml::from_str::<HistoryFile>(&content).map_err(|e| e.to_string())
            });

        match parsed {
            Ok(file) => file.connections,
            Err(e) => {
                warn!("Ignoring unreadable history file {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// Move `endpoint` to the front, dropping duplicates and the overflow.
    pub fn record(&self, endpoint: &Endpoint) -> HexLinkResult<Vec<HistoryEntry>> {
        let _guard = self.write_lock.lock();

        let mut connections = self.load();
        connections.retain(|entry| !(entry.host == endpoint.host && entry.port == endpoint.port));
        connections.insert(
            0,
            HistoryEntry {
                host: endpoint.host.clone(),
                port: endpoint.port,
                connected_at: Local::now(),
            },
        );
        connections.truncate(self.limit);

        self.save(&connections)?;
        Ok(connections)
    }

    fn save(&self, connections: &[HistoryEntry]) -> HexLinkResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| HexLinkError::Config {
                message: format!("Failed to create history directory: {}", e),
            })?;
        }

        let file = HistoryFile {
            connections: connections.to_vec(),
        };
        let content = toml::to_string_pretty(&file).map_err(|e| HexLinkError::Config {
            message: format!("Failed to serialize history: {}", e),
        })?;

        fs::write(&self.path, content).map_err(|e| HexLinkError::Config {
            message: format!("Failed to write history file {}: {}", self.path.display(), e),
        })
    }
}
