use crate::core::log::{millis, LogEntry};
use crate::domain::config::Endpoint;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection lifecycle of the session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No socket; ready for a connect
    #[default]
    Idle,
    /// Connect attempt in flight
    Connecting,
    /// Socket open and usable
    Connected,
    /// Graceful close in progress
    Disconnecting,
    /// Last connect attempt failed
    Closed(Option<String>),
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected)
    }

    /// Whether a new connect may start from this state.
    ///
    /// `Closed` counts as idle: a failed attempt never blocks the next one.
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Closed(_))
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Connecting => write!(f, "Connecting"),
            SessionState::Connected => write!(f, "Connected"),
            SessionState::Disconnecting => write!(f, "Disconnecting"),
            SessionState::Closed(Some(reason)) => write!(f, "Closed ({})", reason),
            SessionState::Closed(None) => write!(f, "Closed"),
        }
    }
}

/// Mutable connection facts guarded by the session's state lock
#[derive(Debug, Default)]
pub(crate) struct SessionCore {
    pub state: SessionState,
    pub endpoint: Option<Endpoint>,
    pub last_activity: Option<DateTime<Local>>,
    /// Bumped on every connect so a stale reader cannot touch a newer socket
    pub generation: u64,
}

/// Read-only status view handed to the UI layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_info: Option<String>,
    pub log: Vec<LogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "millis::option")]
    pub last_activity: Option<DateTime<Local>>,
    #[serde(with = "millis")]
    pub last_updated: DateTime<Local>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_info: Option<String>,
}

impl StatusSnapshot {
    pub(crate) fn from_core(core: &SessionCore, log: Vec<LogEntry>) -> Self {
        let endpoint = core
            .endpoint
            .as_ref()
            .filter(|_| core.state.is_connected());

        Self {
            connected: core.state.is_connected(),
            connection_info: endpoint.map(|e| e.to_string()),
            log,
            last_activity: core.last_activity,
            last_updated: Local::now(),
            server_info: endpoint.map(|e| format!("Connected to TCP server at {}", e)),
        }
    }
}
