use crate::domain::error::{HexLinkError, HexLinkResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// HexLink configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HexLinkConfig {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// TCP session behavior
    #[serde(default)]
    pub session: SessionConfig,
    /// HTTP API settings
    #[serde(default)]
    pub http: HttpConfig,
    /// User-defined command presets
    #[serde(default)]
    pub presets: Vec<HexPreset>,
}

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Number of recent connections remembered
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

/// TCP session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Connect attempt bound in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// How long a send waits for its reply
    #[serde(default)]
    pub reply_wait: ReplyWait,
    /// Pause between repeated sends in milliseconds
    #[serde(default = "default_repeat_pause")]
    pub repeat_pause_ms: u64,
    /// Activity log entries kept in memory
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    /// Activity log entries returned by a status read
    #[serde(default = "default_status_log_limit")]
    pub status_log_limit: usize,
    /// Disable Nagle on the socket
    #[serde(default = "default_no_delay")]
    pub no_delay: bool,
}

/// Reply collection strategy.
///
/// There is no framing on the wire, so a reply is "complete" when the
/// strategy says so. Bytes arriving afterwards still reach the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReplyWait {
    /// Wait a fixed quiet window after every write.
    #[serde(rename = "fixed")]
    Fixed {
        #[serde(default = "default_reply_window")]
        window_ms: u64,
    },
    /// Wait until `idle_ms` pass without new bytes, bounded by `max_ms`.
    #[serde(rename = "idle")]
    Idle { idle_ms: u64, max_ms: u64 },
}

/// HTTP API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Bind address
    #[serde(default = "default_http_bind")]
    pub bind: String,
    /// Listen port
    #[serde(default = "default_http_port")]
    pub port: u16,
    /// Upper bound for one operation, in milliseconds
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_ms: u64,
}

/// Named hex command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexPreset {
    /// Preset name
    pub name: String,
    /// Preset description
    #[serde(default)]
    pub description: String,
    /// Hex payload
    pub code: String,
}

/// Remote TCP endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_history_limit() -> usize {
    10
}

fn default_connect_timeout() -> u64 {
    10_000
}

fn default_reply_window() -> u64 {
    1_000
}

fn default_repeat_pause() -> u64 {
    50
}

fn default_log_capacity() -> usize {
    100
}

fn default_status_log_limit() -> usize {
    50
}

fn default_no_delay() -> bool {
    true
}

fn default_http_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    5000
}

fn default_operation_timeout() -> u64 {
    15_000
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            history_limit: default_history_limit(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            reply_wait: ReplyWait::default(),
            repeat_pause_ms: default_repeat_pause(),
            log_capacity: default_log_capacity(),
            status_log_limit: default_status_log_limit(),
            no_delay: default_no_delay(),
        }
    }
}

impl SessionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn repeat_pause(&self) -> Duration {
        Duration::from_millis(self.repeat_pause_ms)
    }
}

impl Default for ReplyWait {
    fn default() -> Self {
        ReplyWait::Fixed {
            window_ms: default_reply_window(),
        }
    }
}

impl ReplyWait {
    /// Longest time a send can spend waiting for its reply.
    pub fn upper_bound(&self) -> Duration {
        match self {
            ReplyWait::Fixed { window_ms } => Duration::from_millis(*window_ms),
            ReplyWait::Idle { max_ms, .. } => Duration::from_millis(*max_ms),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_http_bind(),
            port: default_http_port(),
            operation_timeout_ms: default_operation_timeout(),
        }
    }
}

impl HttpConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl HexPreset {
    fn builtin(name: &str, description: &str, code: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            code: code.to_string(),
        }
    }

    /// Relay and generic controller commands shipped with the tool.
    pub fn builtins() -> Vec<HexPreset> {
        vec![
            Self::builtin("Relay1 ON", "Relay control", "A0 01 01 A2"),
            Self::builtin("Relay1 OFF", "Relay control", "A0 01 00 A1"),
            Self::builtin("Relay2 ON", "Relay control", "A0 02 01 A3"),
            Self::builtin("Relay2 OFF", "Relay control", "A0 02 00 A2"),
            Self::builtin("Ping", "Common command", "FF 00 00"),
            Self::builtin("Status", "Common command", "FF 01 00"),
            Self::builtin("Reset", "Common command", "FF 02 00"),
            Self::builtin("On", "Common command", "01 01 01"),
            Self::builtin("Off", "Common command", "01 00 00"),
            Self::builtin("Toggle", "Common command", "01 02 00"),
        ]
    }
}

impl HexLinkConfig {
    /// Built-in presets followed by configured ones.
    pub fn all_presets(&self) -> Vec<HexPreset> {
        let mut presets = HexPreset::builtins();
        presets.extend(self.presets.iter().cloned());
        presets
    }

    /// Look up a preset by name, case-insensitively.
    pub fn find_preset(&self, name: &str) -> Option<HexPreset> {
        self.all_presets()
            .into_iter()
            .find(|preset| preset.name.eq_ignore_ascii_case(name))
    }
}

impl Endpoint {
    /// Build an endpoint, rejecting an empty host or a port outside 1..=65535.
    pub fn new(host: impl Into<String>, port: u32) -> HexLinkResult<Self> {
        let host = host.into().trim().to_string();
        if host.is_empty() {
            return Err(HexLinkError::InvalidEndpoint("host is required".to_string()));
        }
        let port = u16::try_from(port)
            .ok()
            .filter(|port| *port != 0)
            .ok_or_else(|| {
                HexLinkError::InvalidEndpoint(format!("port {} is outside 1-65535", port))
            })?;

        Ok(Self { host, port })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
