//! Activity log
//!
//! Bounded, append-only record of what happened on the session. The
//! oldest entry is evicted once capacity is reached. Appends are
//! serialized by the owning session; the log itself does no locking.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, info, warn};

/// Entries kept when no capacity is configured.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Log entry category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Error,
    Sent,
    Received,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogKind::Info => f.pad("info"),
            LogKind::Error => f.pad("error"),
            LogKind::Sent => f.pad("sent"),
            LogKind::Received => f.pad("received"),
        }
    }
}

/// Single timestamped log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(with = "millis")]
    pub timestamp: DateTime<Local>,
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl ActivityLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry stamped with the current time, evicting the oldest
    /// when full. The entry is mirrored to `tracing`.
    pub fn append(&mut self, kind: LogKind, message: impl Into<String>) -> &LogEntry {
        let entry = LogEntry {
            timestamp: Local::now(),
            kind,
            message: message.into(),
        };

        match kind {
            LogKind::Info => info!(target: "hexlink::activity", "{}", entry.message),
            LogKind::Error => warn!(target: "hexlink::activity", "{}", entry.message),
            LogKind::Sent | LogKind::Received => {
                debug!(target: "hexlink::activity", "{}", entry.message)
            }
        }

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);

        // Just pushed, so never empty.
        &self.entries[self.entries.len() - 1]
    }

    /// Most recent `max_entries` entries, oldest first.
    pub fn snapshot(&self, max_entries: usize) -> Vec<LogEntry> {
        let skip = self.entries.len().saturating_sub(max_entries);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

/// RFC 3339 timestamps with millisecond precision.
pub(crate) mod millis {
    use chrono::{DateTime, Local, SecondsFormat};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Local>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, false))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Local>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Local))
            .map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Local};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Local>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Local>>, D::Error> {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            raw.map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|dt| dt.with_timezone(&Local))
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_never_exceeds_capacity() {
        let mut log = ActivityLog::default();

        for i in 0..1000 {
            log.append(LogKind::Info, format!("entry {}", i));
        }

        assert_eq!(log.len(), 100);
        assert_eq!(log.snapshot(usize::MAX).first().unwrap().message, "entry 900");
        assert_eq!(log.last().unwrap().message, "entry 999");
    }

    #[test]
    fn test_snapshot_returns_most_recent_in_order() {
        let mut log = ActivityLog::default();
        for i in 0..1000 {
            log.append(LogKind::Sent, format!("entry {}", i));
        }

        let recent = log.snapshot(50);
        assert_eq!(recent.len(), 50);
        for (offset, entry) in recent.iter().enumerate() {
            assert_eq!(entry.message, format!("entry {}", 950 + offset));
        }
        // Snapshots do not consume entries
        assert_eq!(log.len(), 100);
    }

    #[test]
    fn test_snapshot_smaller_than_request() {
        let mut log = ActivityLog::with_capacity(5);
        log.append(LogKind::Info, "one");
        log.append(LogKind::Error, "two");

        let entries = log.snapshot(50);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, LogKind::Info);
        assert_eq!(entries[1].kind, LogKind::Error);
        assert!(entries[0].timestamp <= entries[1].timestamp);
    }

    #[test]
    fn test_entry_serializes_with_type_field() {
        let mut log = ActivityLog::default();
        let entry = log.append(LogKind::Received, "Received: 4F 4B").clone();

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "received");
        assert_eq!(json["message"], "Received: 4F 4B");
        let stamp = json["timestamp"].as_str().unwrap();
        // Millisecond precision: "...T12:34:56.789+02:00"
        assert!(stamp.contains('.'));

        let back: LogEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind, LogKind::Received);
        assert_eq!(back.message, entry.message);
    }
}
