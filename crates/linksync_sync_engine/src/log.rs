//! Bounded log of reconciliation events.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

/// Category of a sync log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    /// Informational message.
    Info,
    /// A run or load finished.
    Success,
    /// Something failed.
    Error,
    /// A write to the remote store.
    DatabaseChange,
}

impl LogKind {
    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Info => "info",
            LogKind::Success => "success",
            LogKind::Error => "error",
            LogKind::DatabaseChange => "database_change",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(LogKind::Info),
            "success" => Ok(LogKind::Success),
            "error" => Ok(LogKind::Error),
            "database_change" => Ok(LogKind::DatabaseChange),
            other => Err(format!("unknown log kind: {other}")),
        }
    }
}

/// One sync log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Unique id.
    pub id: String,
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// Category.
    pub kind: LogKind,
    /// Human readable message.
    pub message: String,
    /// Structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// The most recent remote write, kept across log clears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseChange {
    /// When the write happened.
    pub timestamp: DateTime<Utc>,
    /// Message of the log entry that recorded it.
    pub message: String,
    /// Payload of that entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

struct Inner {
    entries: VecDeque<LogEntry>,
    last_change: Option<DatabaseChange>,
}

/// Newest-first ring buffer of sync events.
///
/// Every entry is also emitted as a `tracing` event.
pub struct SyncLog {
    capacity: usize,
    inner: RwLock<Inner>,
}

impl SyncLog {
    /// Creates a log holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: RwLock::new(Inner {
                entries: VecDeque::with_capacity(capacity),
                last_change: None,
            }),
        }
    }

    /// Returns the capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends an entry, evicting the oldest one when full.
    pub fn record(
        &self,
        kind: LogKind,
        message: impl Into<String>,
        details: Option<Value>,
    ) -> LogEntry {
        let entry = LogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            message: message.into(),
            details,
        };

        match kind {
            LogKind::Error => tracing::warn!(kind = %kind, "{}", entry.message),
            LogKind::Info => tracing::debug!(kind = %kind, "{}", entry.message),
            LogKind::Success | LogKind::DatabaseChange => {
                tracing::info!(kind = %kind, "{}", entry.message)
            }
        }

        let mut inner = self.inner.write();
        if kind == LogKind::DatabaseChange {
            inner.last_change = Some(DatabaseChange {
                timestamp: entry.timestamp,
                message: entry.message.clone(),
                details: entry.details.clone(),
            });
        }
        inner.entries.push_front(entry.clone());
        inner.entries.truncate(self.capacity);
        entry
    }

    /// Records an info entry.
    pub fn info(&self, message: impl Into<String>) -> LogEntry {
        self.record(LogKind::Info, message, None)
    }

    /// Records a success entry.
    pub fn success(&self, message: impl Into<String>, details: Option<Value>) -> LogEntry {
        self.record(LogKind::Success, message, details)
    }

    /// Records an error entry.
    pub fn error(&self, message: impl Into<String>, details: Option<Value>) -> LogEntry {
        self.record(LogKind::Error, message, details)
    }

    /// Records a remote write.
    pub fn database_change(&self, message: impl Into<String>, details: Option<Value>) -> LogEntry {
        self.record(LogKind::DatabaseChange, message, details)
    }

    /// Returns entries newest first, optionally restricted to one kind.
    pub fn list(&self, kind: Option<LogKind>) -> Vec<LogEntry> {
        self.inner
            .read()
            .entries
            .iter()
            .filter(|e| kind.map_or(true, |k| e.kind == k))
            .cloned()
            .collect()
    }

    /// Removes every entry. The last database change is kept.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.write();
        let removed = inner.entries.len();
        inner.entries.clear();
        removed
    }

    /// Returns the most recent remote write, if any.
    pub fn last_database_change(&self) -> Option<DatabaseChange> {
        self.inner.read().last_change.clone()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Returns true if the log holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SyncLog {
    fn default() -> Self {
        Self::new(100)
    }
}
