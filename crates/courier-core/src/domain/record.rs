//! Outcome records: one entry per task lifecycle event.
//!
//! Records are append-only. The store key is (`record_type`, `timestamp`), so two
//! events of the same type within the same second collide; readers disambiguate
//! with `task_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::TaskId;

/// Timestamp format used in the store's sort key.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Kind of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    /// Written once when the worker process starts.
    Initialization,

    /// A message classified as normal.
    Message,

    /// A message classified as an error signal.
    Error,
}

impl RecordType {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::Initialization => "initialization",
            RecordType::Message => "message",
            RecordType::Error => "error",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UTC instant truncated to whole seconds, rendered as `2024-01-01T12:00:00Z`.
///
/// The string form sorts lexicographically in time order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordTimestamp(String);

impl RecordTimestamp {
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry written to the Record Store.
///
/// Built once per event. Retries re-send the same value, so a retried append
/// writes the same key and attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    record_type: RecordType,
    timestamp: RecordTimestamp,
    task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_kind: Option<String>,
}

impl OutcomeRecord {
    /// Startup record: no body.
    pub fn initialization(task_id: TaskId, at: DateTime<Utc>) -> Self {
        Self {
            record_type: RecordType::Initialization,
            timestamp: RecordTimestamp::from_datetime(at),
            task_id,
            body: None,
            error_kind: None,
        }
    }

    /// A normally processed message.
    pub fn message(task_id: TaskId, at: DateTime<Utc>, body: impl Into<String>) -> Self {
        Self {
            record_type: RecordType::Message,
            timestamp: RecordTimestamp::from_datetime(at),
            task_id,
            body: Some(body.into()),
            error_kind: None,
        }
    }

    /// A message that carried a recognised error signal. `body` is the full raw body.
    pub fn error(
        task_id: TaskId,
        at: DateTime<Utc>,
        body: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            record_type: RecordType::Error,
            timestamp: RecordTimestamp::from_datetime(at),
            task_id,
            body: Some(body.into()),
            error_kind: Some(kind.into()),
        }
    }

    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    pub fn timestamp(&self) -> &RecordTimestamp {
        &self.timestamp
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn error_kind(&self) -> Option<&str> {
        self.error_kind.as_deref()
    }
}
