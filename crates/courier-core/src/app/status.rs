//! Status - ワーカーの集計値とプロセス終了コード

use serde::{Deserialize, Serialize};

use crate::domain::WorkerError;

/// Counters accumulated by one worker loop run.
///
/// Returned on graceful shutdown and logged by the binary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    /// Messages received from the queue.
    pub received: u64,
    /// `message` records appended.
    pub recorded_messages: u64,
    /// `error` records appended.
    pub recorded_errors: u64,
    /// Records the store refused permanently.
    pub rejected_records: u64,
    /// Cycles that ended with a delete call returning.
    pub acknowledged: u64,
    /// Polls that returned no message.
    pub empty_polls: u64,
    /// Transient store/queue failures that were retried.
    pub transient_failures: u64,
}

/// Process exit status as seen by operator tooling.
///
/// Codes follow sysexits(3) where one fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Graceful shutdown after a signal.
    Graceful,
    /// Queue confirmed gone (`EX_UNAVAILABLE`).
    QueueGone,
    /// Missing or invalid configuration (`EX_CONFIG`).
    ConfigError,
    /// Any other failure before polling began.
    StartupFailure,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Graceful => 0,
            ExitStatus::StartupFailure => 1,
            ExitStatus::QueueGone => 69,
            ExitStatus::ConfigError => 78,
        }
    }
}

impl From<&WorkerError> for ExitStatus {
    fn from(err: &WorkerError) -> Self {
        match err {
            WorkerError::QueueGone(_) => ExitStatus::QueueGone,
        }
    }
}
