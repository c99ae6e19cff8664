//! Errors - エラー型と分類
//!
//! # 分類
//! - Transient: `StoreError::Unavailable`, `QueueError::Unavailable`（backoff してリトライ）
//! - Permanent: `StoreError::Rejected`（ログに残してメッセージは削除）
//! - Fatal: `QueueError::NotFound`（`WorkerError::QueueGone` としてループを抜ける）
//!
//! ErrorSignal（メッセージ本文の分類結果）はエラーではなくデータとして扱う。

use thiserror::Error;

/// Operational classification used for logging and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Fatal,
}

/// Errors from `RecordStore::append`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached or throttled the write. Retry.
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    /// The store refused this record. Retrying the same record will not help.
    #[error("record store rejected record: {0}")]
    Rejected(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Unavailable(_) => ErrorKind::Transient,
            StoreError::Rejected(_) => ErrorKind::Permanent,
        }
    }
}

/// Errors from the queue client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The queue could not be reached. Retry with backoff.
    #[error("queue unavailable: {0}")]
    Unavailable(String),

    /// The queue was deleted or is misconfigured. The worker must stop.
    #[error("queue not found: {0}")]
    NotFound(String),
}

impl QueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::Unavailable(_) => ErrorKind::Transient,
            QueueError::NotFound(_) => ErrorKind::Fatal,
        }
    }
}

/// Reasons the worker loop ends without a graceful shutdown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    #[error("queue is gone: {0}")]
    QueueGone(String),
}
