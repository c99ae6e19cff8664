//! Queue messages as seen by the worker.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One-time token identifying a specific delivery of a message.
///
/// Opaque to the worker; only the queue that issued it can interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An opaque unit of work received from the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    body: String,
    receipt_handle: ReceiptHandle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message_id: Option<String>,
}

impl QueueMessage {
    pub fn new(body: impl Into<String>, receipt_handle: ReceiptHandle) -> Self {
        Self {
            body: body.into(),
            receipt_handle,
            message_id: None,
        }
    }

    /// Attach the queue-assigned message id (used for logging only).
    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn receipt_handle(&self) -> &ReceiptHandle {
        &self.receipt_handle
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }
}
