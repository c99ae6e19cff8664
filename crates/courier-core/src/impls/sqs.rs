//! SqsQueueClient - Amazon SQS を使う本番用 QueueClient
//!
//! # エラーの対応
//! | SQS error code                                   | QueueError                 |
//! |--------------------------------------------------|----------------------------|
//! | `QueueDoesNotExist` / `...NonExistentQueue`       | `NotFound`                 |
//! | `ReceiptHandleIsInvalid` / `InvalidIdFormat` (delete) | `Ok(())`（冪等な delete） |
//! | その他（throttling, 通信エラー, timeout など）   | `Unavailable`              |

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use tracing::{debug, warn};

use crate::domain::{QueueError, QueueMessage, ReceiptHandle};
use crate::ports::QueueClient;

/// SQS caps long polling at 20 seconds.
pub const MAX_WAIT_SECONDS: u64 = 20;

/// SQS caps a single receive at 10 messages.
const MAX_MESSAGES: u32 = 10;

const QUEUE_MISSING_CODES: &[&str] = &[
    "QueueDoesNotExist",
    "AWS.SimpleQueueService.NonExistentQueue",
];

const STALE_RECEIPT_CODES: &[&str] = &[
    "ReceiptHandleIsInvalid",
    "InvalidIdFormat",
    "AWS.SimpleQueueService.ReceiptHandleIsInvalid",
];

/// Queue client bound to one SQS queue, resolved by name at construction.
#[derive(Debug, Clone)]
pub struct SqsQueueClient {
    client: Client,
    queue_name: String,
    queue_url: String,
}

impl SqsQueueClient {
    /// Resolve `queue_name` to its URL. A missing queue is `NotFound`.
    pub async fn connect(client: Client, queue_name: impl Into<String>) -> Result<Self, QueueError> {
        let queue_name = queue_name.into();
        let output = client
            .get_queue_url()
            .queue_name(&queue_name)
            .send()
            .await
            .map_err(|err| map_error(&queue_name, err))?;
        let queue_url = output
            .queue_url()
            .ok_or_else(|| QueueError::NotFound(queue_name.clone()))?
            .to_string();

        debug!(%queue_name, %queue_url, "resolved SQS queue");
        Ok(Self {
            client,
            queue_name,
            queue_url,
        })
    }

    /// Connect with a shared SDK config (see [`load_aws_config`](super::load_aws_config)).
    pub async fn from_config(
        config: &aws_config::SdkConfig,
        queue_name: impl Into<String>,
    ) -> Result<Self, QueueError> {
        Self::connect(Client::new(config), queue_name).await
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl QueueClient for SqsQueueClient {
    async fn receive(
        &self,
        max_messages: u32,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages.clamp(1, MAX_MESSAGES) as i32)
            .wait_time_seconds(wait.as_secs().min(MAX_WAIT_SECONDS) as i32)
            .send()
            .await
            .map_err(|err| map_error(&self.queue_name, err))?;

        let messages = output
            .messages()
            .iter()
            .filter_map(|m| {
                let Some(handle) = m.receipt_handle() else {
                    warn!(message_id = m.message_id().unwrap_or("-"), "message without receipt handle");
                    return None;
                };
                let message = QueueMessage::new(m.body().unwrap_or_default(), ReceiptHandle::new(handle));
                Some(match m.message_id() {
                    Some(id) => message.with_message_id(id),
                    None => message,
                })
            })
            .collect();
        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &ReceiptHandle) -> Result<(), QueueError> {
        match self
            .client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle.as_str())
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if err.code().is_some_and(is_stale_receipt_code) => {
                debug!(%receipt_handle, code = err.code().unwrap_or("-"), "receipt handle already gone");
                Ok(())
            }
            Err(err) => Err(map_error(&self.queue_name, err)),
        }
    }
}

fn is_queue_missing_code(code: &str) -> bool {
    QUEUE_MISSING_CODES.contains(&code)
}

fn is_stale_receipt_code(code: &str) -> bool {
    STALE_RECEIPT_CODES.contains(&code)
}

fn map_error<E, R>(queue_name: &str, err: SdkError<E, R>) -> QueueError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    if err.code().is_some_and(is_queue_missing_code) {
        QueueError::NotFound(queue_name.to_string())
    } else {
        QueueError::Unavailable(DisplayErrorContext(&err).to_string())
    }
}
