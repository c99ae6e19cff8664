//! QueueClient port - 外部メッセージキューへの receive / delete
//!
//! # 実装
//! - **InMemoryQueueClient**: テスト・ローカル実行用（visibility timeout を再現）
//! - **SqsQueueClient**: 本番用（feature `aws`）

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::{QueueError, QueueMessage, ReceiptHandle};

/// QueueClient は at-least-once のキューを抽象化する
///
/// # 設計原則
/// - receive は最大 `wait` だけ long-poll し、タイムアウトは空の Vec（エラーではない）
/// - 受信したメッセージは visibility timeout の間だけ他のコンシューマから見えない
/// - delete は冪等。削除済み・期限切れの receipt handle でも `Ok(())`
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Receive at most `max_messages` messages, waiting up to `wait`.
    async fn receive(
        &self,
        max_messages: u32,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError>;

    /// Acknowledge one delivery.
    async fn delete(&self, receipt_handle: &ReceiptHandle) -> Result<(), QueueError>;
}
