//! RecordStore port - 追記専用の結果ストア
//!
//! # 実装
//! - **InMemoryRecordStore**: テスト・ローカル実行用
//! - **DynamoDbRecordStore**: 本番用（feature `aws`）

use async_trait::async_trait;

use crate::domain::{OutcomeRecord, StoreError};

/// RecordStore は OutcomeRecord を永続化する
///
/// # 設計原則
/// - 追記のみ（更新・削除はしない）
/// - `Ok(())` が返った時点で書き込みは永続化済み。部分的な書き込みは観測されない
/// - 同じ record の再送は同じキー・同じ属性の書き込みになる
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Append one record.
    ///
    /// `Unavailable` may be retried with the same record; `Rejected` must not.
    async fn append(&self, record: &OutcomeRecord) -> Result<(), StoreError>;
}
