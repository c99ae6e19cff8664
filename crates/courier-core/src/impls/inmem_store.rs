//! InMemoryRecordStore - 開発・テスト用の追記専用ストア
//!
//! プロセス内の Vec に追記するだけなので、プロセスが落ちれば消える。
//! 永続性が必要な場合は DynamoDbRecordStore を使う。

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{OutcomeRecord, RecordType, StoreError, TaskId};
use crate::ports::RecordStore;

/// Append-only, insertion-ordered record store.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: Mutex<Vec<OutcomeRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record in insertion order.
    pub async fn records(&self) -> Vec<OutcomeRecord> {
        self.records.lock().await.clone()
    }

    /// Records of one task, ordered by timestamp then insertion order.
    pub async fn records_for_task(&self, task_id: TaskId) -> Vec<OutcomeRecord> {
        let mut records: Vec<OutcomeRecord> = self
            .records
            .lock()
            .await
            .iter()
            .filter(|r| r.task_id() == task_id)
            .cloned()
            .collect();
        // stable sort keeps insertion order within the same second
        records.sort_by(|a, b| a.timestamp().cmp(b.timestamp()));
        records
    }

    /// Lookup by the store key. Several records may share a key; all are returned.
    pub async fn get(&self, record_type: RecordType, timestamp: &str) -> Vec<OutcomeRecord> {
        self.records
            .lock()
            .await
            .iter()
            .filter(|r| r.record_type() == record_type && r.timestamp().as_str() == timestamp)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn append(&self, record: &OutcomeRecord) -> Result<(), StoreError> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }
}
