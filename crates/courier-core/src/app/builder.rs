//! WorkerBuilder - WorkerLoop の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - QueueClient と RecordStore は必須。欠けていれば build() が BuildError を返す
//! - それ以外（Clock, TaskId, RetryPolicy, wait, classifier, shutdown）は既定値を持つ

use std::sync::Arc;
use std::time::Duration;

use super::retry::RetryPolicy;
use super::shutdown::ShutdownSignal;
use super::worker_loop::WorkerLoop;
use crate::domain::{MessageClassifier, TaskId};
use crate::ports::{Clock, IdGenerator, QueueClient, RecordStore, SystemClock, UlidGenerator};

/// Default long-poll duration.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(10);

/// BuildError はワーカー構築時のエラー
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("queue client is required")]
    MissingQueueClient,

    #[error("record store is required")]
    MissingRecordStore,
}

/// WorkerBuilder は WorkerLoop を構築
///
/// # 使用例
/// ```ignore
/// let worker = WorkerBuilder::new()
///     .queue(Arc::new(queue))
///     .store(Arc::new(store))
///     .shutdown(signal)
///     .build()?;
/// let stats = worker.run().await?;
/// ```
pub struct WorkerBuilder {
    queue: Option<Arc<dyn QueueClient>>,
    store: Option<Arc<dyn RecordStore>>,
    clock: Arc<dyn Clock>,
    task_id: Option<TaskId>,
    classifier: MessageClassifier,
    retry_policy: RetryPolicy,
    wait: Duration,
    shutdown: Option<ShutdownSignal>,
}

impl WorkerBuilder {
    pub fn new() -> Self {
        Self {
            queue: None,
            store: None,
            clock: Arc::new(SystemClock),
            task_id: None,
            classifier: MessageClassifier::default(),
            retry_policy: RetryPolicy::default(),
            wait: DEFAULT_WAIT,
            shutdown: None,
        }
    }

    pub fn queue(mut self, queue: Arc<dyn QueueClient>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Use a fixed task id instead of generating one.
    pub fn task_id(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn classifier(mut self, classifier: MessageClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Long-poll duration per receive.
    pub fn wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// TaskId はここで 1 度だけ生成され、WorkerLoop の寿命の間は変わらない
    pub fn build(self) -> Result<WorkerLoop, BuildError> {
        let queue = self.queue.ok_or(BuildError::MissingQueueClient)?;
        let store = self.store.ok_or(BuildError::MissingRecordStore)?;
        let task_id = match self.task_id {
            Some(task_id) => task_id,
            None => UlidGenerator::new(Arc::clone(&self.clock)).generate_task_id(),
        };

        Ok(WorkerLoop::new(
            task_id,
            queue,
            store,
            self.classifier,
            self.clock,
            self.retry_policy,
            self.wait,
            self.shutdown.unwrap_or_else(ShutdownSignal::never),
        ))
    }
}

impl Default for WorkerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
