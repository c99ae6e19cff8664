//! WorkerLoop - キューを drain し、結果を Record Store に記録するループ
//!
//! # 1 cycle のフロー
//! 1. Polling: `QueueClient::receive(1, wait)`（shutdown と競合させる）
//! 2. Classifying: `MessageClassifier::classify(body)`
//! 3. Recording: `RecordStore::append(record)`（Unavailable はリトライ、Rejected はログのみ）
//! 4. Acknowledging: `QueueClient::delete(receipt_handle)`
//!
//! 重要: delete は record が永続化された後（または Rejected が確定した後）にしか呼ばない。
//! record 前にクラッシュしてもメッセージは visibility timeout 後に再配送される。

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::retry::RetryPolicy;
use super::shutdown::ShutdownSignal;
use super::status::WorkerStats;
use crate::domain::{
    Classification, MessageClassifier, OutcomeRecord, QueueError, QueueMessage, ReceiptHandle,
    StoreError, TaskId, WorkerError,
};
use crate::ports::{Clock, QueueClient, RecordStore};

/// Messages requested per receive call.
pub const MAX_MESSAGES_PER_POLL: u32 = 1;

/// Whether a store backoff may be cut short by shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backoff {
    /// Recording: a received message is never abandoned mid-cycle.
    UntilDurable,
    /// Startup: nothing is in flight yet.
    UnlessShutdown,
}

/// Outcome of an append that did not fail permanently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Appended {
    Durable,
    Interrupted,
}

/// Result of one Polling state.
enum Polled {
    Messages(Vec<QueueMessage>),
    Empty,
    Shutdown,
}

/// The single long-running orchestrator of a worker process.
///
/// All collaborators are injected (see [`WorkerBuilder`](super::WorkerBuilder)).
pub struct WorkerLoop {
    task_id: TaskId,
    queue: Arc<dyn QueueClient>,
    store: Arc<dyn RecordStore>,
    classifier: MessageClassifier,
    clock: Arc<dyn Clock>,
    retry_policy: RetryPolicy,
    wait: Duration,
    shutdown: ShutdownSignal,
    stats: WorkerStats,
}

impl WorkerLoop {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        task_id: TaskId,
        queue: Arc<dyn QueueClient>,
        store: Arc<dyn RecordStore>,
        classifier: MessageClassifier,
        clock: Arc<dyn Clock>,
        retry_policy: RetryPolicy,
        wait: Duration,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            task_id,
            queue,
            store,
            classifier,
            clock,
            retry_policy,
            wait,
            shutdown,
            stats: WorkerStats::default(),
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Run until shutdown (`Ok`) or until the queue is confirmed gone (`Err`).
    ///
    /// Writes the `initialization` record before the first poll.
    pub async fn run(mut self) -> Result<WorkerStats, WorkerError> {
        info!(task_id = %self.task_id, wait_secs = self.wait.as_secs(), "worker starting");
        if !self.record_initialization().await {
            info!(task_id = %self.task_id, "shutdown requested before initialization was recorded");
            return Ok(self.stats);
        }

        loop {
            if self.shutdown.is_requested() {
                break;
            }

            match self.poll().await? {
                Polled::Shutdown => break,
                Polled::Empty => {
                    self.stats.empty_polls += 1;
                    debug!(task_id = %self.task_id, "no message");
                }
                Polled::Messages(messages) => {
                    for message in messages {
                        self.process(message).await;
                    }
                }
            }
        }

        info!(task_id = %self.task_id, stats = ?self.stats, "worker stopped");
        Ok(self.stats)
    }

    /// Returns `false` when shutdown arrived while the store was unavailable.
    async fn record_initialization(&mut self) -> bool {
        let record = OutcomeRecord::initialization(self.task_id, self.clock.now());
        match self.append_with_retry(&record, Backoff::UnlessShutdown).await {
            Ok(Appended::Durable) => {
                info!(task_id = %self.task_id, timestamp = %record.timestamp(), "task initialized");
                true
            }
            Ok(Appended::Interrupted) => false,
            Err(err) => {
                self.stats.rejected_records += 1;
                error!(task_id = %self.task_id, error = %err, "initialization record rejected");
                true
            }
        }
    }

    /// Polling state. Retries `Unavailable` with backoff; `NotFound` is fatal.
    async fn poll(&mut self) -> Result<Polled, WorkerError> {
        let mut attempts = 0u32;
        loop {
            let received = tokio::select! {
                biased;
                _ = self.shutdown.requested() => return Ok(Polled::Shutdown),
                received = self.queue.receive(MAX_MESSAGES_PER_POLL, self.wait) => received,
            };

            match received {
                Ok(messages) if messages.is_empty() => return Ok(Polled::Empty),
                Ok(messages) => return Ok(Polled::Messages(messages)),
                Err(QueueError::NotFound(queue)) => {
                    error!(task_id = %self.task_id, %queue, "queue not found, entering fatal state");
                    return Err(WorkerError::QueueGone(queue));
                }
                Err(err) => {
                    attempts += 1;
                    self.stats.transient_failures += 1;
                    let delay = self.retry_policy.next_delay(attempts);
                    warn!(
                        task_id = %self.task_id,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        error_kind = ?err.kind(),
                        "receive failed, backing off"
                    );
                    if !self.sleep_unless_shutdown(delay).await {
                        return Ok(Polled::Shutdown);
                    }
                }
            }
        }
    }

    /// Classifying → Recording → Acknowledging for one message.
    async fn process(&mut self, message: QueueMessage) {
        self.stats.received += 1;
        info!(
            task_id = %self.task_id,
            message_id = message.message_id().unwrap_or("-"),
            body = message.body(),
            "received message"
        );

        let classification = self.classifier.classify(message.body());
        let now = self.clock.now();
        let record = match &classification {
            Classification::Normal => OutcomeRecord::message(self.task_id, now, message.body()),
            Classification::ErrorSignal { kind } => {
                OutcomeRecord::error(self.task_id, now, message.body(), kind.as_str())
            }
        };

        match self.append_with_retry(&record, Backoff::UntilDurable).await {
            Ok(_) if classification.is_error_signal() => self.stats.recorded_errors += 1,
            Ok(_) => self.stats.recorded_messages += 1,
            Err(err) => {
                // 永続的に拒否された record でキューの drain を止めない
                self.stats.rejected_records += 1;
                error!(
                    task_id = %self.task_id,
                    receipt_handle = %message.receipt_handle(),
                    error = %err,
                    error_kind = ?err.kind(),
                    "record rejected, deleting message anyway"
                );
            }
        }

        if let Classification::ErrorSignal { kind } = &classification {
            warn!(task_id = %self.task_id, %kind, "message carried error signal, continuing");
        }

        self.acknowledge(message.receipt_handle()).await;
    }

    /// Append, retrying `Unavailable`. Only `Rejected` is returned as an error.
    ///
    /// With `Backoff::UntilDurable` this never returns `Appended::Interrupted`.
    async fn append_with_retry(
        &mut self,
        record: &OutcomeRecord,
        backoff: Backoff,
    ) -> Result<Appended, StoreError> {
        let mut attempts = 0u32;
        loop {
            match self.store.append(record).await {
                Ok(()) => return Ok(Appended::Durable),
                Err(err @ StoreError::Rejected(_)) => return Err(err),
                Err(StoreError::Unavailable(reason)) => {
                    attempts += 1;
                    self.stats.transient_failures += 1;
                    let delay = self.retry_policy.next_delay(attempts);
                    warn!(
                        task_id = %self.task_id,
                        record_type = %record.record_type(),
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        %reason,
                        "append failed, backing off"
                    );
                    match backoff {
                        Backoff::UntilDurable => tokio::time::sleep(delay).await,
                        Backoff::UnlessShutdown => {
                            if !self.sleep_unless_shutdown(delay).await {
                                return Ok(Appended::Interrupted);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Delete, retrying `Unavailable`. Anything else ends the cycle.
    async fn acknowledge(&mut self, receipt_handle: &ReceiptHandle) {
        let mut attempts = 0u32;
        loop {
            match self.queue.delete(receipt_handle).await {
                Ok(()) => {
                    self.stats.acknowledged += 1;
                    return;
                }
                Err(QueueError::Unavailable(reason)) => {
                    attempts += 1;
                    self.stats.transient_failures += 1;
                    let delay = self.retry_policy.next_delay(attempts);
                    warn!(
                        task_id = %self.task_id,
                        %receipt_handle,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        %reason,
                        "delete failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(QueueError::NotFound(queue)) => {
                    // 次の receive で Fatal として扱われる
                    warn!(task_id = %self.task_id, %queue, %receipt_handle, "queue not found on delete");
                    return;
                }
            }
        }
    }

    /// Returns `false` when shutdown was requested before `delay` elapsed.
    async fn sleep_unless_shutdown(&mut self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.shutdown.requested() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{WorkerBuilder, shutdown};
    use crate::domain::RecordType;
    use crate::impls::testing::{Call, CallLog, ScriptedQueue, ScriptedStore};
    use crate::impls::{InMemoryQueueClient, InMemoryRecordStore};
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};
    use ulid::Ulid;

    fn task_id() -> TaskId {
        TaskId::from_ulid(Ulid::new())
    }

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap())
    }

    fn msg(body: &str, handle: &str) -> QueueMessage {
        QueueMessage::new(body, ReceiptHandle::new(handle))
    }

    fn worker(
        queue: Arc<dyn QueueClient>,
        store: Arc<dyn RecordStore>,
        signal: ShutdownSignal,
        id: TaskId,
    ) -> WorkerLoop {
        WorkerBuilder::new()
            .queue(queue)
            .store(store)
            .clock(clock())
            .task_id(id)
            .wait(Duration::from_secs(1))
            .retry_policy(RetryPolicy::new(
                Duration::from_millis(10),
                2.0,
                Duration::from_millis(100),
            ))
            .shutdown(signal)
            .build()
            .unwrap()
    }

    /// Everything after the initialization append.
    fn cycle_calls(log: &CallLog) -> Vec<Call> {
        log.calls()
            .into_iter()
            .skip_while(|c| !matches!(c, Call::Receive))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_a_normal_message_is_recorded_then_deleted() {
        let log = CallLog::default();
        let (handle, signal) = shutdown::channel();
        let queue = ScriptedQueue::new(log.clone(), handle)
            .then_receive(Ok(vec![msg("hello world", "rh-1")]));
        let store = ScriptedStore::new(log.clone());
        let id = task_id();

        let stats = worker(Arc::new(queue), Arc::new(store.clone()), signal, id)
            .run()
            .await
            .unwrap();

        assert_eq!(
            cycle_calls(&log),
            vec![
                Call::Receive,
                Call::Append {
                    record_type: RecordType::Message,
                    body: Some("hello world".into()),
                    ok: true,
                },
                Call::Delete("rh-1".into()),
            ]
        );

        let records = store.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].record_type(), RecordType::Message);
        assert_eq!(records[1].body(), Some("hello world"));
        assert_eq!(records[1].task_id(), id);
        assert_eq!(stats.received, 1);
        assert_eq!(stats.recorded_messages, 1);
        assert_eq!(stats.acknowledged, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_b_error_signal_is_recorded_and_loop_continues() {
        let log = CallLog::default();
        let (handle, signal) = shutdown::channel();
        let queue = ScriptedQueue::new(log.clone(), handle)
            .then_receive(Ok(vec![msg("job 9 ERROR:Timeout", "rh-1")]))
            .then_receive(Ok(vec![msg("next", "rh-2")]));
        let store = ScriptedStore::new(log.clone());

        let stats = worker(Arc::new(queue), Arc::new(store.clone()), signal, task_id())
            .run()
            .await
            .unwrap();

        let records = store.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].record_type(), RecordType::Error);
        assert_eq!(records[1].body(), Some("job 9 ERROR:Timeout"));
        assert_eq!(records[1].error_kind(), Some("Timeout"));
        assert_eq!(records[2].record_type(), RecordType::Message);

        assert_eq!(log.deletes(), vec!["rh-1".to_string(), "rh-2".to_string()]);
        assert_eq!(stats.recorded_errors, 1);
        assert_eq!(stats.recorded_messages, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_c_empty_polls_touch_nothing() {
        let log = CallLog::default();
        let (handle, signal) = shutdown::channel();
        let mut queue = ScriptedQueue::new(log.clone(), handle);
        for _ in 0..10 {
            queue = queue.then_receive(Ok(vec![]));
        }
        let store = ScriptedStore::new(log.clone());

        let stats = worker(Arc::new(queue), Arc::new(store.clone()), signal, task_id())
            .run()
            .await
            .unwrap();

        assert_eq!(cycle_calls(&log), vec![Call::Receive; 10]);
        // only the initialization record
        assert_eq!(store.records().len(), 1);
        assert_eq!(store.records()[0].record_type(), RecordType::Initialization);
        assert_eq!(stats.empty_polls, 10);
        assert_eq!(stats.transient_failures, 0);
        assert_eq!(stats.received, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_d_store_unavailable_twice_then_one_record_and_one_delete() {
        let log = CallLog::default();
        let (handle, signal) = shutdown::channel();
        let queue = ScriptedQueue::new(log.clone(), handle)
            .then_receive(Ok(vec![msg("payload", "rh-1")]));
        let store = ScriptedStore::new(log.clone()).failing(
            RecordType::Message,
            vec![
                StoreError::Unavailable("throttled".into()),
                StoreError::Unavailable("throttled".into()),
            ],
        );

        let stats = worker(Arc::new(queue), Arc::new(store.clone()), signal, task_id())
            .run()
            .await
            .unwrap();

        let append = |ok| Call::Append {
            record_type: RecordType::Message,
            body: Some("payload".into()),
            ok,
        };
        assert_eq!(
            cycle_calls(&log),
            vec![
                Call::Receive,
                append(false),
                append(false),
                append(true),
                Call::Delete("rh-1".into()),
            ]
        );
        let messages: Vec<_> = store
            .records()
            .into_iter()
            .filter(|r| r.record_type() == RecordType::Message)
            .collect();
        assert_eq!(messages.len(), 1);
        assert_eq!(stats.transient_failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_e_queue_not_found_is_fatal() {
        let log = CallLog::default();
        let (handle, signal) = shutdown::channel();
        let queue = ScriptedQueue::new(log.clone(), handle)
            .then_receive(Err(QueueError::NotFound("orders".into())))
            .then_receive(Ok(vec![msg("never seen", "rh-1")]));
        let store = ScriptedStore::new(log.clone());

        let err = worker(Arc::new(queue), Arc::new(store), signal, task_id())
            .run()
            .await
            .unwrap_err();

        assert_eq!(err, WorkerError::QueueGone("orders".into()));
        assert_eq!(cycle_calls(&log), vec![Call::Receive]);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_never_precedes_a_durable_append() {
        let log = CallLog::default();
        let (handle, signal) = shutdown::channel();
        let queue = ScriptedQueue::new(log.clone(), handle)
            .then_receive(Ok(vec![msg("a", "rh-a")]))
            .then_receive(Ok(vec![]))
            .then_receive(Ok(vec![msg("ERROR:KeyError", "rh-b")]))
            .then_receive(Ok(vec![msg("c", "rh-c")]));
        let store = ScriptedStore::new(log.clone()).failing(
            RecordType::Error,
            vec![StoreError::Unavailable("down".into()); 3],
        );

        worker(Arc::new(queue), Arc::new(store), signal, task_id())
            .run()
            .await
            .unwrap();

        let calls = log.calls();
        for (idx, call) in calls.iter().enumerate() {
            if let Call::Delete(_) = call {
                // the call right before every delete is a successful append
                assert!(
                    matches!(calls[idx - 1], Call::Append { ok: true, .. }),
                    "delete at {idx} not preceded by durable append: {calls:?}"
                );
            }
        }
        assert_eq!(log.deletes().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_record_still_deletes_message() {
        let log = CallLog::default();
        let (handle, signal) = shutdown::channel();
        let queue = ScriptedQueue::new(log.clone(), handle)
            .then_receive(Ok(vec![msg("bad", "rh-1")]));
        let store = ScriptedStore::new(log.clone())
            .failing(RecordType::Message, vec![StoreError::Rejected("bad key".into())]);

        let stats = worker(Arc::new(queue), Arc::new(store), signal, task_id())
            .run()
            .await
            .unwrap();

        assert_eq!(
            cycle_calls(&log),
            vec![
                Call::Receive,
                Call::Append {
                    record_type: RecordType::Message,
                    body: Some("bad".into()),
                    ok: false,
                },
                Call::Delete("rh-1".into()),
            ]
        );
        assert_eq!(stats.rejected_records, 1);
        assert_eq!(stats.acknowledged, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn queue_unavailable_is_retried_with_backoff() {
        let log = CallLog::default();
        let (handle, signal) = shutdown::channel();
        let queue = ScriptedQueue::new(log.clone(), handle)
            .then_receive(Err(QueueError::Unavailable("503".into())))
            .then_receive(Err(QueueError::Unavailable("503".into())))
            .then_receive(Ok(vec![msg("after outage", "rh-1")]));
        let store = ScriptedStore::new(log.clone());

        let stats = worker(Arc::new(queue), Arc::new(store.clone()), signal, task_id())
            .run()
            .await
            .unwrap();

        assert_eq!(stats.transient_failures, 2);
        assert_eq!(stats.received, 1);
        assert_eq!(log.deletes(), vec!["rh-1".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_unavailable_is_retried_and_not_found_ends_cycle() {
        let log = CallLog::default();
        let (handle, signal) = shutdown::channel();
        let queue = ScriptedQueue::new(log.clone(), handle)
            .then_receive(Ok(vec![msg("one", "rh-1")]))
            .then_receive(Ok(vec![msg("two", "rh-2")]))
            .then_delete(Err(QueueError::Unavailable("503".into())))
            .then_delete(Ok(()))
            .then_delete(Err(QueueError::NotFound("orders".into())));
        let store = ScriptedStore::new(log.clone());

        let stats = worker(Arc::new(queue), Arc::new(store), signal, task_id())
            .run()
            .await
            .unwrap();

        assert_eq!(
            log.deletes(),
            vec!["rh-1".to_string(), "rh-1".to_string(), "rh-2".to_string()]
        );
        assert_eq!(stats.acknowledged, 1);
        assert_eq!(stats.received, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn initialization_record_is_written_before_first_receive() {
        let log = CallLog::default();
        let (handle, signal) = shutdown::channel();
        let queue = ScriptedQueue::new(log.clone(), handle);
        let store = ScriptedStore::new(log.clone());
        let id = task_id();

        worker(Arc::new(queue), Arc::new(store.clone()), signal, id)
            .run()
            .await
            .unwrap();

        assert_eq!(
            log.calls().first(),
            Some(&Call::Append {
                record_type: RecordType::Initialization,
                body: None,
                ok: true,
            })
        );
        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].task_id(), id);
        assert_eq!(records[0].timestamp().as_str(), "2024-01-01T12:00:00Z");
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_long_poll_returns_promptly() {
        let queue = Arc::new(InMemoryQueueClient::new(Duration::from_secs(30)));
        let store = Arc::new(InMemoryRecordStore::new());
        let (handle, signal) = shutdown::channel();
        let worker = WorkerBuilder::new()
            .queue(queue.clone())
            .store(store.clone())
            .wait(Duration::from_secs(20))
            .shutdown(signal)
            .build()
            .unwrap();

        let running = tokio::spawn(worker.run());
        tokio::time::sleep(Duration::from_secs(5)).await;
        let requested_at = tokio::time::Instant::now();
        handle.request_shutdown();

        let stats = running.await.unwrap().unwrap();
        assert!(requested_at.elapsed() < Duration::from_secs(1));
        assert_eq!(stats.received, 0);
        assert_eq!(store.records().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drains_in_memory_queue_end_to_end() {
        let queue = Arc::new(InMemoryQueueClient::new(Duration::from_secs(30)));
        let store = Arc::new(InMemoryRecordStore::new());
        queue.send("hello world").await.unwrap();
        queue.send("ERROR:Timeout").await.unwrap();
        queue.send("ValueError").await.unwrap();

        let (handle, signal) = shutdown::channel();
        let worker = WorkerBuilder::new()
            .queue(queue.clone())
            .store(store.clone())
            .clock(clock())
            .wait(Duration::from_secs(1))
            .shutdown(signal)
            .build()
            .unwrap();
        let id = worker.task_id();

        let running = tokio::spawn(worker.run());
        while queue.visible_len().await + queue.in_flight_len().await > 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        handle.request_shutdown();
        let stats = running.await.unwrap().unwrap();

        let records = store.records_for_task(id).await;
        let types: Vec<_> = records.iter().map(|r| r.record_type()).collect();
        assert_eq!(
            types,
            vec![
                RecordType::Initialization,
                RecordType::Message,
                RecordType::Error,
                RecordType::Error,
            ]
        );
        assert_eq!(records[3].error_kind(), Some("ValueError"));
        assert_eq!(stats.acknowledged, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn deleted_queue_stops_the_worker() {
        let queue = Arc::new(InMemoryQueueClient::new(Duration::from_secs(30)));
        let store = Arc::new(InMemoryRecordStore::new());
        queue.delete_queue().await;

        let worker = WorkerBuilder::new()
            .queue(queue)
            .store(store)
            .wait(Duration::from_secs(1))
            .build()
            .unwrap();

        let err = worker.run().await.unwrap_err();
        assert!(matches!(err, WorkerError::QueueGone(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_initialization_backoff() {
        let log = CallLog::default();
        let (handle, signal) = shutdown::channel();
        let queue = ScriptedQueue::new(log.clone(), handle.clone())
            .then_receive(Ok(vec![msg("never seen", "rh-1")]));
        let store = ScriptedStore::new(log.clone()).failing(
            RecordType::Initialization,
            vec![StoreError::Unavailable("down".into()); 100_000],
        );
        handle.request_shutdown();

        let run = worker(Arc::new(queue), Arc::new(store.clone()), signal, task_id()).run();
        let stats = tokio::time::timeout(Duration::from_secs(60), run)
            .await
            .expect("worker kept retrying after shutdown")
            .unwrap();

        assert!(cycle_calls(&log).is_empty());
        assert!(store.records().is_empty());
        assert_eq!(stats.transient_failures, 1);
        assert_eq!(stats.received, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_recording_and_delete_backoff_finishes_the_cycle() {
        let log = CallLog::default();
        let (handle, signal) = shutdown::channel();
        let queue = ScriptedQueue::new(log.clone(), handle.clone())
            .then_receive(Ok(vec![msg("payload", "rh-1")]))
            .then_receive(Ok(vec![msg("left for later", "rh-2")]))
            .then_delete(Err(QueueError::Unavailable("503".into())))
            .then_delete(Err(QueueError::Unavailable("503".into())));
        // the first failed append raises shutdown mid-cycle
        let store = ScriptedStore::new(log.clone())
            .failing(
                RecordType::Message,
                vec![StoreError::Unavailable("throttled".into()); 3],
            )
            .shutdown_on_failure(handle);

        let stats = worker(Arc::new(queue), Arc::new(store.clone()), signal, task_id())
            .run()
            .await
            .unwrap();

        let append = |ok| Call::Append {
            record_type: RecordType::Message,
            body: Some("payload".into()),
            ok,
        };
        assert_eq!(
            cycle_calls(&log),
            vec![
                Call::Receive,
                append(false),
                append(false),
                append(false),
                append(true),
                Call::Delete("rh-1".into()),
                Call::Delete("rh-1".into()),
                Call::Delete("rh-1".into()),
            ]
        );
        assert_eq!(stats.received, 1);
        assert_eq!(stats.recorded_messages, 1);
        assert_eq!(stats.acknowledged, 1);
    }
}
