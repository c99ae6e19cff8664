//! Scripted fakes for worker loop tests.
//!
//! Both fakes write into one shared `CallLog` so tests can assert on the
//! relative order of queue and store calls.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::app::ShutdownHandle;
use crate::domain::{OutcomeRecord, QueueError, QueueMessage, ReceiptHandle, RecordType, StoreError};
use crate::ports::{QueueClient, RecordStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Receive,
    Append {
        record_type: RecordType,
        body: Option<String>,
        ok: bool,
    },
    Delete(String),
}

#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(handle) => Some(handle),
                _ => None,
            })
            .collect()
    }
}

/// Plays back scripted receive/delete results.
///
/// Once the receive script runs out it requests shutdown and parks, so the
/// loop ends through its normal shutdown path. Deletes default to `Ok(())`.
pub struct ScriptedQueue {
    log: CallLog,
    on_exhausted: ShutdownHandle,
    receives: Mutex<VecDeque<Result<Vec<QueueMessage>, QueueError>>>,
    deletes: Mutex<VecDeque<Result<(), QueueError>>>,
}

impl ScriptedQueue {
    pub fn new(log: CallLog, on_exhausted: ShutdownHandle) -> Self {
        Self {
            log,
            on_exhausted,
            receives: Mutex::new(VecDeque::new()),
            deletes: Mutex::new(VecDeque::new()),
        }
    }

    pub fn then_receive(self, result: Result<Vec<QueueMessage>, QueueError>) -> Self {
        self.receives.lock().unwrap().push_back(result);
        self
    }

    pub fn then_delete(self, result: Result<(), QueueError>) -> Self {
        self.deletes.lock().unwrap().push_back(result);
        self
    }
}

#[async_trait]
impl QueueClient for ScriptedQueue {
    async fn receive(
        &self,
        _max_messages: u32,
        _wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let next = self.receives.lock().unwrap().pop_front();
        match next {
            Some(result) => {
                self.log.push(Call::Receive);
                result
            }
            None => {
                self.on_exhausted.request_shutdown();
                std::future::pending().await
            }
        }
    }

    async fn delete(&self, receipt_handle: &ReceiptHandle) -> Result<(), QueueError> {
        self.log.push(Call::Delete(receipt_handle.as_str().to_string()));
        let next = self.deletes.lock().unwrap().pop_front();
        next.unwrap_or(Ok(()))
    }
}

/// Records appends; fails appends of one record type from a script.
#[derive(Clone)]
pub struct ScriptedStore {
    log: CallLog,
    records: Arc<Mutex<Vec<OutcomeRecord>>>,
    failing_type: Option<RecordType>,
    failures: Arc<Mutex<VecDeque<StoreError>>>,
    on_failure: Option<ShutdownHandle>,
}

impl ScriptedStore {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            records: Arc::default(),
            failing_type: None,
            failures: Arc::default(),
            on_failure: None,
        }
    }

    pub fn failing(mut self, record_type: RecordType, failures: Vec<StoreError>) -> Self {
        self.failing_type = Some(record_type);
        self.failures = Arc::new(Mutex::new(failures.into()));
        self
    }

    /// Request shutdown every time a scripted failure is returned.
    pub fn shutdown_on_failure(mut self, handle: ShutdownHandle) -> Self {
        self.on_failure = Some(handle);
        self
    }

    /// Successfully appended records.
    pub fn records(&self) -> Vec<OutcomeRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordStore for ScriptedStore {
    async fn append(&self, record: &OutcomeRecord) -> Result<(), StoreError> {
        let failure = if self.failing_type == Some(record.record_type()) {
            self.failures.lock().unwrap().pop_front()
        } else {
            None
        };

        self.log.push(Call::Append {
            record_type: record.record_type(),
            body: record.body().map(str::to_string),
            ok: failure.is_none(),
        });

        match failure {
            Some(err) => {
                if let Some(handle) = &self.on_failure {
                    handle.request_shutdown();
                }
                Err(err)
            }
            None => {
                self.records.lock().unwrap().push(record.clone());
                Ok(())
            }
        }
    }
}
