//! InMemoryQueueClient - 開発・テスト用のキュー
//!
//! # 再現している性質
//! - receive は最大 `wait` だけ待つ long-poll（send で起こされる）
//! - 受信したメッセージは visibility timeout の間 in-flight になり、他の receive には見えない
//! - delete されないまま期限が切れると再配送される（receipt handle は配送ごとに新しくなる）
//! - delete は冪等
//! - `delete_queue()` 後はすべての操作が `QueueError::NotFound`

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use ulid::Ulid;

use crate::domain::{QueueError, QueueMessage, ReceiptHandle};
use crate::ports::QueueClient;

#[derive(Debug, Clone)]
struct StoredMessage {
    message_id: String,
    body: String,
}

#[derive(Debug)]
struct InFlight {
    message: StoredMessage,
    visible_at: Instant,
}

#[derive(Debug, Default)]
struct QueueState {
    visible: VecDeque<StoredMessage>,
    /// receipt handle -> delivery
    in_flight: HashMap<String, InFlight>,
    deleted: bool,
}

impl QueueState {
    /// Move expired deliveries back to the front of the visible queue.
    fn release_expired(&mut self, now: Instant) {
        let mut expired: Vec<(String, Instant)> = self
            .in_flight
            .iter()
            .filter(|(_, f)| f.visible_at <= now)
            .map(|(handle, f)| (handle.clone(), f.visible_at))
            .collect();
        // oldest expiry ends up at the front
        expired.sort_by_key(|(_, at)| std::cmp::Reverse(*at));
        for (handle, _) in expired {
            if let Some(flight) = self.in_flight.remove(&handle) {
                self.visible.push_front(flight.message);
            }
        }
    }

    fn next_expiry(&self) -> Option<Instant> {
        self.in_flight.values().map(|f| f.visible_at).min()
    }
}

/// In-memory queue with receipt handles and a visibility timeout.
pub struct InMemoryQueueClient {
    name: String,
    visibility_timeout: Duration,
    state: Mutex<QueueState>,
    notify: Notify,
}

impl InMemoryQueueClient {
    pub fn new(visibility_timeout: Duration) -> Self {
        Self::named("in-memory", visibility_timeout)
    }

    pub fn named(name: impl Into<String>, visibility_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            visibility_timeout,
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
        }
    }

    /// Enqueue a message. Returns its message id.
    pub async fn send(&self, body: impl Into<String>) -> Result<String, QueueError> {
        let message_id = {
            let mut state = self.state.lock().await;
            if state.deleted {
                return Err(QueueError::NotFound(self.name.clone()));
            }
            let message_id = Ulid::new().to_string();
            state.visible.push_back(StoredMessage {
                message_id: message_id.clone(),
                body: body.into(),
            });
            message_id
        };
        // ロック解放後に通知
        self.notify.notify_one();
        Ok(message_id)
    }

    /// Simulate the queue being deleted out from under its consumers.
    pub async fn delete_queue(&self) {
        self.state.lock().await.deleted = true;
        self.notify.notify_waiters();
    }

    /// Messages waiting to be received.
    pub async fn visible_len(&self) -> usize {
        self.state.lock().await.visible.len()
    }

    /// Messages received but neither deleted nor expired.
    pub async fn in_flight_len(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }
}

#[async_trait]
impl QueueClient for InMemoryQueueClient {
    async fn receive(
        &self,
        max_messages: u32,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let deadline = Instant::now() + wait;
        loop {
            let next_expiry = {
                let mut state = self.state.lock().await;
                if state.deleted {
                    return Err(QueueError::NotFound(self.name.clone()));
                }
                let now = Instant::now();
                state.release_expired(now);

                let mut received = Vec::new();
                while received.len() < max_messages as usize {
                    let Some(message) = state.visible.pop_front() else {
                        break;
                    };
                    let handle = Ulid::new().to_string();
                    received.push(
                        QueueMessage::new(message.body.clone(), ReceiptHandle::new(handle.clone()))
                            .with_message_id(message.message_id.clone()),
                    );
                    state.in_flight.insert(
                        handle,
                        InFlight {
                            message,
                            visible_at: now + self.visibility_timeout,
                        },
                    );
                }
                if !received.is_empty() {
                    return Ok(received);
                }
                state.next_expiry()
            };

            if Instant::now() >= deadline {
                return Ok(Vec::new());
            }

            // send の通知、再配送の期限、wait の期限のうち最も早いもので起きる
            let wake_at = next_expiry.map_or(deadline, |at| at.min(deadline));
            tokio::select! {
                _ = self.notify.notified() => {},
                _ = tokio::time::sleep_until(wake_at) => {},
            }
        }
    }

    async fn delete(&self, receipt_handle: &ReceiptHandle) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        if state.deleted {
            return Err(QueueError::NotFound(self.name.clone()));
        }
        // unknown / stale / already deleted: nothing to do
        state.in_flight.remove(receipt_handle.as_str());
        Ok(())
    }
}
