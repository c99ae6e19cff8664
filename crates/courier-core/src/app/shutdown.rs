//! Shutdown signal shared between the process entry point and the worker loop.
//!
//! - `ShutdownHandle::request_shutdown()` でループに停止を要求する
//! - ループは cycle の境界（Polling に入る前、long-poll 中、Polling の backoff 中）と
//!   起動時の initialization record の backoff 中にだけ止まる
//! - ハンドルを全て drop した場合も停止要求とみなす

use std::sync::Arc;

use tokio::sync::watch;

/// Sender side. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn request_shutdown(&self) {
        // receivers may already be dropped
        let _ = self.tx.send(true);
    }
}

/// Receiver side, owned by the worker loop.
#[derive(Debug)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
    // keeps `never()` signals from observing a closed channel
    _keepalive: Option<watch::Sender<bool>>,
}

impl ShutdownSignal {
    /// A signal that is never raised.
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            rx,
            _keepalive: Some(tx),
        }
    }

    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is requested or every handle is dropped.
    pub async fn requested(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

/// Create a connected handle/signal pair.
pub fn channel() -> (ShutdownHandle, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (
        ShutdownHandle { tx: Arc::new(tx) },
        ShutdownSignal {
            rx,
            _keepalive: None,
        },
    )
}
