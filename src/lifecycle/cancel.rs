//! Cancellation for long-running operations.

use std::sync::Arc;
use tokio::sync::watch;

/// Owner side of a cancellable operation.
///
/// Clones share state: cancelling one cancels every context handed out by any
/// clone.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Hand out an observer for this token.
    pub fn context(&self) -> Context {
        Context {
            rx: self.tx.subscribe(),
        }
    }

    /// Cancel every context created from this token. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side; passed into operations that must stop on cancellation.
#[derive(Debug, Clone)]
pub struct Context {
    rx: watch::Receiver<bool>,
}

impl Context {
    /// A context that is never cancelled.
    pub fn background() -> Self {
        let (_, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the context is cancelled. Pends forever for contexts
    /// whose token was dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
