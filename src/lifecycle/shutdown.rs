//! Shutdown coordination.
//!
//! One `Shutdown` is created per process. Every long-running task takes a
//! `ShutdownListener` from it: the node and proxy servers drain on it, the
//! replicator and the cache sweeper leave their loops on it.

use std::sync::Arc;
use tokio::sync::watch;

/// Process-wide stop flag.
///
/// The flag is latched: a listener taken after `trigger` sees it set
/// immediately.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Listener for one long-running task.
    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    /// Set the flag. Triggering twice is harmless.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Number of tasks still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// A task's view of the stop flag.
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Resolve once the flag is set or every `Shutdown` handle is gone.
    /// Cancel safe, so it can sit in a `select!` arm across loop turns.
    pub async fn recv(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Consume the listener and wait, for `with_graceful_shutdown`.
    pub async fn wait(mut self) {
        self.recv().await
    }
}
