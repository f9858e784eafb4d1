//! Background transfer tracking.
//!
//! Uploads and downloads spawned by command handlers run as independent
//! tasks keyed by `(invoking message id, task id)`. A handler may await
//! the task; cancellation (user-issued, handler-side, or shutdown)
//! always surfaces as [`TransferOutcome::Aborted`] rather than a
//! cancellation fault crossing the command boundary.

use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Composite key of an active transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransferKey {
    /// Message that spawned the transfer.
    pub message_id: i64,
    /// Per-process monotonic task id.
    pub task_id: u64,
}

/// Result of awaiting a transfer.
#[derive(Debug, PartialEq, Eq)]
pub enum TransferOutcome<T> {
    Done(T),
    Aborted,
}

impl<T> TransferOutcome<T> {
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    pub fn into_done(self) -> Option<T> {
        match self {
            Self::Done(value) => Some(value),
            Self::Aborted => None,
        }
    }
}

struct ActiveTransfer {
    label: String,
    token: CancellationToken,
}

/// Handle to one spawned transfer.
///
/// Dropping the handle without awaiting it cancels the underlying task:
/// a cancelled await never leaves an orphan transfer running.
pub struct TransferTask<T> {
    key: TransferKey,
    token: CancellationToken,
    handle: Option<JoinHandle<TransferOutcome<T>>>,
}

impl<T> TransferTask<T> {
    pub fn key(&self) -> TransferKey {
        self.key
    }

    /// Request cancellation. The task (and anyone awaiting it) observes
    /// [`TransferOutcome::Aborted`].
    pub fn abort(&self) {
        self.token.cancel();
    }

    /// Await completion or cancellation.
    pub async fn join(mut self) -> TransferOutcome<T> {
        let Some(handle) = self.handle.take() else {
            return TransferOutcome::Aborted;
        };
        match handle.await {
            Ok(outcome) => outcome,
            Err(err) => {
                if err.is_panic() {
                    error!(key = ?self.key, "transfer task panicked");
                }
                TransferOutcome::Aborted
            }
        }
    }
}

impl<T> Drop for TransferTask<T> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            // Await was abandoned before completion; propagate the
            // cancellation to the underlying task.
            self.token.cancel();
        }
    }
}

/// Process-wide set of in-flight transfers.
#[derive(Clone, Default)]
pub struct TransferSet {
    active: Arc<DashMap<TransferKey, ActiveTransfer>>,
    next_id: Arc<AtomicU64>,
}

impl TransferSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `work` as a tracked transfer for `message_id`.
    ///
    /// The entry is removed from the active set when the task completes
    /// or is cancelled, whichever comes first.
    pub fn spawn<T, F>(&self, message_id: i64, label: impl Into<String>, work: F) -> TransferTask<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let key = TransferKey {
            message_id,
            task_id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        let token = CancellationToken::new();
        let label = label.into();
        debug!(key = ?key, label = %label, "transfer spawned");
        self.active.insert(
            key,
            ActiveTransfer {
                label,
                token: token.clone(),
            },
        );

        let active = self.active.clone();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = task_token.cancelled() => TransferOutcome::Aborted,
                value = work => TransferOutcome::Done(value),
            };
            active.remove(&key);
            outcome
        });

        TransferTask {
            key,
            token,
            handle: Some(handle),
        }
    }

    /// Cancel one transfer by key. Returns whether it was active.
    pub fn cancel(&self, key: TransferKey) -> bool {
        match self.active.get(&key) {
            Some(entry) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every transfer spawned by `message_id`. Returns the number
    /// cancelled.
    pub fn cancel_for_message(&self, message_id: i64) -> usize {
        let mut cancelled = 0;
        for entry in self.active.iter() {
            if entry.key().message_id == message_id {
                entry.value().token.cancel();
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Cancel everything (shutdown drain). Returns the number cancelled.
    pub fn cancel_all(&self) -> usize {
        let mut cancelled = 0;
        for entry in self.active.iter() {
            entry.value().token.cancel();
            cancelled += 1;
        }
        cancelled
    }

    /// Labels of currently active transfers, for status commands.
    pub fn active_labels(&self) -> Vec<(TransferKey, String)> {
        self.active
            .iter()
            .map(|entry| (*entry.key(), entry.value().label.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Wait until the active set drains, up to `timeout`. Returns whether
    /// it drained.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while !self.is_empty() {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        true
    }
}
