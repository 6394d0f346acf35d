//! The opaque asynchronous operation a request waits on.
//!
//! A transport (or the bundle cache) creates a pair with [`channel`]: it keeps
//! the [`OperationHandle`] and publishes progress and the final outcome through
//! it, while the request holds the [`Operation`] and suspends on
//! [`Operation::changed`] until something new is published.
//!
//! Dropping the `Operation` releases it: the producer observes
//! [`OperationHandle::is_abandoned`] and should stop work. Dropping the handle
//! without finishing marks the operation failed so a waiting request never hangs
//! on a producer that went away.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

/// Error text published when a producer drops its handle without finishing.
const DROPPED_BY_PRODUCER: &str = "operation dropped before completion";

/// Observable state of an operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationStatus {
    /// True once the operation has finished (successfully or not).
    pub done: bool,
    /// Download (or overall) fraction in [0.0, 1.0] as reported by the producer.
    pub progress: f32,
    /// Upload fraction in [0.0, 1.0]; stays 0.0 for operations without a body.
    pub upload_progress: f32,
    /// Failure reason. `None` or an empty string means success.
    pub error: Option<String>,
}

type PayloadSlot<T> = Arc<Mutex<Option<T>>>;

/// Consumer side of an asynchronous operation.
pub struct Operation<T> {
    status: watch::Receiver<OperationStatus>,
    payload: PayloadSlot<T>,
}

/// Producer side of an asynchronous operation.
pub struct OperationHandle<T> {
    status: watch::Sender<OperationStatus>,
    payload: PayloadSlot<T>,
}

/// Create a connected handle/operation pair in the not-done state.
pub fn channel<T>() -> (OperationHandle<T>, Operation<T>) {
    let (tx, rx) = watch::channel(OperationStatus::default());
    let payload = Arc::new(Mutex::new(None));
    (
        OperationHandle {
            status: tx,
            payload: Arc::clone(&payload),
        },
        Operation {
            status: rx,
            payload,
        },
    )
}

impl<T> Operation<T> {
    /// An operation that has already completed with `payload` and full progress.
    pub fn completed(payload: T) -> Self {
        let (handle, op) = channel();
        handle.set_progress(1.0);
        handle.finish(payload);
        op
    }

    /// An operation that has already failed with `error`.
    pub fn failed(error: impl Into<String>) -> Self {
        let (handle, op) = channel();
        handle.fail(error);
        op
    }

    pub fn is_done(&self) -> bool {
        self.status.borrow().done
    }

    pub fn progress(&self) -> f32 {
        self.status.borrow().progress
    }

    pub fn upload_progress(&self) -> f32 {
        self.status.borrow().upload_progress
    }

    /// Failure reason, if any. An empty error string counts as success.
    pub fn error(&self) -> Option<String> {
        self.status
            .borrow()
            .error
            .as_ref()
            .filter(|e| !e.is_empty())
            .cloned()
    }

    /// Snapshot of the full status.
    pub fn status(&self) -> OperationStatus {
        self.status.borrow().clone()
    }

    /// Take the final payload. Returns `None` before completion, after a
    /// failure, or if it was already taken.
    pub fn take_payload(&mut self) -> Option<T> {
        self.payload
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Suspend until the producer publishes a new state.
    ///
    /// Returns immediately once the operation is done, so loops of the form
    /// `while !op.is_done() { ...; op.changed().await }` always terminate.
    pub async fn changed(&mut self) {
        if self.is_done() {
            return;
        }
        // The producer always publishes `done` before its sender goes away,
        // so an Err here only happens after completion.
        let _ = self.status.changed().await;
    }
}

impl<T> std::fmt::Debug for Operation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}

impl<T> OperationHandle<T> {
    /// Publish a new download fraction. Waiters are only woken if it changed.
    pub fn set_progress(&self, progress: f32) {
        self.status.send_if_modified(|s| {
            if s.done || s.progress == progress {
                return false;
            }
            s.progress = progress;
            true
        });
    }

    /// Publish a new upload fraction. Waiters are only woken if it changed.
    pub fn set_upload_progress(&self, progress: f32) {
        self.status.send_if_modified(|s| {
            if s.done || s.upload_progress == progress {
                return false;
            }
            s.upload_progress = progress;
            true
        });
    }

    /// Complete successfully with `payload`.
    pub fn finish(self, payload: T) {
        *self.payload.lock().unwrap_or_else(PoisonError::into_inner) = Some(payload);
        self.status.send_modify(|s| {
            s.done = true;
            s.error = None;
        });
    }

    /// Complete with a failure reason.
    pub fn fail(self, error: impl Into<String>) {
        let error = error.into();
        self.status.send_modify(|s| {
            s.done = true;
            s.error = Some(error);
        });
    }

    /// Complete from a `Result`, rendering the error with `Display`.
    pub fn complete<E: std::fmt::Display>(self, result: Result<T, E>) {
        match result {
            Ok(payload) => self.finish(payload),
            Err(e) => self.fail(e.to_string()),
        }
    }

    /// True once the consumer has dropped its [`Operation`].
    pub fn is_abandoned(&self) -> bool {
        self.status.is_closed()
    }

    /// Resolves when the consumer drops its [`Operation`].
    pub async fn abandoned(&self) {
        self.status.closed().await
    }
}

impl<T> Drop for OperationHandle<T> {
    fn drop(&mut self) {
        self.status.send_if_modified(|s| {
            if s.done {
                return false;
            }
            s.done = true;
            s.error = Some(DROPPED_BY_PRODUCER.to_string());
            true
        });
    }
}

impl<T> std::fmt::Debug for OperationHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationHandle")
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}
