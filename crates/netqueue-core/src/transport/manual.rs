//! Transport whose operations are completed by the caller.
//!
//! Every `get`/`post` is recorded as a [`PendingOperation`] holding the
//! producer handle. Hosts that already have their own I/O loop (and tests) take
//! pending operations and drive them with progress updates and outcomes.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use tokio::sync::Notify;

use crate::operation::{self, Operation, OperationHandle};

use super::{Form, Response, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// An operation started through a [`ManualTransport`] and not yet taken.
#[derive(Debug)]
pub struct PendingOperation {
    pub method: Method,
    pub url: String,
    pub form: Option<Form>,
    pub handle: OperationHandle<Response>,
}

impl PendingOperation {
    /// Complete with a 200 response carrying `body`.
    pub fn respond(self, body: impl Into<Vec<u8>>) {
        let response = Response {
            url: self.url,
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        };
        self.handle.set_progress(1.0);
        self.handle.finish(response);
    }

    /// Fail with `error`, passed through verbatim.
    pub fn fail(self, error: impl Into<String>) {
        self.handle.fail(error);
    }
}

#[derive(Debug, Default)]
pub struct ManualTransport {
    pending: Mutex<VecDeque<PendingOperation>>,
    arrived: Notify,
}

impl ManualTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oldest operation not yet taken.
    pub fn take(&self) -> Option<PendingOperation> {
        self.lock().pop_front()
    }

    /// All operations not yet taken, oldest first.
    pub fn take_all(&self) -> Vec<PendingOperation> {
        self.lock().drain(..).collect()
    }

    /// Number of operations started but not yet taken.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Wait for the next operation to be started, then take it.
    pub async fn next(&self) -> PendingOperation {
        loop {
            let arrived = self.arrived.notified();
            if let Some(op) = self.take() {
                return op;
            }
            arrived.await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<PendingOperation>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, method: Method, url: &str, form: Option<Form>) -> Operation<Response> {
        let (handle, op) = operation::channel();
        self.lock().push_back(PendingOperation {
            method,
            url: url.to_string(),
            form,
            handle,
        });
        self.arrived.notify_waiters();
        op
    }
}

impl Transport for ManualTransport {
    fn get(&self, url: &str) -> Operation<Response> {
        self.record(Method::Get, url, None)
    }

    fn post(&self, url: &str, form: &Form) -> Operation<Response> {
        self.record(Method::Post, url, Some(form.clone()))
    }
}
