//! FIFO admission bookkeeping: queue, concurrency limit and running set.
//!
//! Pure state with no locking or spawning of its own; the engine keeps it
//! behind one mutex so every step (enqueue, promote, finish, cancel) is atomic
//! with respect to the others.

use std::collections::{HashMap, VecDeque};

use tokio::task::AbortHandle;

pub(super) type TaskId = u64;

#[derive(Debug)]
pub(super) struct Admission<T> {
    queue: VecDeque<T>,
    max_concurrent: usize,
    /// Running tasks. The abort handle is attached right after spawning.
    running: HashMap<TaskId, Option<AbortHandle>>,
    next_id: TaskId,
    started: u64,
    finished: u64,
    cancelled: u64,
}

impl<T> Admission<T> {
    pub(super) fn new(max_concurrent: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            max_concurrent,
            running: HashMap::new(),
            next_id: 0,
            started: 0,
            finished: 0,
            cancelled: 0,
        }
    }

    pub(super) fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Change the limit. Running tasks are untouched; callers promote
    /// afterwards to use any new slack.
    pub(super) fn set_max_concurrent(&mut self, max_concurrent: usize) {
        self.max_concurrent = max_concurrent;
    }

    pub(super) fn queued(&self) -> usize {
        self.queue.len()
    }

    pub(super) fn in_flight(&self) -> usize {
        self.running.len()
    }

    /// Free slots (0 while the running set is at or above the limit).
    pub(super) fn available(&self) -> usize {
        self.max_concurrent.saturating_sub(self.running.len())
    }

    pub(super) fn enqueue(&mut self, item: T) {
        self.queue.push_back(item);
    }

    /// If a slot is free and the queue is non-empty, move the head into the
    /// running set and return it with its id.
    pub(super) fn promote(&mut self) -> Option<(TaskId, T)> {
        if self.available() == 0 {
            return None;
        }
        let item = self.queue.pop_front()?;
        let id = self.next_id;
        self.next_id += 1;
        self.running.insert(id, None);
        self.started += 1;
        Some((id, item))
    }

    /// Attach the abort handle of a task returned by `promote`.
    pub(super) fn attach(&mut self, id: TaskId, handle: AbortHandle) {
        if let Some(slot) = self.running.get_mut(&id) {
            *slot = Some(handle);
        }
    }

    /// Free the slot of `id`. Returns false if it was not running (already
    /// finished, or dropped by `cancel_all`).
    pub(super) fn finish(&mut self, id: TaskId) -> bool {
        if self.running.remove(&id).is_none() {
            return false;
        }
        self.finished += 1;
        true
    }

    /// Nothing running and nothing queued.
    pub(super) fn is_drained(&self) -> bool {
        self.running.is_empty() && self.queue.is_empty()
    }

    /// Drop every queued item and forget every running task. Returns the
    /// dropped items and the abort handles of the running tasks so the caller
    /// can release them outside its lock.
    pub(super) fn cancel_all(&mut self) -> (Vec<T>, Vec<AbortHandle>) {
        let queued: Vec<T> = self.queue.drain(..).collect();
        let aborts: Vec<AbortHandle> = self.running.drain().filter_map(|(_, h)| h).collect();
        self.cancelled += (queued.len() + aborts.len()) as u64;
        (queued, aborts)
    }

    pub(super) fn started(&self) -> u64 {
        self.started
    }

    pub(super) fn finished(&self) -> u64 {
        self.finished
    }

    pub(super) fn cancelled(&self) -> u64 {
        self.cancelled
    }
}
