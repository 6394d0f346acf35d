//! RAII guard that frees a running request's slot when dropped.

use super::admission::TaskId;
use super::Engine;

/// Frees the slot of `id` when dropped: after a normal return, a panic in a
/// callback, or abort. After `cancel_all` the id is gone and this is a no-op.
pub(super) struct SlotGuard {
    pub(super) engine: Engine,
    pub(super) id: TaskId,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.engine.release(self.id);
    }
}
