//! In-flight task registry.
//!
//! Tracks which requester currently has a batch running. Presence of an entry
//! is the single-flight lock; removing it is the cooperative cancellation
//! signal, polled by the orchestrator at episode boundaries.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Concurrent registry of active batches, keyed by requester id.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    inner: Arc<Mutex<HashSet<i64>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim the single-flight slot for a requester.
    ///
    /// Returns false if a batch is already active for this requester.
    pub fn try_acquire(&self, requester: i64) -> bool {
        let acquired = self.inner.lock().unwrap().insert(requester);
        debug!(requester, acquired, "Registry acquire attempt");
        acquired
    }

    /// Remove the entry unconditionally. Idempotent.
    pub fn release(&self, requester: i64) {
        self.inner.lock().unwrap().remove(&requester);
        debug!(requester, "Registry entry released");
    }

    /// Remove the entry if present, returning whether it was present.
    ///
    /// This is the sole cancellation mechanism; an external process already
    /// started is not interrupted.
    pub fn cancel(&self, requester: i64) -> bool {
        let was_active = self.inner.lock().unwrap().remove(&requester);
        debug!(requester, was_active, "Registry cancel");
        was_active
    }

    /// True iff no entry exists for the requester.
    pub fn is_cancelled(&self, requester: i64) -> bool {
        !self.inner.lock().unwrap().contains(&requester)
    }
}
