//! Bounded FIFO of actions captured while the session is not live.

use models::PendingAction;

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use log::{debug, warn};

pub const ACTION_QUEUE_CAPACITY: usize = 100;

/// Ring of at most [`ACTION_QUEUE_CAPACITY`] pending actions.
///
/// Enqueueing into a full queue drops the oldest entry. Every operation takes
/// the internal lock, so the queue can be shared between the caller that
/// enqueues and the session task that drains it.
#[derive(Debug)]
pub struct ActionQueue {
    entries: Mutex<VecDeque<PendingAction>>,
    capacity: usize,
}

impl Default for ActionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::with_capacity(ACTION_QUEUE_CAPACITY)
    }

    /// Capacity is clamped to at least one slot.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn enqueue(&self, action: impl Into<PendingAction>) {
        let action = action.into();
        let mut entries = self.lock();

        if entries.len() >= self.capacity {
            if let Some(dropped) = entries.pop_front() {
                warn!(
                    "Action queue full ({}), dropping oldest '{}'",
                    self.capacity,
                    dropped.action.operation()
                );
            }
        }

        debug!("Queued action '{}'", action.action.operation());
        entries.push_back(action);
    }

    /// Remove and return every entry, oldest first.
    pub fn dequeue_all(&self) -> Vec<PendingAction> {
        self.lock().drain(..).collect()
    }

    /// Put actions back at the front, ahead of anything queued meanwhile.
    ///
    /// Capacity still applies: if the combined length exceeds it, the oldest
    /// entries are the ones dropped.
    pub fn requeue_front(&self, actions: Vec<PendingAction>) {
        if actions.is_empty() {
            return;
        }

        let mut entries = self.lock();
        for action in actions.into_iter().rev() {
            entries.push_front(action);
        }

        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lock().len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panic while holding the lock cannot leave the deque half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<PendingAction>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
