//! Work queue of entity references
//!
//! A shared FIFO the worker pool races on. Dequeue is non-blocking: an empty
//! queue tells a worker to exit. Re-enqueueing a reference after a
//! recoverable failure is a new logical attempt with the same identity.

use std::collections::VecDeque;
use std::sync::Mutex;

/// An opaque reference identifying one entity to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub reference: String,
}

impl WorkItem {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }
}

/// Internally-synchronized FIFO of work items
pub struct WorkQueue {
    inner: Mutex<VecDeque<WorkItem>>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    /// Builds a queue pre-populated with seed items
    pub fn seeded(items: impl IntoIterator<Item = WorkItem>) -> Self {
        Self {
            inner: Mutex::new(items.into_iter().collect()),
        }
    }

    /// Appends an item to the back of the queue
    pub fn push(&self, item: WorkItem) {
        self.inner.lock().unwrap().push_back(item);
    }

    /// Non-blocking dequeue; None means the queue is empty right now
    pub fn try_pop(&self) -> Option<WorkItem> {
        self.inner.lock().unwrap().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}
