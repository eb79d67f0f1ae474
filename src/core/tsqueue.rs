//! # Thread-Safe Queue
//!
//! Mutex-guarded double-ended queue with a blocking wait.
//!
//! The container sits behind one lock. Blocking uses a second lock and a
//! condition variable, so a parked consumer never holds the data lock. Every
//! push signals the condition variable.
//!
//! ## Contract
//! [`TsQueue::wait`] returns once the queue was observed non-empty. With more
//! than one consumer another thread may pop in between, so callers must still
//! handle `pop_front()` returning `None`. Endpoints in this crate use a single
//! consumer per queue.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

pub struct TsQueue<T> {
    items: Mutex<VecDeque<T>>,
    blocking: Mutex<()>,
    ready: Condvar,
}

impl<T> TsQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            blocking: Mutex::new(()),
            ready: Condvar::new(),
        }
    }

    /// Add an item to the back
    pub fn push_back(&self, item: T) {
        self.items.lock().push_back(item);
        self.notify();
    }

    /// Add an item to the front
    pub fn push_front(&self, item: T) {
        self.items.lock().push_front(item);
        self.notify();
    }

    /// Remove and return the front item
    pub fn pop_front(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Remove and return the back item
    pub fn pop_back(&self) -> Option<T> {
        self.items.lock().pop_back()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Number of queued items
    pub fn count(&self) -> usize {
        self.items.lock().len()
    }

    pub fn clear(&self) {
        self.items.lock().clear();
    }

    /// Block the calling thread until the queue is non-empty
    pub fn wait(&self) {
        let mut guard = self.blocking.lock();
        while self.is_empty() {
            self.ready.wait(&mut guard);
        }
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`.
    ///
    /// Returns `true` if the queue was non-empty before the deadline.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            // Deadline not representable, so it is never reached.
            self.wait();
            return true;
        };
        let mut guard = self.blocking.lock();
        while self.is_empty() {
            if self.ready.wait_until(&mut guard, deadline).timed_out() {
                return !self.is_empty();
            }
        }
        true
    }

    fn notify(&self) {
        // Taking the blocking lock orders this signal after a waiter's
        // emptiness check, so the wakeup cannot be lost.
        let _guard = self.blocking.lock();
        self.ready.notify_one();
    }
}

impl<T: Clone> TsQueue<T> {
    /// Copy of the front item
    pub fn front(&self) -> Option<T> {
        self.items.lock().front().cloned()
    }

    /// Copy of the back item
    pub fn back(&self) -> Option<T> {
        self.items.lock().back().cloned()
    }
}

impl<T> Default for TsQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for TsQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsQueue")
            .field("count", &self.count())
            .finish()
    }
}
