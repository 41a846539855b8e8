//! Synchronization primitives shared by queues, timers and state machines.
//!
//! `Mutex` wraps `parking_lot::Mutex` so that lock poisoning never leaks into
//! the runtime: a panicking handler is already fatal under the abort profile,
//! and every other context keeps a plain `lock()` call.

use core::fmt;
use core::time::Duration;

pub use std::sync::{Arc, Weak};

pub type MutexGuard<'a, T> = parking_lot::MutexGuard<'a, T>;

/// Mutual exclusion lock used throughout the runtime.
pub struct Mutex<T> {
    inner: parking_lot::Mutex<T>,
}

impl<T> Mutex<T> {
    /// Creates a new mutex protecting the given value.
    pub const fn new(value: T) -> Self {
        Self {
            inner: parking_lot::const_mutex(value),
        }
    }

    /// Acquires the mutex, blocking until it becomes available.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock()
    }

    /// Attempts to acquire the mutex without blocking.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.inner.try_lock()
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: fmt::Debug> fmt::Debug for Mutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_lock() {
            Some(value) => f.debug_tuple("Mutex").field(&*value).finish(),
            None => f.write_str("Mutex(<locked>)"),
        }
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Binary wake signal with a single waiter.
///
/// `release` marks the notification pending and wakes the waiter; `acquire`
/// blocks until it is pending and consumes it. Releasing an already pending
/// notification is a no-op, so any number of releases between two acquires
/// collapse into one wake-up. A release that happens before the waiter
/// blocks is never lost.
pub struct Notification {
    pending: parking_lot::Mutex<bool>,
    cond: parking_lot::Condvar,
}

impl Notification {
    pub const fn new() -> Self {
        Self {
            pending: parking_lot::const_mutex(false),
            cond: parking_lot::Condvar::new(),
        }
    }

    /// Marks the notification pending and wakes the waiter, if any.
    pub fn release(&self) {
        let mut pending = self.pending.lock();
        *pending = true;
        drop(pending);
        self.cond.notify_one();
    }

    /// Blocks until the notification is pending, then consumes it.
    pub fn acquire(&self) {
        let mut pending = self.pending.lock();
        while !*pending {
            self.cond.wait(&mut pending);
        }
        *pending = false;
    }

    /// Consumes a pending notification without blocking.
    pub fn try_acquire(&self) -> bool {
        let mut pending = self.pending.lock();
        core::mem::replace(&mut *pending, false)
    }

    /// Like [`acquire`](Self::acquire), giving up after `timeout`.
    ///
    /// Returns `true` when the notification was consumed.
    pub fn acquire_timeout(&self, timeout: Duration) -> bool {
        let mut pending = self.pending.lock();
        if !*pending {
            // Spurious wake-ups are fine: the flag is re-checked below.
            let _ = self.cond.wait_for(&mut pending, timeout);
        }
        core::mem::replace(&mut *pending, false)
    }

    pub fn is_pending(&self) -> bool {
        *self.pending.lock()
    }
}

impl Default for Notification {
    fn default() -> Self {
        Self::new()
    }
}
