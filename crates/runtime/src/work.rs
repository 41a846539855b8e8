//! Deferred work queue.
//!
//! Interrupt-like contexts hand work to a background worker instead of doing
//! it themselves: [`WorkQueue::push_work`] only takes the short queue lock
//! and never waits for the worker.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use log::{trace, warn};

use crate::active::SpawnError;
use crate::queue::{EventQueue, QueueFull};
use crate::sync::Arc;

/// A unit of deferred work.
pub type Work = Box<dyn FnOnce() + Send>;

struct Inner<const N: usize> {
    queue: EventQueue<Work, N>,
    stopping: AtomicBool,
}

/// Bounded queue of closures drained by one worker.
///
/// Cloning yields another producer handle to the same queue.
pub struct WorkQueue<const N: usize> {
    inner: Arc<Inner<N>>,
}

impl<const N: usize> WorkQueue<N> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: EventQueue::new(),
                stopping: AtomicBool::new(false),
            }),
        }
    }

    /// Queues `work` for the worker. Fails without blocking when full.
    pub fn push_work<F>(&self, work: F) -> Result<(), QueueFull>
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.queue.post(Box::new(work)).inspect_err(|err| {
            warn!("work queue: {err}, dropping work item");
        })
    }

    /// Runs everything queued so far on the calling thread.
    pub fn run_pending(&self) -> usize {
        let mut count = 0;
        for work in self.inner.queue.drain() {
            work();
            count += 1;
        }
        count
    }

    /// Starts the worker thread.
    pub fn spawn(&self, name: &'static str) -> Result<JoinHandle<()>, SpawnError> {
        let inner = Arc::clone(&self.inner);
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while !inner.stopping.load(Ordering::Acquire) {
                    for work in inner.queue.take_all() {
                        work();
                    }
                }
                trace!("work queue worker stopped");
            })
            .map_err(|source| SpawnError { name, source })
    }

    /// Stops the worker after the work already queued has run.
    pub fn shutdown(&self) {
        self.inner.stopping.store(true, Ordering::Release);
        // Wakes the worker; a full queue means a wake-up is already pending.
        let _ = self.inner.queue.post(Box::new(|| {}));
    }

    pub fn pending(&self) -> usize {
        self.inner.queue.len()
    }

    pub fn dropped(&self) -> usize {
        self.inner.queue.dropped()
    }
}

impl<const N: usize> Default for WorkQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Clone for WorkQueue<N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<const N: usize> fmt::Debug for WorkQueue<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkQueue")
            .field("pending", &self.pending())
            .field("capacity", &N)
            .finish()
    }
}
