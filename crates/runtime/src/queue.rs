//! Bounded multi-producer, single-consumer event queue.
//!
//! Storage is a fixed-capacity `heapless::Deque`, so a queue never allocates
//! after construction. Producers never block: a post into a full queue fails
//! immediately and is counted. The single consumer sleeps on a
//! [`Notification`] that every successful post releases.

use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

use heapless::Deque;
use thiserror::Error;

use crate::sync::{Mutex, Notification};

/// A post was rejected because the queue was at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event queue full (capacity {capacity})")]
pub struct QueueFull {
    pub capacity: usize,
}

/// Fixed-capacity FIFO of events plus its wake signal.
pub struct EventQueue<E, const N: usize> {
    events: Mutex<Deque<E, N>>,
    wake: Notification,
    dropped: AtomicUsize,
}

impl<E, const N: usize> EventQueue<E, N> {
    pub const fn new() -> Self {
        Self {
            events: Mutex::new(Deque::new()),
            wake: Notification::new(),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Appends `event` at the tail and wakes the consumer.
    ///
    /// Never blocks beyond the short queue lock. When the queue is full the
    /// event is dropped, the queue is left untouched and the drop counter is
    /// incremented.
    pub fn post(&self, event: E) -> Result<(), QueueFull> {
        let mut events = self.events.lock();
        if events.push_back(event).is_err() {
            drop(events);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(QueueFull { capacity: N });
        }
        drop(events);
        self.wake.release();
        Ok(())
    }

    /// Blocks until woken, then returns an iterator over everything queued.
    ///
    /// The iterator pops one event per `next()` call and releases the lock
    /// in between, so producers (including the consumer's own handlers) may
    /// post while the drain is in progress; those events are yielded by the
    /// same drain. Only the single consumer may call this.
    pub fn take_all(&self) -> Drain<'_, E, N> {
        self.wake.acquire();
        Drain { queue: self }
    }

    /// Returns an iterator over the pending events without waiting.
    pub fn drain(&self) -> Drain<'_, E, N> {
        Drain { queue: self }
    }

    /// Removes and returns the event at the head, if any.
    pub fn pop(&self) -> Option<E> {
        self.events.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.events.lock().is_full()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of posts rejected since creation.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<E, const N: usize> Default for EventQueue<E, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, const N: usize> fmt::Debug for EventQueue<E, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("len", &self.len())
            .field("capacity", &N)
            .field("dropped", &self.dropped())
            .finish()
    }
}

/// Draining iterator returned by [`EventQueue::take_all`] and
/// [`EventQueue::drain`].
pub struct Drain<'a, E, const N: usize> {
    queue: &'a EventQueue<E, N>,
}

impl<E, const N: usize> Iterator for Drain<'_, E, N> {
    type Item = E;

    fn next(&mut self) -> Option<E> {
        self.queue.pop()
    }
}
