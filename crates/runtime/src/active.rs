//! Active object abstraction.
//!
//! An active object owns one bounded event queue and one execution context
//! that is the queue's only consumer. Every mutation of the object's state
//! happens inside [`ActiveBehavior::on_event`], so the queue is the unit of
//! serialization for the whole domain.

use std::io;
use std::thread::{self, JoinHandle};

use log::{error, trace, warn};
use thiserror::Error;

use crate::event::{ActiveEvent, Dispatch};
use crate::queue::{EventQueue, QueueFull};
use crate::sync::Arc;

/// A runtime thread could not be created.
#[derive(Debug, Error)]
#[error("failed to spawn thread `{name}`")]
pub struct SpawnError {
    pub name: &'static str,
    #[source]
    pub source: io::Error,
}

/// Trait implemented by application behaviors.
pub trait ActiveBehavior: Send + 'static {
    type Event: ActiveEvent;

    fn on_event(&mut self, event: Self::Event) -> Dispatch;
}

/// An active object that has not been started yet.
///
/// Producers obtain [`ActiveHandle`]s before the behavior exists, which lets
/// a behavior hold timers whose callbacks post back into its own queue.
pub struct ActiveObject<E, const N: usize> {
    name: &'static str,
    stack_size: Option<usize>,
    queue: Arc<EventQueue<E, N>>,
}

impl<E: ActiveEvent, const N: usize> ActiveObject<E, N> {
    // The start event must always fit.
    const HAS_CAPACITY: () = assert!(N >= 1, "active object queue needs capacity >= 1");

    pub fn new(name: &'static str) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::HAS_CAPACITY;
        Self {
            name,
            stack_size: None,
            queue: Arc::new(EventQueue::new()),
        }
    }

    /// Sets the stack size of the thread created by [`spawn`](Self::spawn).
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn handle(&self) -> ActiveHandle<E, N> {
        ActiveHandle {
            name: self.name,
            queue: Arc::clone(&self.queue),
        }
    }

    /// Binds the behavior without starting any thread.
    pub fn runner<B>(self, behavior: B) -> ActiveRunner<B, N>
    where
        B: ActiveBehavior<Event = E>,
    {
        ActiveRunner {
            name: self.name,
            queue: self.queue,
            behavior,
            started: false,
        }
    }

    /// Starts the run loop on a dedicated, named thread.
    pub fn spawn<B>(self, behavior: B) -> Result<JoinHandle<()>, SpawnError>
    where
        B: ActiveBehavior<Event = E>,
    {
        let name = self.name;
        let mut builder = thread::Builder::new().name(name.to_string());
        if let Some(bytes) = self.stack_size {
            builder = builder.stack_size(bytes);
        }
        let runner = self.runner(behavior);
        builder
            .spawn(move || runner.run())
            .map_err(|source| SpawnError { name, source })
    }
}

/// Producer side of an active object's queue.
pub struct ActiveHandle<E, const N: usize> {
    name: &'static str,
    queue: Arc<EventQueue<E, N>>,
}

impl<E: ActiveEvent, const N: usize> ActiveHandle<E, N> {
    /// Posts `event` without blocking. A full queue drops the event; the
    /// drop is logged here, on the producer side.
    pub fn post(&self, event: E) -> Result<(), QueueFull> {
        self.queue.post(event).inspect_err(|_| {
            warn!("{} queue full, dropping {:?} event", self.name, event);
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of events dropped so far.
    pub fn dropped(&self) -> usize {
        self.queue.dropped()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl<E, const N: usize> Clone for ActiveHandle<E, N> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            queue: Arc::clone(&self.queue),
        }
    }
}

/// A behavior bound to its queue.
///
/// [`run`](Self::run) is the blocking run loop. [`start`](Self::start) and
/// [`run_until_idle`](Self::run_until_idle) execute the same steps without
/// waiting, for hosts that step the object themselves.
pub struct ActiveRunner<B: ActiveBehavior, const N: usize> {
    name: &'static str,
    queue: Arc<EventQueue<B::Event, N>>,
    behavior: B,
    started: bool,
}

impl<B: ActiveBehavior, const N: usize> ActiveRunner<B, N> {
    /// Posts the start event to the object's own queue. Idempotent.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        if let Err(err) = self.queue.post(B::Event::START) {
            error!("{}: start event rejected: {err}", self.name);
            panic!("{}: start event rejected: {err}", self.name);
        }
    }

    /// Dispatches the event at the head of the queue, if any.
    pub fn dispatch_one(&mut self) -> bool {
        match self.queue.pop() {
            Some(event) => {
                dispatch(self.name, &mut self.behavior, event);
                true
            }
            None => false,
        }
    }

    /// Dispatches events until the queue is empty; returns how many ran.
    pub fn run_until_idle(&mut self) -> usize {
        let mut count = 0;
        while self.dispatch_one() {
            count += 1;
        }
        count
    }

    /// Runs the object forever on the calling thread.
    pub fn run(mut self) -> ! {
        self.start();
        let queue = Arc::clone(&self.queue);
        loop {
            for event in queue.take_all() {
                dispatch(self.name, &mut self.behavior, event);
            }
        }
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    pub fn handle(&self) -> ActiveHandle<B::Event, N> {
        ActiveHandle {
            name: self.name,
            queue: Arc::clone(&self.queue),
        }
    }
}

fn dispatch<B: ActiveBehavior>(name: &'static str, behavior: &mut B, event: B::Event) {
    trace!("{name} <- {event:?}");
    if behavior.on_event(event) == Dispatch::Unhandled {
        error!("{name} received unknown event {event:?}");
        panic!("{name} received unknown event {event:?}");
    }
}
