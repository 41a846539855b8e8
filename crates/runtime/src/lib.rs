//! # blinky-runtime
//!
//! The concurrency and timing core of the blinky firmware: everything that
//! makes LED, pulse and button behavior deterministic across an interrupt
//! source, a background worker and independently scheduled consumers.
//!
//! ## Module Overview
//! - [`queue`]  – Bounded multi-producer, single-consumer event queue.
//! - [`active`] – Active objects: one queue, one consumer thread each.
//! - [`time`]   – Timer service with drift-free rescheduling and safe cancel.
//! - [`fsm`]    – Flat state machine with entry/exit hooks and a listener.
//! - [`work`]   – Deferred work queue for interrupt hand-off.
//! - [`sync`]   – Mutex and wake-signal primitives used by all of the above.

pub mod active;
pub mod event;
pub mod fsm;
pub mod queue;
pub mod sync;
pub mod time;
pub mod work;

pub use active::{ActiveBehavior, ActiveHandle, ActiveObject, ActiveRunner, SpawnError};
pub use event::{ActiveEvent, Dispatch};
pub use fsm::{StateId, StateMachine, StateTable, TransitionListener};
pub use queue::{EventQueue, QueueFull};
pub use time::{Clock, Expiry, ManualClock, SystemClock, Timer, TimerService};
pub use work::WorkQueue;

#[cfg(test)]
mod tests;
