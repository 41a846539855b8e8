//! Event primitives.
//!
//! Events are small tagged values scoped to one active object domain. They
//! are copied into and out of queues by value and carry no identity beyond
//! their queue position, so every event type is a plain `Copy` enum.

use core::fmt;

/// Event type accepted by an active object.
pub trait ActiveEvent: Copy + Send + fmt::Debug + 'static {
    /// Event the run loop posts to itself before waiting for the first time.
    const START: Self;
}

/// Outcome of dispatching one event to a behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Dispatch {
    /// The behavior recognized and processed the event.
    Handled,
    /// The behavior does not know this event. Treated as a logic defect.
    Unhandled,
}

impl Dispatch {
    pub fn is_handled(self) -> bool {
        matches!(self, Self::Handled)
    }
}

impl fmt::Display for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handled => f.write_str("handled"),
            Self::Unhandled => f.write_str("unhandled"),
        }
    }
}
