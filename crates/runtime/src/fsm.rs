//! Flat state machine runtime driven by button-style edges.
//!
//! States are plain enum tags. Each tag maps to a static [`StateTable`] of
//! function pointers (entry, exit and one handler per edge), so there is
//! exactly one behavior per state and no state ever owns mutable data: all
//! of it lives in the [`StateMachine`] context as `S::Data`.
//!
//! Side effects of a transition that concern resources outside the state
//! machine (timers, LEDs) are wired through a [`TransitionListener`], which
//! runs once per [`StateMachine::set_state`] after the new state's entry.

use core::fmt;

use log::debug;

/// Identity of a state.
pub trait StateId: Copy + Eq + fmt::Debug + Send + 'static {
    /// Mutable data shared by all states of the machine.
    type Data: Send;

    fn table(self) -> &'static StateTable<Self>;
}

/// Behavior of one state.
pub struct StateTable<S: StateId> {
    pub name: &'static str,
    /// Runs after the machine switched to this state.
    pub entry: fn(&mut StateMachine<S>),
    /// Runs while the machine still reports this state as current.
    pub exit: fn(&mut StateMachine<S>),
    pub on_press: fn(&mut StateMachine<S>),
    pub on_release: fn(&mut StateMachine<S>),
}

impl<S: StateId> StateTable<S> {
    /// A table where every hook does nothing and both edges are unhandled.
    pub const fn passive(name: &'static str) -> Self {
        Self {
            name,
            entry: no_op,
            exit: no_op,
            on_press: unhandled_press,
            on_release: unhandled_release,
        }
    }
}

/// Entry/exit hook that does nothing.
pub fn no_op<S: StateId>(_machine: &mut StateMachine<S>) {}

/// Press handler for states that ignore presses.
pub fn unhandled_press<S: StateId>(machine: &mut StateMachine<S>) {
    debug!("unhandled press in {}", machine.current_name());
}

/// Release handler for states that ignore releases.
pub fn unhandled_release<S: StateId>(machine: &mut StateMachine<S>) {
    debug!("unhandled release in {}", machine.current_name());
}

/// Observer of state changes.
pub trait TransitionListener<S>: Send {
    fn on_transition(&mut self, previous: Option<S>, current: Option<S>);
}

impl<S, F> TransitionListener<S> for F
where
    F: FnMut(Option<S>, Option<S>) + Send,
{
    fn on_transition(&mut self, previous: Option<S>, current: Option<S>) {
        self(previous, current)
    }
}

/// State machine context.
pub struct StateMachine<S: StateId> {
    previous: Option<S>,
    current: Option<S>,
    listener: Box<dyn TransitionListener<S>>,
    data: S::Data,
}

impl<S: StateId> StateMachine<S> {
    /// Creates a machine with no active state.
    pub fn new<L>(data: S::Data, listener: L) -> Self
    where
        L: TransitionListener<S> + 'static,
    {
        Self {
            previous: None,
            current: None,
            listener: Box::new(listener),
            data,
        }
    }

    /// Enters the initial state.
    pub fn start(&mut self, initial: S) {
        self.set_state(Some(initial));
    }

    /// Switches to `next`.
    ///
    /// Order: exit of the current state (the context still reports it as
    /// current), context update, entry of `next`, then the listener with
    /// `(previous, current)`. `None` leaves the machine without an active
    /// state; the old state's exit still runs.
    pub fn set_state(&mut self, next: Option<S>) {
        if let Some(current) = self.current {
            (current.table().exit)(self);
        }
        self.previous = self.current;
        self.current = next;
        if let Some(current) = self.current {
            (current.table().entry)(self);
        }
        debug!(
            "transition {} -> {}",
            name_of(self.previous),
            name_of(self.current)
        );
        self.listener.on_transition(self.previous, self.current);
    }

    /// Delivers a press edge to the current state.
    pub fn handle_press(&mut self) {
        if let Some(current) = self.current {
            (current.table().on_press)(self);
        }
    }

    /// Delivers a release edge to the current state.
    pub fn handle_release(&mut self) {
        if let Some(current) = self.current {
            (current.table().on_release)(self);
        }
    }

    pub fn current(&self) -> Option<S> {
        self.current
    }

    pub fn previous(&self) -> Option<S> {
        self.previous
    }

    pub fn current_name(&self) -> &'static str {
        name_of(self.current)
    }

    pub fn data(&self) -> &S::Data {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut S::Data {
        &mut self.data
    }
}

impl<S: StateId> fmt::Debug for StateMachine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("previous", &self.previous)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

fn name_of<S: StateId>(state: Option<S>) -> &'static str {
    state.map_or("<none>", |state| state.table().name)
}
