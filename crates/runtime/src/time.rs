//! Timer services.
//!
//! A [`TimerService`] owns a registry of software timers measured against a
//! monotonic [`Clock`]. Each [`Timer`] handle is owned by exactly one
//! component; its callback runs on the service context (the thread started
//! by [`TimerService::spawn`], or whoever calls [`TimerService::fire_due`]).
//!
//! Periodic behavior is built by rearming from the *expected* deadline of
//! the firing that is in progress, never from the time the callback happened
//! to run:
//!
//! ```ignore
//! let timer = service.timer("heartbeat", move |expiry| {
//!     beat();
//!     expiry.rearm_at(expiry.deadline() + PERIOD);
//! });
//! timer.invoke_after(PERIOD);
//! ```
//!
//! Every external arm or cancel starts a new *generation*. A firing that is
//! already running when `cancel` is called may finish, but its rearm request
//! belongs to the old generation and is ignored, so a stopped timer cannot
//! resurrect itself.

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use core::time::Duration;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::trace;

use crate::active::SpawnError;
use crate::sync::{Arc, Mutex, Notification};

/// Source of monotonic time for a timer service.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// Wall-clock monotonic time from [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Simulated clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// The instant the clock started at.
    pub fn origin(&self) -> Instant {
        self.origin
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }

    /// Moves the clock to `elapsed` past the origin. Time never runs
    /// backwards: an earlier value is ignored.
    pub fn set(&self, elapsed: Duration) {
        let mut offset = self.offset.lock();
        *offset = (*offset).max(elapsed);
    }

    /// Simulated time elapsed since [`origin`](Self::origin).
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}

type Callback = Box<dyn FnMut(&Expiry<'_>) + Send>;

#[derive(Debug, Default)]
struct TimerState {
    deadline: Option<Instant>,
    period: Option<Duration>,
    enabled: bool,
    generation: u64,
    seq: u64,
}

struct TimerEntry {
    name: &'static str,
    state: Mutex<TimerState>,
    callback: Mutex<Callback>,
}

struct Shared {
    clock: Arc<dyn Clock>,
    timers: Mutex<Vec<Arc<TimerEntry>>>,
    firing: Mutex<()>,
    wake: Notification,
    next_seq: AtomicU64,
    running: AtomicBool,
}

impl Shared {
    fn now(&self) -> Instant {
        self.clock.now()
    }

    fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Picks the earliest due timer (ties broken by arm order) and moves it
    /// to its post-firing state: one-shots disarm, periodic timers advance
    /// their deadline by one period.
    fn take_next_due(&self, now: Instant) -> Option<(Arc<TimerEntry>, Instant, u64)> {
        let timers = self.timers.lock();
        loop {
            let mut best: Option<(&Arc<TimerEntry>, Instant, u64)> = None;
            for entry in timers.iter() {
                let state = entry.state.lock();
                let Some(deadline) = state.deadline.filter(|_| state.enabled) else {
                    continue;
                };
                if deadline > now {
                    continue;
                }
                let earlier = match best {
                    Some((_, best_deadline, best_seq)) => {
                        (deadline, state.seq) < (best_deadline, best_seq)
                    }
                    None => true,
                };
                if earlier {
                    best = Some((entry, deadline, state.seq));
                }
            }

            let (entry, deadline, seq) = best?;
            let mut state = entry.state.lock();
            if !state.enabled || state.deadline != Some(deadline) || state.seq != seq {
                // Re-armed or cancelled from another context since the scan.
                continue;
            }
            match state.period {
                Some(period) => {
                    state.deadline = Some(deadline + period);
                    state.seq = self.next_seq();
                }
                None => {
                    state.enabled = false;
                    state.deadline = None;
                }
            }
            let generation = state.generation;
            drop(state);
            return Some((Arc::clone(entry), deadline, generation));
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.timers
            .lock()
            .iter()
            .filter_map(|entry| {
                let state = entry.state.lock();
                state.deadline.filter(|_| state.enabled)
            })
            .min()
    }
}

/// Registry and dispatcher of software timers.
///
/// Cloning yields another handle to the same service.
#[derive(Clone)]
pub struct TimerService {
    shared: Arc<Shared>,
}

impl TimerService {
    pub fn new<C: Clock>(clock: Arc<C>) -> Self {
        Self {
            shared: Arc::new(Shared {
                clock,
                timers: Mutex::new(Vec::new()),
                firing: Mutex::new(()),
                wake: Notification::new(),
                next_seq: AtomicU64::new(0),
                running: AtomicBool::new(false),
            }),
        }
    }

    /// Service measuring time with [`SystemClock`].
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    pub fn now(&self) -> Instant {
        self.shared.now()
    }

    /// Creates a disarmed timer running `callback` on every firing.
    pub fn timer<F>(&self, name: &'static str, callback: F) -> Timer
    where
        F: FnMut(&Expiry<'_>) + Send + 'static,
    {
        let entry = Arc::new(TimerEntry {
            name,
            state: Mutex::new(TimerState::default()),
            callback: Mutex::new(Box::new(callback)),
        });
        self.shared.timers.lock().push(Arc::clone(&entry));
        Timer {
            entry,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Fires every timer whose deadline is not later than the current time.
    ///
    /// Timers fire in deadline order, ties in arm order. A deadline that a
    /// callback sets inside the same window fires in the same call, so a
    /// service that fell behind catches up without losing periods. Returns
    /// the number of callbacks run. Must not be called from a callback.
    pub fn fire_due(&self) -> usize {
        let _firing = self.shared.firing.lock();
        let now = self.shared.now();
        let mut fired = 0;
        while let Some((entry, deadline, generation)) = self.shared.take_next_due(now) {
            trace!("timer `{}` fired (deadline {:?} late)", entry.name, now - deadline);
            let expiry = Expiry {
                entry: &entry,
                shared: &self.shared,
                deadline,
                fired_at: now,
                generation,
            };
            let mut callback = entry.callback.lock();
            (callback.as_mut())(&expiry);
            fired += 1;
        }
        fired
    }

    /// Earliest deadline among armed timers.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.shared.next_deadline()
    }

    pub fn timer_count(&self) -> usize {
        self.shared.timers.lock().len()
    }

    /// Starts the service context: a thread that sleeps until the earliest
    /// deadline, or until a timer is armed, and then fires due timers.
    pub fn spawn(&self) -> Result<JoinHandle<()>, SpawnError> {
        const NAME: &str = "timer-service";
        self.shared.running.store(true, Ordering::Release);
        let service = self.clone();
        thread::Builder::new()
            .name(NAME.to_string())
            .spawn(move || service.run())
            .map_err(|source| SpawnError { name: NAME, source })
    }

    /// Asks the service thread to exit after its current pass.
    pub fn shutdown(&self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.wake.release();
    }

    fn run(&self) {
        while self.shared.running.load(Ordering::Acquire) {
            self.fire_due();
            match self.next_deadline() {
                Some(deadline) => {
                    let now = self.now();
                    if deadline > now {
                        self.shared.wake.acquire_timeout(deadline - now);
                    }
                }
                None => self.shared.wake.acquire(),
            }
        }
        trace!("timer service stopped");
    }
}

impl fmt::Debug for TimerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerService")
            .field("timers", &self.timer_count())
            .field("next_deadline", &self.next_deadline())
            .finish()
    }
}

/// Exclusively owned software timer.
///
/// Created disarmed by [`TimerService::timer`]. Dropping the handle cancels
/// the timer and removes it from the service.
pub struct Timer {
    entry: Arc<TimerEntry>,
    shared: Arc<Shared>,
}

impl Timer {
    /// Arms a one-shot firing `delay` from now.
    pub fn invoke_after(&self, delay: Duration) {
        let deadline = self.shared.now() + delay;
        self.arm(deadline, None);
    }

    /// Arms a one-shot firing at an absolute deadline.
    pub fn invoke_at(&self, deadline: Instant) {
        self.arm(deadline, None);
    }

    /// Arms a periodic timer: first firing `period` from now, then every
    /// `period` after each expected deadline.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero.
    pub fn invoke_every(&self, period: Duration) {
        assert!(!period.is_zero(), "timer `{}`: zero period", self.entry.name);
        let deadline = self.shared.now() + period;
        self.arm(deadline, Some(period));
    }

    /// Disarms the timer. Idempotent; returns whether it was armed.
    ///
    /// A firing already in progress on the service context may complete,
    /// but any rearm it requests is ignored.
    pub fn cancel(&self) -> bool {
        let mut state = self.entry.state.lock();
        let was_armed = state.enabled;
        state.generation += 1;
        state.enabled = false;
        state.deadline = None;
        state.period = None;
        drop(state);
        if was_armed {
            trace!("timer `{}` disarmed", self.entry.name);
        } else {
            trace!("timer `{}` disarm attempt on disarmed timer", self.entry.name);
        }
        was_armed
    }

    pub fn is_armed(&self) -> bool {
        self.entry.state.lock().enabled
    }

    /// Deadline of the next firing, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        let state = self.entry.state.lock();
        state.deadline.filter(|_| state.enabled)
    }

    pub fn name(&self) -> &'static str {
        self.entry.name
    }

    fn arm(&self, deadline: Instant, period: Option<Duration>) {
        let mut state = self.entry.state.lock();
        state.generation += 1;
        state.deadline = Some(deadline);
        state.period = period;
        state.enabled = true;
        state.seq = self.shared.next_seq();
        drop(state);
        trace!("timer `{}` armed (period {period:?})", self.entry.name);
        self.shared.wake.release();
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.cancel();
        self.shared
            .timers
            .lock()
            .retain(|entry| !Arc::ptr_eq(entry, &self.entry));
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("name", &self.entry.name)
            .field("deadline", &self.deadline())
            .finish()
    }
}

/// Context of one timer firing, passed to the callback.
pub struct Expiry<'a> {
    entry: &'a TimerEntry,
    shared: &'a Shared,
    deadline: Instant,
    fired_at: Instant,
    generation: u64,
}

impl Expiry<'_> {
    /// The deadline this firing was scheduled for.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Clock reading when the service started this firing window.
    pub fn fired_at(&self) -> Instant {
        self.fired_at
    }

    pub fn lateness(&self) -> Duration {
        self.fired_at.saturating_duration_since(self.deadline)
    }

    pub fn name(&self) -> &'static str {
        self.entry.name
    }

    /// Rearms this timer as a one-shot at `deadline`.
    ///
    /// Ignored, returning `false`, when the timer was cancelled or re-armed
    /// from elsewhere after this firing began.
    pub fn rearm_at(&self, deadline: Instant) -> bool {
        let mut state = self.entry.state.lock();
        if state.generation != self.generation {
            drop(state);
            trace!("timer `{}` rearm ignored after cancel", self.entry.name);
            return false;
        }
        state.deadline = Some(deadline);
        state.period = None;
        state.enabled = true;
        state.seq = self.shared.next_seq();
        drop(state);
        self.shared.wake.release();
        true
    }
}
