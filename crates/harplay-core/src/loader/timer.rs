//! Clock and the loader's single timer slot.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic time source for the loader.
pub trait Clock {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;

    /// Block until `duration` has passed.
    fn sleep(&self, duration: Duration);
}

/// Wall-time monotonic clock, origin at construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only moves when told to; `sleep` advances it instantly.
/// Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Move forward to `t`; never moves backwards.
    pub fn advance_to(&self, t: Duration) {
        if t > self.now.get() {
            self.now.set(t);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// What an armed timer does when it comes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Report `on_timeout` for the attempt in flight.
    Timeout,
    /// Start the next attempt.
    Retry,
}

/// At most one pending timer: arming replaces whatever was armed.
#[derive(Debug, Default)]
pub struct TimerSlot {
    pending: Option<(TimerKind, Duration)>,
}

impl TimerSlot {
    pub fn schedule(&mut self, kind: TimerKind, now: Duration, delay: Duration) {
        self.pending = Some((kind, now + delay));
    }

    pub fn cancel(&mut self) -> Option<TimerKind> {
        self.pending.take().map(|(kind, _)| kind)
    }

    pub fn kind(&self) -> Option<TimerKind> {
        self.pending.map(|(kind, _)| kind)
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Time left until the deadline (zero if already due).
    pub fn remaining(&self, now: Duration) -> Option<Duration> {
        self.pending
            .map(|(_, deadline)| deadline.saturating_sub(now))
    }

    /// Disarm and return the timer if its deadline has passed.
    pub fn take_due(&mut self, now: Duration) -> Option<TimerKind> {
        match self.pending {
            Some((kind, deadline)) if deadline <= now => {
                self.pending = None;
                Some(kind)
            }
            _ => None,
        }
    }
}
