use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

// ===================== Clock =====================
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { now: Rc::new(Cell::new(Instant::now())) }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

// ===================== Ticker =====================
/// Deadlines step by whole intervals; after a long stall it fires once and resyncs.
#[derive(Debug)]
pub struct Ticker {
    next_due: Option<Instant>,
    stopped: bool,
}

impl Ticker {
    /// A ticker whose first tick is due at `first`.
    pub fn starting_at(first: Instant) -> Self {
        Self { next_due: Some(first), stopped: false }
    }

    /// Returns true when a tick is due at `now` and schedules the following
    /// one `interval` later. `interval` is only read here, so a changed
    /// interval applies from the next scheduling onward.
    pub fn poll(&mut self, now: Instant, interval: Duration) -> bool {
        if self.stopped {
            return false;
        }
        let due = match self.next_due {
            Some(due) if now >= due => due,
            Some(_) => return false,
            None => now,
        };
        let mut next = due + interval;
        if next <= now {
            next = now + interval;
        }
        self.next_due = Some(next);
        true
    }

    /// Records an out-of-band tick at `now`; the next one is `interval` later.
    pub fn reschedule_from(&mut self, now: Instant, interval: Duration) {
        if !self.stopped {
            self.next_due = Some(now + interval);
        }
    }

    pub fn until_next(&self, now: Instant) -> Option<Duration> {
        if self.stopped {
            return None;
        }
        self.next_due.map(|due| due.saturating_duration_since(now))
    }

    pub fn stop(&mut self) {
        self.stopped = true;
        self.next_due = None;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}
