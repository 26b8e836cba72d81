use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic time source sampled by the playback clock.
pub trait TimeSource {
    fn now(&self) -> Instant;
}

/// Real monotonic time.
#[derive(Debug, Copy, Clone, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced time, shared between clones.
///
/// Hand one clone to the clock and keep another to drive it; useful for tests
/// and for offline stepping.
#[derive(Debug, Clone)]
pub struct ManualTimeSource {
    now: Rc<Cell<Instant>>,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Moves time forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn advance_secs(&self, secs: f64) {
        self.advance(Duration::from_secs_f64(secs));
    }
}

impl Default for ManualTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for ManualTimeSource {
    #[inline]
    fn now(&self) -> Instant {
        self.now.get()
    }
}
