use std::thread::{self, ThreadId};

/// Identity of the single thread allowed to touch scheduler-owned state.
///
/// Captured once when the scheduler is built and copied into every component
/// that needs to check it. There are no locks behind this type; it only
/// detects misuse.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SchedulingContext {
    thread: ThreadId,
}

impl SchedulingContext {
    /// Binds the context to the calling thread.
    pub fn current() -> Self {
        Self {
            thread: thread::current().id(),
        }
    }

    #[inline]
    pub fn is_current(self) -> bool {
        thread::current().id() == self.thread
    }

    /// Panics when called from any thread other than the bound one.
    #[track_caller]
    pub fn assert_current(self, operation: &str) {
        assert!(
            self.is_current(),
            "{operation} called off the scheduling context (bound to {:?}, called from {:?})",
            self.thread,
            thread::current().id(),
        );
    }
}
