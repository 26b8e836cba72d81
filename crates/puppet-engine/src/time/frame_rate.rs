use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::core::SchedulingContext;

const WINDOW: Duration = Duration::from_secs(1);

/// Sliding one-second window over frame-completion timestamps.
///
/// Pruning is lazy: it happens when the rate is queried, at most once per
/// tick, relative to the newest recorded timestamp.
#[derive(Debug)]
pub struct FrameRateTracker {
    context: SchedulingContext,
    timestamps: VecDeque<Instant>,
}

impl FrameRateTracker {
    pub fn new(context: SchedulingContext) -> Self {
        Self {
            context,
            timestamps: VecDeque::new(),
        }
    }

    /// Appends a completion timestamp.
    ///
    /// # Panics
    /// Panics if `at` is earlier than the newest recorded timestamp.
    #[track_caller]
    pub fn record(&mut self, at: Instant) {
        self.context.assert_current("FrameRateTracker::record");

        if let Some(&latest) = self.timestamps.back() {
            assert!(
                at >= latest,
                "frame timestamps must be non-decreasing ({at:?} < {latest:?})"
            );
        }
        self.timestamps.push_back(at);
    }

    /// Number of recorded frames newer than `latest - 1s`.
    pub fn frames_in_last_second(&mut self) -> usize {
        self.context
            .assert_current("FrameRateTracker::frames_in_last_second");

        let Some(&latest) = self.timestamps.back() else {
            return 0;
        };

        if let Some(cutoff) = latest.checked_sub(WINDOW) {
            while self.timestamps.front().is_some_and(|&t| t <= cutoff) {
                self.timestamps.pop_front();
            }
        }

        self.timestamps.len()
    }

    /// Timestamps currently retained (not yet pruned).
    #[inline]
    pub fn retained(&self) -> usize {
        self.timestamps.len()
    }
}
