use std::time::Instant;

use super::{SystemTimeSource, TimeSource};

/// Playback state of a [`PlaybackClock`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ClockState {
    Stopped,
    Running,
    Paused,
}

/// Converts real elapsed time into playback time.
///
/// The clock is the only place where wall-clock time turns into simulation
/// time: [`cut_current_frame_time`](Self::cut_current_frame_time) samples the
/// source once per tick, scales the elapsed time by `speed`, and stores it as
/// the delta reported to entities until the next cut.
///
/// While not running, [`delta`](Self::delta) is always zero. Starting (or
/// resuming) resets the sample point, so paused real time is never counted.
#[derive(Debug, Clone)]
pub struct PlaybackClock<T: TimeSource = SystemTimeSource> {
    source: T,
    state: ClockState,
    speed: f64,
    last_sample: Instant,
    delta: f64,
}

impl PlaybackClock<SystemTimeSource> {
    pub fn new() -> Self {
        Self::with_source(SystemTimeSource)
    }
}

impl Default for PlaybackClock<SystemTimeSource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeSource> PlaybackClock<T> {
    /// Creates a stopped clock sampling `source`, with speed `1.0`.
    pub fn with_source(source: T) -> Self {
        let last_sample = source.now();
        Self {
            source,
            state: ClockState::Stopped,
            speed: 1.0,
            last_sample,
            delta: 0.0,
        }
    }

    #[inline]
    pub fn state(&self) -> ClockState {
        self.state
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Sets the playback multiplier; takes effect at the next cut.
    ///
    /// # Panics
    /// Panics if `speed` is negative or not finite.
    #[track_caller]
    pub fn set_speed(&mut self, speed: f64) {
        assert!(
            speed.is_finite() && speed >= 0.0,
            "playback speed must be finite and >= 0, got {speed}"
        );
        self.speed = speed;
    }

    /// Stopped/Paused -> Running. No-op when already running.
    pub fn start(&mut self) {
        if self.state == ClockState::Running {
            return;
        }
        self.state = ClockState::Running;
        self.last_sample = self.source.now();
        self.delta = 0.0;
    }

    /// Running -> Paused. No-op otherwise.
    pub fn pause(&mut self) {
        if self.state != ClockState::Running {
            return;
        }
        self.state = ClockState::Paused;
        self.delta = 0.0;
    }

    /// Samples the source and stores the scaled elapsed time as this tick's delta.
    ///
    /// Outside `Running` this only zeroes the delta.
    pub fn cut_current_frame_time(&mut self) {
        if self.state != ClockState::Running {
            self.delta = 0.0;
            return;
        }

        let now = self.source.now();
        let elapsed = now.saturating_duration_since(self.last_sample);
        self.last_sample = now;
        self.delta = elapsed.as_secs_f64() * self.speed;
    }

    /// Delta captured by the most recent cut, in seconds of playback time.
    #[inline]
    pub fn delta(&self) -> f64 {
        if self.state == ClockState::Running {
            self.delta
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualTimeSource;

    fn clock() -> (ManualTimeSource, PlaybackClock<ManualTimeSource>) {
        let time = ManualTimeSource::new();
        let clock = PlaybackClock::with_source(time.clone());
        (time, clock)
    }

    // ── state machine ─────────────────────────────────────────────────────

    #[test]
    fn starts_stopped_with_zero_delta() {
        let (time, mut c) = clock();
        assert_eq!(c.state(), ClockState::Stopped);
        time.advance_secs(1.0);
        c.cut_current_frame_time();
        assert_eq!(c.delta(), 0.0);
    }

    #[test]
    fn pause_and_resume_transitions() {
        let (_, mut c) = clock();
        c.start();
        assert_eq!(c.state(), ClockState::Running);
        c.pause();
        assert_eq!(c.state(), ClockState::Paused);
        c.pause();
        assert_eq!(c.state(), ClockState::Paused);
        c.start();
        assert_eq!(c.state(), ClockState::Running);
    }

    // ── cut / delta ───────────────────────────────────────────────────────

    #[test]
    fn speed_scales_elapsed_time() {
        let (time, mut c) = clock();
        c.start();
        time.advance_secs(0.5);
        c.set_speed(2.0);
        c.cut_current_frame_time();
        assert_eq!(c.delta(), 1.0);
    }

    #[test]
    fn delta_is_per_cut_not_cumulative() {
        let (time, mut c) = clock();
        c.start();
        time.advance_secs(0.25);
        c.cut_current_frame_time();
        assert_eq!(c.delta(), 0.25);
        time.advance_secs(0.5);
        c.cut_current_frame_time();
        assert_eq!(c.delta(), 0.5);
    }

    #[test]
    fn paused_reports_zero() {
        let (time, mut c) = clock();
        c.start();
        time.advance_secs(0.5);
        c.cut_current_frame_time();
        c.pause();
        assert_eq!(c.delta(), 0.0);
        time.advance_secs(0.5);
        c.cut_current_frame_time();
        assert_eq!(c.delta(), 0.0);
    }

    #[test]
    fn resume_skips_paused_time() {
        let (time, mut c) = clock();
        c.start();
        c.pause();
        time.advance_secs(10.0);
        c.start();
        time.advance_secs(0.125);
        c.cut_current_frame_time();
        assert_eq!(c.delta(), 0.125);
    }

    #[test]
    fn zero_speed_freezes_playback() {
        let (time, mut c) = clock();
        c.start();
        c.set_speed(0.0);
        time.advance_secs(1.0);
        c.cut_current_frame_time();
        assert_eq!(c.delta(), 0.0);
        assert!(c.is_running());
    }

    #[test]
    #[should_panic(expected = "playback speed")]
    fn negative_speed_panics() {
        let (_, mut c) = clock();
        c.set_speed(-1.0);
    }
}
