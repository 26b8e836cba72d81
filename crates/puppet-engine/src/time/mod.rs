//! Time subsystem.
//!
//! Provides the playback clock and frame-rate bookkeeping without coupling to
//! the runtime:
//! - `PlaybackClock` turns real elapsed time into playback delta once per tick
//! - `FrameRateTracker` counts completed frames over a sliding one-second window
//! - `TimeSource` lets tests drive the clock by hand

mod frame_rate;
mod playback;
mod source;

pub use frame_rate::FrameRateTracker;
pub use playback::{ClockState, PlaybackClock};
pub use source::{ManualTimeSource, SystemTimeSource, TimeSource};
