use crate::device::SurfaceErrorAction;
use crate::render::PassTargets;

use super::CompletionCallback;

/// Presentation backend driven by the scheduler.
///
/// One stream is opened per tick. Every entity draws into it, then it is
/// submitted once together with a completion callback.
pub trait PresentSurface {
    /// Shared command stream plus the presentable image it targets.
    type Stream;

    /// Delivers pending backend callbacks. Called at the start of every tick,
    /// including ticks that end up skipped.
    fn maintain(&mut self) {}

    /// Acquires the next presentable image and opens a stream for it.
    fn begin_stream(&mut self) -> Result<Self::Stream, SurfaceErrorAction>;

    /// Records a bare clear when nothing draws this tick.
    fn clear_stream(&mut self, stream: &mut Self::Stream, targets: &PassTargets) {
        let _ = (stream, targets);
    }

    /// Submits and presents `stream`; `on_complete` fires once the GPU is done.
    fn submit(&mut self, stream: Self::Stream, on_complete: CompletionCallback);

    /// Arranges acquisition of the next presentable image.
    fn prepare_next(&mut self) {}
}
