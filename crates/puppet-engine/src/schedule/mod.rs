//! Frame scheduling.
//!
//! Responsibilities:
//! - pace rendering to the display refresh signal
//! - recycle a fixed pool of frame slots, released when the GPU finishes a frame
//! - order tracked entities and record them into one shared stream per frame
//! - track the realized frame rate
//!
//! Everything here is owned by a single scheduling context (see
//! [`SchedulingContext`](crate::core::SchedulingContext)). GPU completion is
//! the one cross-thread edge; it arrives as a message on a channel and is
//! applied back on that context.

mod completion;
mod entity;
mod orchestrator;
mod present;
mod registry;
mod slot_pool;

pub use completion::{CompletionCallback, CompletionQueue, CompletionSender, FrameCompletion};
pub use entity::{BoneFilter, Entity, EntityRenderer, SharedEntity, SharedRenderer};
pub use orchestrator::{
    DrawOrderHook, FrameSkip, RenderOrchestrator, RendererFactory, SchedulerConfig, TickOutcome,
};
pub use present::PresentSurface;
pub use registry::{Binding, EntityRegistry};
pub use slot_pool::{FrameSlot, FrameSlotPool, FRAMES_IN_FLIGHT};
