//! GPU rendering subsystem.
//!
//! Entity renderers record into one shared [`GpuStream`] per frame. The first
//! pass clears the shared color/depth targets; later passes load them.
//!
//! Convention:
//! - CPU geometry is in logical pixels (top-left origin, +Y down).
//! - Vertex shaders convert to NDC using a viewport uniform.

mod ctx;
mod quad;
mod surface;
mod targets;

pub use ctx::RenderCtx;
pub use quad::{premul_alpha_blend, QuadVertex, ViewportUniform, QUAD_INDICES, QUAD_VERTICES};
pub use surface::{GpuStream, GpuSurface};
pub use targets::{ColorLoad, DepthLoad, PassTargets};
