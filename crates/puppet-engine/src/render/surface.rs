use winit::window::Window;

use crate::coords::Viewport;
use crate::device::{Gpu, GpuFrame, SurfaceErrorAction};
use crate::schedule::{CompletionCallback, PresentSurface};

use super::{PassTargets, RenderCtx};

/// The shared command stream of one frame: encoder, presentable image and
/// depth target, plus the handles renderers need to upload their data.
pub struct GpuStream {
    frame: GpuFrame,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
    viewport: Viewport,
}

impl GpuStream {
    /// Device/queue/format context for pipeline creation and buffer uploads.
    pub fn ctx(&self) -> RenderCtx<'_> {
        RenderCtx::new(
            &self.device,
            &self.queue,
            self.surface_format,
            self.depth_format,
            self.viewport,
        )
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Opens a render pass over the shared targets with the given load actions.
    pub fn begin_pass(&mut self, label: &str, targets: &PassTargets) -> wgpu::RenderPass<'_> {
        self.frame
            .encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.frame.color_view,
                    resolve_target: None,
                    ops: targets.color_ops(),
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.frame.depth_view,
                    depth_ops: Some(targets.depth_ops()),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            })
    }
}

/// [`PresentSurface`] over a window's swap chain.
///
/// Borrowed for the duration of one redraw callback.
pub struct GpuSurface<'a, 'w> {
    gpu: &'a mut Gpu<'w>,
    window: &'a Window,
    viewport: Viewport,
}

impl<'a, 'w> GpuSurface<'a, 'w> {
    pub fn new(gpu: &'a mut Gpu<'w>, window: &'a Window, viewport: Viewport) -> Self {
        Self {
            gpu,
            window,
            viewport,
        }
    }
}

impl PresentSurface for GpuSurface<'_, '_> {
    type Stream = GpuStream;

    fn maintain(&mut self) {
        self.gpu.poll();
    }

    fn begin_stream(&mut self) -> Result<GpuStream, SurfaceErrorAction> {
        // Minimized windows have nothing to draw into.
        if !self.viewport.is_valid() {
            return Err(SurfaceErrorAction::SkipFrame);
        }

        let frame = match self.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => return Err(self.gpu.handle_surface_error(err)),
        };

        Ok(GpuStream {
            frame,
            device: self.gpu.device().clone(),
            queue: self.gpu.queue().clone(),
            surface_format: self.gpu.surface_format(),
            depth_format: self.gpu.depth_format(),
            viewport: self.viewport,
        })
    }

    fn clear_stream(&mut self, stream: &mut GpuStream, targets: &PassTargets) {
        let _pass = stream.begin_pass("puppet clear", targets);
    }

    fn submit(&mut self, stream: GpuStream, on_complete: CompletionCallback) {
        self.window.pre_present_notify();
        self.gpu.submit(stream.frame, on_complete);
    }

    fn prepare_next(&mut self) {
        self.window.request_redraw();
    }
}
