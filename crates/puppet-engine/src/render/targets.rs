use crate::paint::Color;

/// What happens to the shared color target when a pass begins.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ColorLoad {
    /// Overwrite with the given color.
    Clear(Color),
    /// Keep what earlier passes in the same stream drew.
    Load,
}

/// What happens to the shared depth target when a pass begins.
///
/// Depth is cleared on every pass; it only orders geometry within one entity.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DepthLoad {
    Clear(f32),
}

/// Load configuration of the shared color + depth targets for one draw.
///
/// The first draw of a stream clears; every later draw loads the color target
/// so all entities composite into the same image.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PassTargets {
    pub color: ColorLoad,
    pub depth: DepthLoad,
}

impl PassTargets {
    pub const DEPTH_CLEAR: f32 = 1.0;

    /// Targets for the first draw of a stream.
    #[inline]
    pub fn clearing(color: Color) -> Self {
        Self {
            color: ColorLoad::Clear(color),
            depth: DepthLoad::Clear(Self::DEPTH_CLEAR),
        }
    }

    /// Same targets with the color load switched to `Load`.
    #[inline]
    pub fn then_load(self) -> Self {
        Self {
            color: ColorLoad::Load,
            ..self
        }
    }

    #[inline]
    pub fn clears_color(&self) -> bool {
        matches!(self.color, ColorLoad::Clear(_))
    }

    pub fn color_ops(&self) -> wgpu::Operations<wgpu::Color> {
        let load = match self.color {
            ColorLoad::Clear(c) => wgpu::LoadOp::Clear(c.to_wgpu()),
            ColorLoad::Load => wgpu::LoadOp::Load,
        };
        wgpu::Operations {
            load,
            store: wgpu::StoreOp::Store,
        }
    }

    pub fn depth_ops(&self) -> wgpu::Operations<f32> {
        let DepthLoad::Clear(d) = self.depth;
        let load = wgpu::LoadOp::Clear(d);
        wgpu::Operations {
            load,
            store: wgpu::StoreOp::Store,
        }
    }
}
