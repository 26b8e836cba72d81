use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use puppet_engine::paint::Color;
use puppet_engine::render::{
    premul_alpha_blend, GpuStream, PassTargets, QuadVertex, RenderCtx, ViewportUniform,
    QUAD_INDICES, QUAD_VERTICES,
};
use puppet_engine::schedule::{
    BoneFilter, EntityRenderer, FrameSlot, SharedEntity, FRAMES_IN_FLIGHT,
};

use crate::marionette::Marionette;

/// Draws one marionette as a set of shaded bone quads.
///
/// Geometry is provided as logical pixels, converted to NDC in the vertex shader using viewport.
/// Instance data lives in one buffer per frame slot so a frame still on the GPU
/// never sees the next frame's upload.
pub struct BoneRenderer {
    entity: SharedEntity<Marionette>,
    filter: BoneFilter,
    slot_index: usize,

    pipeline_formats: Option<(wgpu::TextureFormat, wgpu::TextureFormat)>,
    pipeline: Option<wgpu::RenderPipeline>,

    bind_group_layout: Option<wgpu::BindGroupLayout>,
    bind_group: Option<wgpu::BindGroup>,
    viewport_ubo: Option<wgpu::Buffer>,

    quad_vbo: Option<wgpu::Buffer>,
    quad_ibo: Option<wgpu::Buffer>,

    instances: [SlotBuffer; FRAMES_IN_FLIGHT],
}

#[derive(Default)]
struct SlotBuffer {
    vbo: Option<wgpu::Buffer>,
    capacity: usize,
}

impl BoneRenderer {
    pub fn new(entity: &SharedEntity<Marionette>) -> Self {
        Self::with_filter(entity, BoneFilter::All)
    }

    /// Renderer whose bounds (and so draw order) only consider `filter`'s bones.
    pub fn with_filter(entity: &SharedEntity<Marionette>, filter: BoneFilter) -> Self {
        Self {
            entity: entity.clone(),
            filter,
            slot_index: 0,
            pipeline_formats: None,
            pipeline: None,
            bind_group_layout: None,
            bind_group: None,
            viewport_ubo: None,
            quad_vbo: None,
            quad_ibo: None,
            instances: Default::default(),
        }
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        let formats = (ctx.surface_format, ctx.depth_format);
        if self.pipeline_formats == Some(formats) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("puppet bone shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/bone.wgsl").into()),
        });

        let bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("puppet bone bgl"),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: Some(ViewportUniform::min_binding_size()),
                        },
                        count: None,
                    }],
                });

        let pipeline_layout =
            ctx.device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("puppet bone pipeline layout"),
                    bind_group_layouts: &[&bind_group_layout],
                    immediate_size: 0,
                });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("puppet bone pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout(), BoneInstance::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            // Depth is cleared per entity; it only orders bones within one figure.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: ctx.depth_format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),

            multiview_mask: None,
            cache: None,
        });

        log::debug!("bone pipeline built for {:?}/{:?}", formats.0, formats.1);

        self.pipeline_formats = Some(formats);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);

        self.bind_group = None;
        self.viewport_ubo = None;
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>) {
        if self.bind_group.is_some() && self.viewport_ubo.is_some() {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };

        let viewport_ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("puppet bone viewport ubo"),
            size: std::mem::size_of::<ViewportUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("puppet bone bind group"),
            layout: bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: viewport_ubo.as_entire_binding(),
            }],
        });

        self.viewport_ubo = Some(viewport_ubo);
        self.bind_group = Some(bind_group);
    }

    fn ensure_static_buffers(&mut self, ctx: &RenderCtx<'_>) {
        if self.quad_vbo.is_some() && self.quad_ibo.is_some() {
            return;
        }

        self.quad_vbo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("puppet bone quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        }));

        self.quad_ibo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("puppet bone quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        }));
    }

    fn write_viewport_uniform(&self, ctx: &RenderCtx<'_>) {
        let Some(ubo) = self.viewport_ubo.as_ref() else { return };
        let u = ViewportUniform::new(ctx.viewport);
        ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&u));
    }

    fn upload_instances(&mut self, ctx: &RenderCtx<'_>, instances: &[BoneInstance]) {
        let slot = &mut self.instances[self.slot_index];

        if instances.len() > slot.capacity || slot.vbo.is_none() {
            let new_cap = instances.len().next_power_of_two().max(16);
            slot.vbo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("puppet bone instance vbo"),
                size: (new_cap * std::mem::size_of::<BoneInstance>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            slot.capacity = new_cap;
        }

        if let Some(vbo) = slot.vbo.as_ref() {
            ctx.queue.write_buffer(vbo, 0, bytemuck::cast_slice(instances));
        }
    }
}

impl EntityRenderer<GpuStream> for BoneRenderer {
    fn set_slot_index(&mut self, slot: FrameSlot) {
        self.slot_index = slot.index();
    }

    fn bone_filter(&self) -> &BoneFilter {
        &self.filter
    }

    fn draw(&mut self, targets: &PassTargets, stream: &mut GpuStream) {
        let instances = bone_instances(&self.entity.borrow());

        {
            let ctx = stream.ctx();
            self.ensure_pipeline(&ctx);
            self.ensure_static_buffers(&ctx);
            self.ensure_bindings(&ctx);
            self.write_viewport_uniform(&ctx);
            if !instances.is_empty() {
                self.upload_instances(&ctx, &instances);
            }
        }

        // The pass is opened even with nothing to draw so its load ops still apply.
        let mut rpass = stream.begin_pass("puppet bone pass", targets);
        if instances.is_empty() {
            return;
        }

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(bind_group) = self.bind_group.as_ref() else { return };
        let Some(quad_vbo) = self.quad_vbo.as_ref() else { return };
        let Some(quad_ibo) = self.quad_ibo.as_ref() else { return };
        let Some(instance_vbo) = self.instances[self.slot_index].vbo.as_ref() else { return };

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, quad_vbo.slice(..));
        rpass.set_vertex_buffer(1, instance_vbo.slice(..));
        rpass.set_index_buffer(quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..6, 0, 0..instances.len() as u32);
    }
}

/// Builds per-bone instance data. Later bones sit in front of earlier ones.
fn bone_instances(marionette: &Marionette) -> Vec<BoneInstance> {
    let segments = marionette.segments();
    let count = segments.len().max(1) as f32;
    let tint = marionette.tint();

    segments
        .iter()
        .enumerate()
        .map(|(i, seg)| {
            // Deeper links fade slightly.
            let color: Color = tint.with_alpha_scaled(1.0 - 0.1 * i as f32 / count);
            BoneInstance {
                start: [seg.start.x, seg.start.y],
                end: [seg.end.x, seg.end.y],
                thickness_depth: [seg.thickness, 0.9 - 0.8 * i as f32 / count],
                color: color.to_array(),
            }
        })
        .collect()
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct BoneInstance {
    start: [f32; 2],
    end: [f32; 2],
    thickness_depth: [f32; 2],
    color: [f32; 4],
}

impl BoneInstance {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        1 => Float32x2, // start
        2 => Float32x2, // end
        3 => Float32x2, // thickness, depth
        4 => Float32x4  // color
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<BoneInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use puppet_engine::coords::Vec2;
    use puppet_engine::core::SchedulingContext;
    use puppet_engine::schedule::FrameSlotPool;

    use super::*;
    use crate::marionette::Bone;

    fn shared(m: Marionette) -> SharedEntity<Marionette> {
        Rc::new(RefCell::new(m))
    }

    #[test]
    fn one_instance_per_bone_front_to_back() {
        let m = Marionette::new("m", Vec2::new(0.0, 0.0), Color::from_premul(0.5, 0.5, 0.5, 1.0))
            .with_bone(Bone::new("a", 10.0, 4.0, 0.0, 0.0))
            .with_bone(Bone::new("b", 10.0, 4.0, 0.0, 0.0));

        let inst = bone_instances(&m);
        assert_eq!(inst.len(), 2);
        assert_eq!(inst[0].end, inst[1].start);
        assert!(inst[1].thickness_depth[1] < inst[0].thickness_depth[1]);
        assert!(inst.iter().all(|i| i.color[0] <= i.color[3]));
    }

    #[test]
    fn boneless_marionette_has_no_instances() {
        let m = Marionette::new("m", Vec2::zero(), Color::transparent());
        assert!(bone_instances(&m).is_empty());
    }

    #[test]
    fn filter_and_slot_are_tracked() {
        let entity = shared(Marionette::new("m", Vec2::zero(), Color::transparent()));
        let mut r = BoneRenderer::with_filter(&entity, BoneFilter::only(["head"]));
        assert!(r.bone_filter().accepts("head"));
        assert!(!r.bone_filter().accepts("tail"));

        let mut pool = FrameSlotPool::new(SchedulingContext::current());
        pool.acquire();
        let second = pool.acquire().expect("free slot");
        r.set_slot_index(second);
        assert_eq!(r.slot_index, 1);
    }

    #[test]
    fn instance_stride_matches_attributes() {
        assert_eq!(std::mem::size_of::<BoneInstance>(), 40);
    }
}
