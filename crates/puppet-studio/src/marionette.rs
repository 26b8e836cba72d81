use puppet_engine::coords::{Rect, Vec2};
use puppet_engine::paint::Color;
use puppet_engine::schedule::{BoneFilter, Entity};

/// One link of a marionette's chain.
#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    pub length: f32,
    pub thickness: f32,
    /// Angle relative to the parent bone, radians. Zero hangs straight down.
    pub rest_angle: f32,
    /// Peak swing around `rest_angle`, radians.
    pub sway: f32,
}

impl Bone {
    pub fn new(name: &str, length: f32, thickness: f32, rest_angle: f32, sway: f32) -> Self {
        Self {
            name: name.to_owned(),
            length,
            thickness,
            rest_angle,
            sway,
        }
    }
}

/// World-space placement of a bone for the current pose.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoneSegment<'a> {
    pub name: &'a str,
    pub start: Vec2,
    pub end: Vec2,
    pub thickness: f32,
}

/// A chain of bones hanging from a bobbing anchor.
///
/// The pose is a pure function of accumulated playback time, so pausing or
/// changing speed only changes how fast `elapsed` grows.
#[derive(Debug, Clone)]
pub struct Marionette {
    name: String,
    anchor: Vec2,
    bob: f32,
    phase: f32,
    tint: Color,
    bones: Vec<Bone>,
    elapsed: f32,
}

const SWAY_RATE: f32 = 1.7;
const BOB_RATE: f32 = 0.6;

impl Marionette {
    pub fn new(name: &str, anchor: Vec2, tint: Color) -> Self {
        Self {
            name: name.to_owned(),
            anchor,
            bob: 0.0,
            phase: 0.0,
            tint,
            bones: Vec::new(),
            elapsed: 0.0,
        }
    }

    /// Default figure: torso, neck, head, and a dangling tail.
    pub fn figure(name: &str, anchor: Vec2, tint: Color, phase: f32) -> Self {
        Self::new(name, anchor, tint)
            .with_bob(60.0)
            .with_phase(phase)
            .with_bone(Bone::new("torso", 90.0, 26.0, 0.0, 0.20))
            .with_bone(Bone::new("neck", 30.0, 12.0, 0.15, 0.25))
            .with_bone(Bone::new("head", 36.0, 34.0, -0.10, 0.30))
            .with_bone(Bone::new("tail", 60.0, 8.0, 0.60, 0.45))
    }

    pub fn with_bone(mut self, bone: Bone) -> Self {
        self.bones.push(bone);
        self
    }

    /// Vertical bob amplitude of the anchor, logical pixels.
    pub fn with_bob(mut self, amplitude: f32) -> Self {
        self.bob = amplitude;
        self
    }

    pub fn with_phase(mut self, phase: f32) -> Self {
        self.phase = phase;
        self
    }

    #[inline]
    pub fn tint(&self) -> Color {
        self.tint
    }

    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    /// Current anchor position, including bob.
    pub fn anchor(&self) -> Vec2 {
        let t = self.elapsed * BOB_RATE + self.phase;
        Vec2::new(self.anchor.x, self.anchor.y + self.bob * t.sin())
    }

    /// Bones placed for the current pose, root first.
    pub fn segments(&self) -> Vec<BoneSegment<'_>> {
        let mut out = Vec::with_capacity(self.bones.len());
        let mut joint = self.anchor();
        let mut angle = 0.0f32;

        for (i, bone) in self.bones.iter().enumerate() {
            let swing = (self.elapsed * SWAY_RATE + self.phase + i as f32 * 0.8).sin();
            angle += bone.rest_angle + bone.sway * swing;

            // Zero angle points down (+Y).
            let end = joint + Vec2::new(-angle.sin(), angle.cos()) * bone.length;
            out.push(BoneSegment {
                name: &bone.name,
                start: joint,
                end,
                thickness: bone.thickness,
            });
            joint = end;
        }
        out
    }
}

impl Entity for Marionette {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self, delta: f32) {
        self.elapsed += delta;
    }

    fn bounds(&self, filter: &BoneFilter) -> Rect {
        let segments = self.segments();
        let accepted: Vec<&BoneSegment<'_>> =
            segments.iter().filter(|s| filter.accepts(s.name)).collect();

        let pad = accepted
            .iter()
            .map(|s| s.thickness * 0.5)
            .fold(0.0f32, f32::max);

        let points = accepted.iter().flat_map(|s| [s.start, s.end]);
        match Rect::from_points(points) {
            Some(r) => r.inflate(pad),
            // No accepted bones: a point at the anchor.
            None => Rect::from_origin_size(self.anchor(), Vec2::zero()),
        }
    }
}
