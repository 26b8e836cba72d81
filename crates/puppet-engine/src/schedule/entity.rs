use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::coords::Rect;
use crate::render::PassTargets;

use super::FrameSlot;

/// Shared handle to a tracked entity. The registry references entities; it
/// does not own their pose state.
pub type SharedEntity<E> = Rc<RefCell<E>>;

/// Shared handle to the renderer paired with an entity.
pub type SharedRenderer<R> = Rc<RefCell<R>>;

/// Selects which bones contribute to an entity's bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BoneFilter {
    #[default]
    All,
    Only(HashSet<String>),
    Except(HashSet<String>),
}

impl BoneFilter {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(names.into_iter().map(Into::into).collect())
    }

    pub fn except<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Except(names.into_iter().map(Into::into).collect())
    }

    pub fn accepts(&self, bone: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.contains(bone),
            Self::Except(names) => !names.contains(bone),
        }
    }
}

/// An animated, posable object drawn by the scheduler.
///
/// The scheduler never looks inside the pose; it only advances it and asks
/// for bounds.
pub trait Entity {
    /// Unique key within a registry.
    fn name(&self) -> &str;

    /// Advances the pose by `delta` seconds of playback time.
    fn update(&mut self, delta: f32);

    /// Bounds of the bones accepted by `filter`, in logical pixels.
    fn bounds(&self, filter: &BoneFilter) -> Rect;
}

/// Draws one entity into the shared command stream `S`.
///
/// A renderer is told which frame slot to use right before each draw and
/// must only touch the resources of that slot for this frame.
pub trait EntityRenderer<S> {
    fn set_slot_index(&mut self, slot: FrameSlot);

    fn bone_filter(&self) -> &BoneFilter;

    /// Records this entity's draw. `targets` are already configured for the
    /// entity's position in the draw order.
    fn draw(&mut self, targets: &PassTargets, stream: &mut S);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_variants() {
        assert!(BoneFilter::All.accepts("spine"));

        let only = BoneFilter::only(["head", "spine"]);
        assert!(only.accepts("head"));
        assert!(!only.accepts("tail"));

        let except = BoneFilter::except(["tail"]);
        assert!(except.accepts("head"));
        assert!(!except.accepts("tail"));
    }
}
