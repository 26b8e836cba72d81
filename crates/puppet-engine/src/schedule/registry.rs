use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::core::SchedulingContext;

use super::{Entity, SharedEntity, SharedRenderer};

/// An entity together with its renderer.
pub struct Binding<E, R> {
    pub entity: SharedEntity<E>,
    pub renderer: SharedRenderer<R>,
}

impl<E, R> Clone for Binding<E, R> {
    fn clone(&self) -> Self {
        Self {
            entity: Rc::clone(&self.entity),
            renderer: Rc::clone(&self.renderer),
        }
    }
}

struct Slot<E, R> {
    binding: Binding<E, R>,
    seq: u64,
}

/// Name-keyed set of (entity, renderer) pairs.
///
/// Lookups and removal are O(1) amortized. Snapshots come back in insertion
/// order so ties in the draw-order sort stay deterministic; re-adding a name
/// moves it to the end.
pub struct EntityRegistry<E, R> {
    context: SchedulingContext,
    entries: HashMap<String, Slot<E, R>>,
    next_seq: u64,
}

impl<E: Entity, R> EntityRegistry<E, R> {
    pub fn new(context: SchedulingContext) -> Self {
        Self {
            context,
            entries: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Binds `entity` under its name, replacing any existing binding.
    ///
    /// Returns the replaced binding, if there was one.
    pub fn add(&mut self, entity: SharedEntity<E>, renderer: R) -> Option<Binding<E, R>> {
        self.context.assert_current("EntityRegistry::add");

        let name = entity.borrow().name().to_owned();
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);

        let slot = Slot {
            binding: Binding {
                entity,
                renderer: Rc::new(RefCell::new(renderer)),
            },
            seq,
        };

        self.entries.insert(name, slot).map(|old| old.binding)
    }

    /// Removes the binding for `name`. Returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.context.assert_current("EntityRegistry::remove");
        self.entries.remove(name).is_some()
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Binding<E, R>> {
        self.entries.get(name).map(|slot| slot.binding.clone())
    }

    /// Snapshot of every binding in insertion order.
    ///
    /// Later registry mutations do not affect a snapshot already taken.
    pub fn all(&self) -> Vec<Binding<E, R>> {
        let mut slots: Vec<&Slot<E, R>> = self.entries.values().collect();
        slots.sort_by_key(|slot| slot.seq);
        slots.into_iter().map(|slot| slot.binding.clone()).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
