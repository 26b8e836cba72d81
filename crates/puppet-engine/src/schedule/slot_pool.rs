use core::fmt;

use crate::core::SchedulingContext;

/// Buffering depth: how many frames the CPU may prepare ahead of the GPU.
///
/// Shared by the slot pool and by every renderer that keeps per-slot
/// resources; both must be rebuilt together when this changes.
pub const FRAMES_IN_FLIGHT: usize = 3;

/// Exclusive, time-bounded ownership of one set of per-frame resources.
///
/// Only [`FrameSlotPool`] hands these out. The index is in `0..FRAMES_IN_FLIGHT`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct FrameSlot(u8);

impl FrameSlot {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FrameSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}

/// Fixed pool of [`FRAMES_IN_FLIGHT`] frame slots.
///
/// `acquire` never blocks: exhaustion yields `None` and the caller skips the
/// frame. Each acquired slot must be released exactly once; a second release
/// is a broken invariant and panics.
#[derive(Debug)]
pub struct FrameSlotPool {
    context: SchedulingContext,
    in_use: [bool; FRAMES_IN_FLIGHT],
}

impl FrameSlotPool {
    /// Creates a pool with every slot free.
    pub fn new(context: SchedulingContext) -> Self {
        Self {
            context,
            in_use: [false; FRAMES_IN_FLIGHT],
        }
    }

    /// Takes the lowest free slot, if any.
    pub fn acquire(&mut self) -> Option<FrameSlot> {
        self.context.assert_current("FrameSlotPool::acquire");

        let index = self.in_use.iter().position(|used| !used)?;
        self.in_use[index] = true;
        Some(FrameSlot(index as u8))
    }

    /// Returns `slot` to the free set.
    ///
    /// # Panics
    /// Panics if `slot` is not currently acquired.
    #[track_caller]
    pub fn release(&mut self, slot: FrameSlot) {
        self.context.assert_current("FrameSlotPool::release");

        let used = &mut self.in_use[slot.index()];
        assert!(*used, "{slot} released twice");
        *used = false;
    }

    /// Slots currently owned by in-flight frames.
    pub fn in_flight(&self) -> usize {
        self.in_use.iter().filter(|used| **used).count()
    }

    pub fn free(&self) -> usize {
        FRAMES_IN_FLIGHT - self.in_flight()
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        FRAMES_IN_FLIGHT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> FrameSlotPool {
        FrameSlotPool::new(SchedulingContext::current())
    }

    #[test]
    fn hands_out_each_slot_once() {
        let mut p = pool();
        let slots: Vec<_> = (0..FRAMES_IN_FLIGHT).filter_map(|_| p.acquire()).collect();
        assert_eq!(slots.len(), FRAMES_IN_FLIGHT);

        let mut indices: Vec<_> = slots.iter().map(|s| s.index()).collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..FRAMES_IN_FLIGHT).collect::<Vec<_>>());
    }

    #[test]
    fn exhaustion_returns_none_then_recovers() {
        let mut p = pool();
        let a = p.acquire().unwrap();
        let _b = p.acquire().unwrap();
        let _c = p.acquire().unwrap();
        assert!(p.acquire().is_none());
        assert_eq!(p.in_flight(), 3);

        p.release(a);
        assert_eq!(p.free(), 1);
        assert_eq!(p.acquire(), Some(a));
        assert!(p.acquire().is_none());
    }

    #[test]
    fn in_flight_never_exceeds_capacity() {
        let mut p = pool();
        let mut held = Vec::new();
        // Interleave acquire/release; a release always targets a held slot.
        for step in 0..64 {
            if step % 3 == 2 {
                if let Some(slot) = held.pop() {
                    p.release(slot);
                }
            } else if let Some(slot) = p.acquire() {
                held.push(slot);
            } else {
                assert_eq!(held.len(), FRAMES_IN_FLIGHT);
            }
            assert!(p.in_flight() <= p.capacity());
            assert_eq!(p.in_flight(), held.len());
        }
    }

    #[test]
    #[should_panic(expected = "released twice")]
    fn double_release_panics() {
        let mut p = pool();
        let slot = p.acquire().unwrap();
        p.release(slot);
        p.release(slot);
    }
}
