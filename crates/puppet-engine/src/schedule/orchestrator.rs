use std::cell::RefCell;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::core::SchedulingContext;
use crate::device::SurfaceErrorAction;
use crate::paint::Color;
use crate::render::PassTargets;
use crate::time::{FrameRateTracker, PlaybackClock, SystemTimeSource, TimeSource};

use super::{
    Binding, CompletionQueue, CompletionSender, Entity, EntityRegistry, EntityRenderer,
    FrameSlot, FrameSlotPool, PresentSurface, SharedEntity, SharedRenderer,
};

/// Builds the renderer paired with a newly added entity.
pub type RendererFactory<E, R> = Box<dyn Fn(&SharedEntity<E>) -> R>;

/// Caller-supplied reordering of the sorted draw list.
///
/// Receives entities only (never renderers) and may permute them in place.
pub type DrawOrderHook<E> = Box<dyn FnMut(&mut [SharedEntity<E>])>;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Color the shared target is cleared to by the first draw of each frame.
    pub clear_color: Color,
    /// Query and publish the frame rate at the start of every tick.
    pub show_frame_rate: bool,
    /// Initial playback speed multiplier.
    pub initial_speed: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            clear_color: Color::from_srgb(0.08, 0.08, 0.10, 1.0),
            show_frame_rate: false,
            initial_speed: 1.0,
        }
    }
}

/// Why a tick ended without drawing.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameSkip {
    /// Every frame slot is still owned by an in-flight frame.
    NoFreeSlot,
    /// The surface could not provide a presentable image this tick.
    Surface(SurfaceErrorAction),
}

/// Result of one tick.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TickOutcome {
    /// A stream was submitted; `drawn` entities were recorded into it.
    Presented { slot: FrameSlot, drawn: usize },
    /// Nothing was drawn and the clock did not advance.
    Skipped(FrameSkip),
    /// The surface failed unrecoverably; the host should shut down.
    Fatal,
}

/// Frame scheduler.
///
/// Driven once per display refresh. Each tick it:
/// 1. delivers finished frames (releasing their slots, recording their timestamps)
///    and optionally publishes the frame rate
/// 2. acquires a frame slot and a presentable image, or skips the tick
/// 3. cuts the playback clock and pushes the delta to every entity
/// 4. orders entities back-to-front by bounds, then through the reorder hook
/// 5. records every renderer into one shared stream, submits it, and arranges
///    for the slot to be released when the GPU is done
///
/// All state lives on the scheduling context captured at construction. The only
/// thing that crosses threads is the completion message, which is drained back
/// on that context.
pub struct RenderOrchestrator<St, E, R, T = SystemTimeSource>
where
    T: TimeSource,
{
    context: SchedulingContext,
    pool: FrameSlotPool,
    frame_rate: FrameRateTracker,
    clock: PlaybackClock<T>,
    registry: EntityRegistry<E, R>,
    factory: RendererFactory<E, R>,
    reorder: Option<DrawOrderHook<E>>,

    completions: CompletionQueue,
    completion_tx: CompletionSender,

    clear_color: Color,
    show_frame_rate: bool,
    published_fps: Option<usize>,
    fps_listener: Option<Box<dyn FnMut(usize)>>,

    playing: bool,
    attached: bool,

    _stream: PhantomData<fn(&mut St)>,
}

impl<St, E, R> RenderOrchestrator<St, E, R, SystemTimeSource>
where
    E: Entity,
    R: EntityRenderer<St>,
{
    /// Creates a scheduler bound to the calling thread, sampling real time.
    pub fn new<F>(factory: F, config: SchedulerConfig) -> Self
    where
        F: Fn(&SharedEntity<E>) -> R + 'static,
    {
        Self::with_time_source(factory, config, SystemTimeSource)
    }
}

impl<St, E, R, T> RenderOrchestrator<St, E, R, T>
where
    E: Entity,
    R: EntityRenderer<St>,
    T: TimeSource,
{
    /// Creates a scheduler bound to the calling thread, sampling `source`.
    pub fn with_time_source<F>(factory: F, config: SchedulerConfig, source: T) -> Self
    where
        F: Fn(&SharedEntity<E>) -> R + 'static,
    {
        let context = SchedulingContext::current();
        let (completion_tx, completions) = CompletionQueue::channel();

        let mut clock = PlaybackClock::with_source(source);
        clock.set_speed(config.initial_speed);

        Self {
            context,
            pool: FrameSlotPool::new(context),
            frame_rate: FrameRateTracker::new(context),
            clock,
            registry: EntityRegistry::new(context),
            factory: Box::new(factory),
            reorder: None,
            completions,
            completion_tx,
            clear_color: config.clear_color,
            show_frame_rate: config.show_frame_rate,
            published_fps: None,
            fps_listener: None,
            playing: false,
            attached: false,
            _stream: PhantomData,
        }
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    /// Starts playback. When this transitions to playing on an attached
    /// surface, one tick runs immediately.
    pub fn play<S>(&mut self, surface: &mut S) -> Option<TickOutcome>
    where
        S: PresentSurface<Stream = St>,
    {
        self.context.assert_current("RenderOrchestrator::play");

        if self.playing {
            return None;
        }
        self.playing = true;
        self.clock.start();
        log::info!("playback started");

        self.attached.then(|| self.tick(surface))
    }

    /// Stops clock advancement. Frames already submitted still complete.
    pub fn pause(&mut self) {
        self.context.assert_current("RenderOrchestrator::pause");

        if !self.playing {
            return;
        }
        self.playing = false;
        self.clock.pause();
        log::info!("playback paused");
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Subscribes to display refresh. Does not change `is_playing`.
    pub fn attach(&mut self) {
        self.context.assert_current("RenderOrchestrator::attach");
        if !self.attached {
            self.attached = true;
            log::info!("attached to display");
        }
    }

    /// Unsubscribes from display refresh. Does not change `is_playing`.
    pub fn detach(&mut self) {
        self.context.assert_current("RenderOrchestrator::detach");
        if self.attached {
            self.attached = false;
            log::info!("detached from display");
        }
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Display refresh signal. Ticks only while attached and playing.
    pub fn on_display_refresh<S>(&mut self, surface: &mut S) -> Option<TickOutcome>
    where
        S: PresentSurface<Stream = St>,
    {
        if self.attached && self.playing {
            Some(self.tick(surface))
        } else {
            // Keep recycling slots while idle.
            surface.maintain();
            self.pump_completions();
            None
        }
    }

    // ── playback speed / frame rate ───────────────────────────────────────

    #[inline]
    pub fn speed(&self) -> f64 {
        self.clock.speed()
    }

    /// Sets the playback multiplier (>= 0); applies from the next tick.
    #[track_caller]
    pub fn set_speed(&mut self, speed: f64) {
        self.clock.set_speed(speed);
    }

    #[inline]
    pub fn show_frame_rate(&self) -> bool {
        self.show_frame_rate
    }

    pub fn set_show_frame_rate(&mut self, show: bool) {
        self.show_frame_rate = show;
        if !show {
            self.published_fps = None;
        }
    }

    /// Receives the frame rate every tick while reporting is enabled.
    pub fn set_frame_rate_listener<F>(&mut self, listener: F)
    where
        F: FnMut(usize) + 'static,
    {
        self.fps_listener = Some(Box::new(listener));
    }

    /// Last frame rate published, if reporting is enabled.
    #[inline]
    pub fn published_frame_rate(&self) -> Option<usize> {
        self.published_fps
    }

    pub fn frame_rate_tracker(&self) -> &FrameRateTracker {
        &self.frame_rate
    }

    pub fn clock(&self) -> &PlaybackClock<T> {
        &self.clock
    }

    // ── entities ──────────────────────────────────────────────────────────

    /// Registers `entity` with a fresh renderer, replacing any entity with the
    /// same name. Returns whether a binding was replaced.
    pub fn add(&mut self, entity: SharedEntity<E>) -> bool {
        let renderer = (self.factory)(&entity);
        let replaced = self.registry.add(entity, renderer);
        replaced.is_some()
    }

    /// Removes the entity's binding; takes effect from the next tick.
    pub fn remove(&mut self, entity: &SharedEntity<E>) -> bool {
        let name = entity.borrow().name().to_owned();
        self.remove_named(&name)
    }

    pub fn remove_named(&mut self, name: &str) -> bool {
        self.registry.remove(name)
    }

    pub fn contains(&self, entity: &SharedEntity<E>) -> bool {
        self.registry.contains(entity.borrow().name())
    }

    pub fn contains_named(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    /// Snapshot of the tracked entities, in insertion order.
    pub fn presented_entities(&self) -> Vec<SharedEntity<E>> {
        self.registry
            .all()
            .into_iter()
            .map(|binding| binding.entity)
            .collect()
    }

    pub fn set_draw_order_hook<F>(&mut self, hook: F)
    where
        F: FnMut(&mut [SharedEntity<E>]) + 'static,
    {
        self.reorder = Some(Box::new(hook));
    }

    pub fn clear_draw_order_hook(&mut self) {
        self.reorder = None;
    }

    // ── slots ─────────────────────────────────────────────────────────────

    #[inline]
    pub fn in_flight(&self) -> usize {
        self.pool.in_flight()
    }

    #[inline]
    pub fn free_slots(&self) -> usize {
        self.pool.free()
    }

    /// Applies every pending frame completion: releases its slot and records
    /// its timestamp. Returns how many were applied.
    pub fn pump_completions(&mut self) -> usize {
        self.context
            .assert_current("RenderOrchestrator::pump_completions");

        let batch = self.completions.drain();
        for completion in &batch {
            self.pool.release(completion.slot);
            self.frame_rate.record(completion.completed_at);
        }
        batch.len()
    }

    // ── tick ──────────────────────────────────────────────────────────────

    /// Runs one frame.
    ///
    /// # Panics
    /// Panics off the scheduling context, or if an entity in the final draw
    /// order is no longer registered.
    pub fn tick<S>(&mut self, surface: &mut S) -> TickOutcome
    where
        S: PresentSurface<Stream = St>,
    {
        self.context.assert_current("RenderOrchestrator::tick");

        surface.maintain();
        self.pump_completions();

        if self.show_frame_rate {
            self.publish_frame_rate();
        }

        let Some(slot) = self.pool.acquire() else {
            log::warn!(
                "skipping frame: all {} frame slots in flight",
                self.pool.capacity()
            );
            return TickOutcome::Skipped(FrameSkip::NoFreeSlot);
        };

        let mut stream = match surface.begin_stream() {
            Ok(stream) => stream,
            Err(action) => {
                // Nothing was submitted for this slot.
                self.pool.release(slot);
                if action == SurfaceErrorAction::Fatal {
                    log::error!("surface failed unrecoverably");
                    return TickOutcome::Fatal;
                }
                log::debug!("skipping frame: surface unavailable ({action:?})");
                return TickOutcome::Skipped(FrameSkip::Surface(action));
            }
        };

        if self.playing {
            self.clock.cut_current_frame_time();
        } else {
            self.clock.pause();
        }
        let delta = self.clock.delta() as f32;

        let bindings = self.registry.all();
        for binding in &bindings {
            binding.entity.borrow_mut().update(delta);
        }

        let order = self.draw_order(&bindings);
        let renderers = self.resolve_renderers(&order);

        log::trace!(
            "{slot}: delta={delta:.4}s order={:?}",
            order
                .iter()
                .map(|e| e.borrow().name().to_owned())
                .collect::<Vec<_>>()
        );

        let first = PassTargets::clearing(self.clear_color);
        if renderers.is_empty() {
            surface.clear_stream(&mut stream, &first);
        }

        for (i, renderer) in renderers.iter().enumerate() {
            let targets = if i == 0 { first } else { first.then_load() };
            let mut renderer = renderer.borrow_mut();
            renderer.set_slot_index(slot);
            renderer.draw(&targets, &mut stream);
        }

        surface.submit(stream, self.completion_tx.callback(slot));
        surface.prepare_next();

        TickOutcome::Presented {
            slot,
            drawn: renderers.len(),
        }
    }

    fn publish_frame_rate(&mut self) {
        let fps = self.frame_rate.frames_in_last_second();
        self.published_fps = Some(fps);
        if let Some(listener) = self.fps_listener.as_mut() {
            listener(fps);
        }
    }

    /// Back-to-front order: larger top bound first (stable), then the hook.
    fn draw_order(&mut self, bindings: &[Binding<E, R>]) -> Vec<SharedEntity<E>> {
        let mut keyed: Vec<(SharedEntity<E>, f32)> = bindings
            .iter()
            .map(|binding| {
                let renderer = binding.renderer.borrow();
                let top = binding.entity.borrow().bounds(renderer.bone_filter()).top();
                (Rc::clone(&binding.entity), top)
            })
            .collect();

        keyed.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut order: Vec<SharedEntity<E>> = keyed.into_iter().map(|(e, _)| e).collect();
        if let Some(hook) = self.reorder.as_mut() {
            hook(&mut order);
            assert_permutation(bindings, &order);
        }
        order
    }

    fn resolve_renderers(&self, order: &[SharedEntity<E>]) -> Vec<SharedRenderer<R>> {
        order
            .iter()
            .map(|entity| {
                let name = entity.borrow().name().to_owned();
                match self.registry.get(&name) {
                    Some(binding) => binding.renderer,
                    None => panic!(
                        "entity `{name}` vanished from the registry while its frame was being ordered"
                    ),
                }
            })
            .collect()
    }
}

/// Panics unless `order` holds every bound entity exactly once. The hook
/// cannot resize the slice, so a dropped entity always shows up as a repeat.
fn assert_permutation<E, R>(bindings: &[Binding<E, R>], order: &[SharedEntity<E>])
where
    E: Entity,
{
    let mut remaining: HashSet<*const RefCell<E>> = bindings
        .iter()
        .map(|binding| Rc::as_ptr(&binding.entity))
        .collect();
    for entity in order {
        if !remaining.remove(&Rc::as_ptr(entity)) {
            panic!(
                "draw-order hook repeated or introduced entity `{}`",
                entity.borrow().name()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::coords::Rect;
    use crate::render::ColorLoad;
    use crate::schedule::{BoneFilter, CompletionCallback, FRAMES_IN_FLIGHT};
    use crate::time::ManualTimeSource;

    // ── fixtures ──────────────────────────────────────────────────────────

    struct Puppet {
        name: String,
        top: f32,
        elapsed: f32,
        updates: u32,
    }

    impl Entity for Puppet {
        fn name(&self) -> &str {
            &self.name
        }

        fn update(&mut self, delta: f32) {
            self.elapsed += delta;
            self.updates += 1;
        }

        fn bounds(&self, _filter: &BoneFilter) -> Rect {
            Rect::new(0.0, self.top, 10.0, 10.0)
        }
    }

    fn puppet(name: &str, top: f32) -> SharedEntity<Puppet> {
        Rc::new(RefCell::new(Puppet {
            name: name.to_owned(),
            top,
            elapsed: 0.0,
            updates: 0,
        }))
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Draw {
        name: String,
        slot: FrameSlot,
        targets: PassTargets,
    }

    #[derive(Default)]
    struct Recorded {
        draws: Vec<Draw>,
        cleared: bool,
    }

    struct Marker {
        entity: SharedEntity<Puppet>,
        filter: BoneFilter,
        slot: Option<FrameSlot>,
    }

    impl EntityRenderer<Recorded> for Marker {
        fn set_slot_index(&mut self, slot: FrameSlot) {
            self.slot = Some(slot);
        }

        fn bone_filter(&self) -> &BoneFilter {
            &self.filter
        }

        fn draw(&mut self, targets: &PassTargets, stream: &mut Recorded) {
            stream.draws.push(Draw {
                name: self.entity.borrow().name.clone(),
                slot: self.slot.expect("slot set before draw"),
                targets: *targets,
            });
        }
    }

    #[derive(Default)]
    struct FakeSurface {
        fail_next: Option<SurfaceErrorAction>,
        pending: Vec<CompletionCallback>,
        presented: Vec<Recorded>,
        prepared: usize,
        maintained: usize,
        /// Fires every pending completion on `maintain`, as a device poll would.
        complete_on_maintain: bool,
    }

    impl FakeSurface {
        /// Fires the completion callback of the `i`-th pending submission.
        fn complete(&mut self, i: usize) {
            let callback = self.pending.remove(i);
            callback();
        }

        fn last(&self) -> &Recorded {
            self.presented.last().expect("a presented frame")
        }

        fn last_names(&self) -> Vec<String> {
            self.last().draws.iter().map(|d| d.name.clone()).collect()
        }
    }

    impl PresentSurface for FakeSurface {
        type Stream = Recorded;

        fn maintain(&mut self) {
            self.maintained += 1;
            if self.complete_on_maintain {
                for callback in self.pending.drain(..) {
                    callback();
                }
            }
        }

        fn begin_stream(&mut self) -> Result<Recorded, SurfaceErrorAction> {
            match self.fail_next.take() {
                Some(action) => Err(action),
                None => Ok(Recorded::default()),
            }
        }

        fn clear_stream(&mut self, stream: &mut Recorded, targets: &PassTargets) {
            assert!(targets.clears_color());
            stream.cleared = true;
        }

        fn submit(&mut self, stream: Recorded, on_complete: CompletionCallback) {
            self.presented.push(stream);
            self.pending.push(on_complete);
        }

        fn prepare_next(&mut self) {
            self.prepared += 1;
        }
    }

    type Scheduler = RenderOrchestrator<Recorded, Puppet, Marker, ManualTimeSource>;

    fn scheduler() -> (ManualTimeSource, Scheduler) {
        let time = ManualTimeSource::new();
        let s = RenderOrchestrator::with_time_source(
            |entity: &SharedEntity<Puppet>| Marker {
                entity: Rc::clone(entity),
                filter: BoneFilter::All,
                slot: None,
            },
            SchedulerConfig::default(),
            time.clone(),
        );
        (time, s)
    }

    // ── draw order ────────────────────────────────────────────────────────

    #[test]
    fn draws_descending_by_top_bound() {
        let (_, mut s) = scheduler();
        let mut surface = FakeSurface::default();
        s.add(puppet("ten", 10.0));
        s.add(puppet("five", 5.0));
        s.add(puppet("twenty", 20.0));

        let outcome = s.tick(&mut surface);
        assert!(matches!(outcome, TickOutcome::Presented { drawn: 3, .. }));
        assert_eq!(surface.last_names(), ["twenty", "ten", "five"]);
    }

    #[test]
    fn reorder_hook_sets_final_order() {
        let (_, mut s) = scheduler();
        let mut surface = FakeSurface::default();
        s.add(puppet("ten", 10.0));
        s.add(puppet("five", 5.0));
        s.add(puppet("twenty", 20.0));
        s.set_draw_order_hook(|entities| entities.reverse());

        s.tick(&mut surface);
        assert_eq!(surface.last_names(), ["five", "ten", "twenty"]);
    }

    #[test]
    #[should_panic(expected = "repeated or introduced entity `twenty`")]
    fn hook_duplicating_an_entity_panics() {
        let (_, mut s) = scheduler();
        let mut surface = FakeSurface::default();
        s.add(puppet("ten", 10.0));
        s.add(puppet("five", 5.0));
        s.add(puppet("twenty", 20.0));
        s.set_draw_order_hook(|entities| entities[1] = Rc::clone(&entities[0]));
        s.tick(&mut surface);
    }

    #[test]
    fn equal_bounds_keep_insertion_order() {
        let (_, mut s) = scheduler();
        let mut surface = FakeSurface::default();
        s.add(puppet("first", 1.0));
        s.add(puppet("second", 1.0));
        s.add(puppet("third", 1.0));

        s.tick(&mut surface);
        assert_eq!(surface.last_names(), ["first", "second", "third"]);
    }

    #[test]
    fn first_draw_clears_rest_load() {
        let (_, mut s) = scheduler();
        let mut surface = FakeSurface::default();
        s.add(puppet("a", 2.0));
        s.add(puppet("b", 1.0));
        s.add(puppet("c", 0.0));

        let TickOutcome::Presented { slot, .. } = s.tick(&mut surface) else {
            panic!("expected a presented frame");
        };

        let draws = &surface.last().draws;
        assert!(draws[0].targets.clears_color());
        assert!(draws[1..].iter().all(|d| d.targets.color == ColorLoad::Load));
        assert!(draws.iter().all(|d| d.slot == slot));
        assert_eq!(surface.prepared, 1);
    }

    #[test]
    fn empty_registry_still_clears_and_presents() {
        let (_, mut s) = scheduler();
        let mut surface = FakeSurface::default();

        let outcome = s.tick(&mut surface);
        assert!(matches!(outcome, TickOutcome::Presented { drawn: 0, .. }));
        assert!(surface.last().cleared);
    }

    #[test]
    #[should_panic(expected = "vanished from the registry")]
    fn renamed_entity_in_draw_order_panics() {
        let (_, mut s) = scheduler();
        let mut surface = FakeSurface::default();
        s.add(puppet("a", 0.0));
        s.set_draw_order_hook(|entities| {
            entities[0].borrow_mut().name = "ghost".to_owned();
        });
        s.tick(&mut surface);
    }

    // ── slots / completion ────────────────────────────────────────────────

    #[test]
    fn exhaustion_skips_until_a_frame_completes() {
        let (_, mut s) = scheduler();
        let mut surface = FakeSurface::default();
        s.add(puppet("a", 0.0));

        for _ in 0..FRAMES_IN_FLIGHT {
            assert!(matches!(s.tick(&mut surface), TickOutcome::Presented { .. }));
        }
        assert_eq!(
            s.tick(&mut surface),
            TickOutcome::Skipped(FrameSkip::NoFreeSlot)
        );
        assert_eq!(surface.presented.len(), FRAMES_IN_FLIGHT);

        surface.complete(0);
        assert!(matches!(s.tick(&mut surface), TickOutcome::Presented { .. }));
        assert_eq!(s.in_flight(), FRAMES_IN_FLIGHT);
    }

    #[test]
    fn completions_in_any_order_free_every_slot() {
        let (_, mut s) = scheduler();
        let mut surface = FakeSurface::default();

        for _ in 0..3 {
            s.tick(&mut surface);
        }
        assert_eq!(s.free_slots(), 0);

        surface.complete(2);
        surface.complete(0);
        surface.complete(0);
        assert_eq!(s.pump_completions(), 3);

        assert_eq!(s.free_slots(), 3);
        assert_eq!(s.frame_rate_tracker().retained(), 3);
    }

    #[test]
    fn skipped_tick_does_not_touch_clock_or_entities() {
        let (time, mut s) = scheduler();
        let mut surface = FakeSurface::default();
        let a = puppet("a", 0.0);
        s.add(Rc::clone(&a));
        s.attach();
        s.play(&mut surface);

        for _ in 1..FRAMES_IN_FLIGHT {
            s.tick(&mut surface);
        }
        let updates = a.borrow().updates;

        time.advance_secs(0.5);
        assert_eq!(
            s.tick(&mut surface),
            TickOutcome::Skipped(FrameSkip::NoFreeSlot)
        );
        assert_eq!(a.borrow().updates, updates);

        // The next drawn frame sees the whole interval.
        surface.complete(0);
        s.tick(&mut surface);
        assert_eq!(a.borrow().updates, updates + 1);
        assert_eq!(a.borrow().elapsed, 0.5);
    }

    #[test]
    fn surface_failure_returns_slot() {
        let (_, mut s) = scheduler();
        let mut surface = FakeSurface {
            fail_next: Some(SurfaceErrorAction::SkipFrame),
            ..Default::default()
        };

        assert_eq!(
            s.tick(&mut surface),
            TickOutcome::Skipped(FrameSkip::Surface(SurfaceErrorAction::SkipFrame))
        );
        assert_eq!(s.free_slots(), FRAMES_IN_FLIGHT);
        assert_eq!(surface.prepared, 0);

        surface.fail_next = Some(SurfaceErrorAction::Fatal);
        assert_eq!(s.tick(&mut surface), TickOutcome::Fatal);
        assert_eq!(s.free_slots(), FRAMES_IN_FLIGHT);
    }

    #[test]
    fn completion_after_teardown_is_ignored() {
        let (_, mut s) = scheduler();
        let mut surface = FakeSurface::default();
        s.tick(&mut surface);
        drop(s);
        surface.complete(0);
    }

    // ── playback ──────────────────────────────────────────────────────────

    #[test]
    fn speed_scales_entity_delta() {
        let (time, mut s) = scheduler();
        let mut surface = FakeSurface::default();
        let a = puppet("a", 0.0);
        s.add(Rc::clone(&a));
        s.attach();
        s.play(&mut surface);

        time.advance_secs(0.25);
        s.set_speed(2.0);
        surface.complete(0);
        s.tick(&mut surface);

        assert_eq!(a.borrow().elapsed, 0.5);
    }

    #[test]
    fn paused_ticks_deliver_zero_delta() {
        let (time, mut s) = scheduler();
        let mut surface = FakeSurface::default();
        let a = puppet("a", 0.0);
        s.add(Rc::clone(&a));
        s.attach();
        s.play(&mut surface);
        s.pause();

        time.advance_secs(1.0);
        surface.complete(0);
        s.tick(&mut surface);
        assert_eq!(a.borrow().elapsed, 0.0);
        assert_eq!(a.borrow().updates, 2);

        // Resuming does not count paused time.
        s.play(&mut surface);
        assert_eq!(a.borrow().elapsed, 0.0);
    }

    #[test]
    fn play_ticks_immediately_only_when_attached() {
        let (_, mut s) = scheduler();
        let mut surface = FakeSurface::default();

        assert!(s.play(&mut surface).is_none());
        assert!(s.is_playing());
        s.pause();

        s.attach();
        assert!(matches!(
            s.play(&mut surface),
            Some(TickOutcome::Presented { .. })
        ));
        assert!(s.play(&mut surface).is_none());
        assert_eq!(surface.presented.len(), 1);
    }

    #[test]
    fn idle_refresh_polls_the_surface_before_recycling() {
        let (_, mut s) = scheduler();
        let mut surface = FakeSurface::default();
        for _ in 0..FRAMES_IN_FLIGHT {
            s.tick(&mut surface);
        }
        assert_eq!(s.free_slots(), 0);

        surface.complete_on_maintain = true;
        let before = surface.maintained;
        assert!(s.on_display_refresh(&mut surface).is_none());
        assert_eq!(surface.maintained, before + 1);
        assert_eq!(s.free_slots(), FRAMES_IN_FLIGHT);
    }

    #[test]
    fn refresh_requires_attached_and_playing() {
        let (_, mut s) = scheduler();
        let mut surface = FakeSurface::default();

        assert!(s.on_display_refresh(&mut surface).is_none());
        s.attach();
        assert!(s.on_display_refresh(&mut surface).is_none());
        s.play(&mut surface);
        assert!(s.on_display_refresh(&mut surface).is_some());

        s.detach();
        assert!(s.is_playing());
        assert!(s.on_display_refresh(&mut surface).is_none());
    }

    // ── frame rate / registry surface ─────────────────────────────────────

    #[test]
    fn frame_rate_published_when_enabled() {
        let (_, mut s) = scheduler();
        let mut surface = FakeSurface::default();
        let seen = Rc::new(Cell::new(None));
        let sink = Rc::clone(&seen);
        s.set_frame_rate_listener(move |fps| sink.set(Some(fps)));

        s.tick(&mut surface);
        assert_eq!(s.published_frame_rate(), None);
        assert_eq!(seen.get(), None);

        s.set_show_frame_rate(true);
        surface.complete(0);
        s.tick(&mut surface);
        assert_eq!(s.published_frame_rate(), Some(1));
        assert_eq!(seen.get(), Some(1));

        s.set_show_frame_rate(false);
        assert_eq!(s.published_frame_rate(), None);
    }

    #[test]
    fn add_with_same_name_replaces_binding() {
        let (_, mut s) = scheduler();
        let mut surface = FakeSurface::default();
        let a = puppet("a", 0.0);
        let a2 = puppet("a", 7.0);
        let b = puppet("b", 1.0);

        assert!(!s.add(Rc::clone(&a)));
        assert!(!s.add(Rc::clone(&b)));
        assert!(s.contains(&a) && s.contains(&b));
        assert!(s.add(Rc::clone(&a2)));

        let presented = s.presented_entities();
        assert_eq!(presented.len(), 2);
        let replaced = presented
            .iter()
            .find(|e| e.borrow().name == "a")
            .expect("entity a");
        assert!(Rc::ptr_eq(replaced, &a2));

        s.tick(&mut surface);
        assert_eq!(a.borrow().updates, 0);
        assert_eq!(a2.borrow().updates, 1);
    }

    #[test]
    fn removal_applies_from_next_tick() {
        let (_, mut s) = scheduler();
        let mut surface = FakeSurface::default();
        let a = puppet("a", 0.0);
        s.add(Rc::clone(&a));
        s.add(puppet("b", 1.0));

        s.tick(&mut surface);
        assert!(s.remove(&a));
        assert!(!s.remove(&a));
        assert!(!s.contains_named("a"));

        surface.complete(0);
        s.tick(&mut surface);
        assert_eq!(surface.last_names(), ["b"]);
        assert_eq!(surface.presented[0].draws.len(), 2);
    }
}
