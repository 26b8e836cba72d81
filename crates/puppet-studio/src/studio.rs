use std::cell::{Cell, RefCell};
use std::rc::Rc;

use winit::event::WindowEvent;
use winit::window::WindowId;

use puppet_engine::coords::Vec2;
use puppet_engine::core::{App, AppControl, FrameCtx};
use puppet_engine::input::Key;
use puppet_engine::paint::Color;
use puppet_engine::render::GpuStream;
use puppet_engine::schedule::{
    Entity, FrameSkip, RenderOrchestrator, SchedulerConfig, SharedEntity, TickOutcome,
};

use crate::bone_renderer::BoneRenderer;
use crate::marionette::Marionette;

type Scheduler = RenderOrchestrator<GpuStream, Marionette, BoneRenderer>;

const TITLE: &str = "Puppet Studio";
const SPEED_STEP: f64 = 1.25;
const MAX_SPEED: f64 = 8.0;

/// Key bindings.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Command {
    TogglePlay,
    Faster,
    Slower,
    ToggleFrameRate,
    RemoveLast,
    AddBack,
    ReverseOrder,
    Quit,
}

impl Command {
    pub fn for_key(key: Key) -> Option<Command> {
        Some(match key {
            Key::Space => Command::TogglePlay,
            Key::ArrowUp => Command::Faster,
            Key::ArrowDown => Command::Slower,
            Key::F => Command::ToggleFrameRate,
            Key::Delete | Key::Backspace => Command::RemoveLast,
            Key::Insert => Command::AddBack,
            Key::R => Command::ReverseOrder,
            Key::Escape => Command::Quit,
            _ => return None,
        })
    }

    const ALL_KEYS: [Key; 9] = [
        Key::Space,
        Key::ArrowUp,
        Key::ArrowDown,
        Key::F,
        Key::Delete,
        Key::Backspace,
        Key::Insert,
        Key::R,
        Key::Escape,
    ];
}

/// Marionettes on stage plus the ones taken off, most recent last.
pub struct Cast {
    on_stage: Vec<SharedEntity<Marionette>>,
    off_stage: Vec<SharedEntity<Marionette>>,
}

impl Cast {
    pub fn new(figures: Vec<Marionette>) -> Self {
        Self {
            on_stage: figures
                .into_iter()
                .map(|m| Rc::new(RefCell::new(m)))
                .collect(),
            off_stage: Vec::new(),
        }
    }

    /// Registers every on-stage marionette.
    pub fn enter_all(&self, scheduler: &mut Scheduler) {
        for m in &self.on_stage {
            scheduler.add(Rc::clone(m));
        }
    }

    pub fn remove_last(&mut self, scheduler: &mut Scheduler) -> Option<String> {
        let m = self.on_stage.pop()?;
        scheduler.remove(&m);
        let name = m.borrow().name().to_owned();
        self.off_stage.push(m);
        Some(name)
    }

    pub fn add_back(&mut self, scheduler: &mut Scheduler) -> Option<String> {
        let m = self.off_stage.pop()?;
        scheduler.add(Rc::clone(&m));
        let name = m.borrow().name().to_owned();
        self.on_stage.push(m);
        Some(name)
    }

    pub fn on_stage(&self) -> usize {
        self.on_stage.len()
    }
}

/// Default troupe laid out across a 1280-wide stage.
pub fn troupe() -> Vec<Marionette> {
    const PALETTE: [(u8, u8, u8); 5] = [
        (0xE0, 0x6C, 0x75),
        (0x98, 0xC3, 0x79),
        (0x61, 0xAF, 0xEF),
        (0xE5, 0xC0, 0x7B),
        (0xC6, 0x78, 0xDD),
    ];

    PALETTE
        .iter()
        .enumerate()
        .map(|(i, &(r, g, b))| {
            let anchor = Vec2::new(200.0 + i as f32 * 220.0, 160.0 + (i % 2) as f32 * 70.0);
            Marionette::figure(
                &format!("marionette-{i}"),
                anchor,
                Color::from_srgb_u8(r, g, b, 235),
                i as f32 * 1.3,
            )
        })
        .collect()
}

/// Studio application: a troupe of marionettes and the keys to drive them.
pub struct Studio {
    scheduler: Scheduler,
    cast: Cast,
    reversed: Rc<Cell<bool>>,
    fps: Rc<Cell<Option<usize>>>,
    occluded: bool,
    started: bool,
    title: String,
}

impl Studio {
    pub fn new() -> Self {
        let mut scheduler = Scheduler::new(BoneRenderer::new, SchedulerConfig::default());

        let reversed = Rc::new(Cell::new(false));
        let flag = Rc::clone(&reversed);
        scheduler.set_draw_order_hook(move |order| {
            if flag.get() {
                order.reverse();
            }
        });

        let fps = Rc::new(Cell::new(None));
        let sink = Rc::clone(&fps);
        scheduler.set_frame_rate_listener(move |value| sink.set(Some(value)));

        let cast = Cast::new(troupe());
        cast.enter_all(&mut scheduler);
        log::info!("studio ready with {} marionettes", cast.on_stage());

        Self {
            scheduler,
            cast,
            reversed,
            fps,
            occluded: false,
            started: false,
            title: String::new(),
        }
    }

    /// Applies `cmd`. Returns a tick outcome if the command itself ticked.
    fn apply(&mut self, cmd: Command, ctx: &mut FrameCtx<'_, '_>) -> Option<TickOutcome> {
        match cmd {
            Command::TogglePlay => {
                if self.scheduler.is_playing() {
                    self.scheduler.pause();
                } else {
                    return self.scheduler.play(&mut ctx.surface());
                }
            }
            Command::Faster => self.change_speed(SPEED_STEP),
            Command::Slower => self.change_speed(1.0 / SPEED_STEP),
            Command::ToggleFrameRate => {
                let show = !self.scheduler.show_frame_rate();
                self.scheduler.set_show_frame_rate(show);
                if !show {
                    self.fps.set(None);
                }
            }
            Command::RemoveLast => {
                if let Some(name) = self.cast.remove_last(&mut self.scheduler) {
                    log::info!("removed {name}");
                }
            }
            Command::AddBack => {
                if let Some(name) = self.cast.add_back(&mut self.scheduler) {
                    log::info!("added {name}");
                }
            }
            Command::ReverseOrder => {
                self.reversed.set(!self.reversed.get());
                log::info!("draw order reversed: {}", self.reversed.get());
            }
            Command::Quit => ctx.runtime.close_window(ctx.window.id),
        }
        None
    }

    fn change_speed(&mut self, factor: f64) {
        let speed = (self.scheduler.speed() * factor).min(MAX_SPEED);
        self.scheduler.set_speed(speed);
        log::info!("speed x{speed:.2}");
    }

    fn refresh_title(&mut self, ctx: &FrameCtx<'_, '_>) {
        let mut title = format!("{TITLE} - x{:.2}", self.scheduler.speed());
        if !self.scheduler.is_playing() {
            title.push_str(" (paused)");
        }
        if let Some(fps) = self.fps.get() {
            title.push_str(&format!(" - {fps} fps"));
        }

        if title != self.title {
            ctx.window.set_title(&title);
            self.title = title;
        }
    }
}

impl Default for Studio {
    fn default() -> Self {
        Self::new()
    }
}

impl App for Studio {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        if let WindowEvent::Occluded(occluded) = event {
            self.occluded = *occluded;
            if *occluded {
                self.scheduler.detach();
            } else if self.started {
                self.scheduler.attach();
            }
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let mut outcome = None;

        if !self.started {
            self.started = true;
            if !self.occluded {
                self.scheduler.attach();
            }
            outcome = self.scheduler.play(&mut ctx.surface());
        }

        let commands: Vec<Command> = Command::ALL_KEYS
            .into_iter()
            .filter(|key| ctx.input_frame.pressed(*key))
            .filter_map(Command::for_key)
            .collect();
        for cmd in commands {
            if let Some(ticked) = self.apply(cmd, ctx) {
                outcome = Some(ticked);
            }
        }

        // One tick per redraw.
        if outcome.is_none() {
            outcome = self.scheduler.on_display_refresh(&mut ctx.surface());
        }

        match outcome {
            Some(TickOutcome::Fatal) => {
                log::error!("surface lost; closing studio");
                return AppControl::Exit;
            }
            Some(TickOutcome::Skipped(FrameSkip::NoFreeSlot)) => {
                log::trace!("frame {} skipped: GPU behind", ctx.frame_index);
            }
            _ => {}
        }

        self.refresh_title(ctx);
        AppControl::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_bound_key_maps_to_a_command() {
        for key in Command::ALL_KEYS {
            assert!(Command::for_key(key).is_some(), "{key:?} unbound");
        }
        assert_eq!(Command::for_key(Key::P), None);
    }

    #[test]
    fn troupe_names_are_unique() {
        let troupe = troupe();
        let mut names: Vec<_> = troupe.iter().map(|m| m.name().to_owned()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), troupe.len());
    }

    #[test]
    fn cast_removes_and_restores_in_stack_order() {
        let mut scheduler = Scheduler::new(BoneRenderer::new, SchedulerConfig::default());
        let mut cast = Cast::new(troupe());
        cast.enter_all(&mut scheduler);
        let total = cast.on_stage();
        assert_eq!(scheduler.presented_entities().len(), total);

        let last = format!("marionette-{}", total - 1);
        assert_eq!(cast.remove_last(&mut scheduler), Some(last.clone()));
        assert!(!scheduler.contains_named(&last));
        assert_eq!(cast.on_stage(), total - 1);

        assert_eq!(cast.add_back(&mut scheduler), Some(last.clone()));
        assert!(scheduler.contains_named(&last));
        assert_eq!(cast.add_back(&mut scheduler), None);
    }

    #[test]
    fn emptying_the_stage_stops_at_zero() {
        let mut scheduler = Scheduler::new(BoneRenderer::new, SchedulerConfig::default());
        let mut cast = Cast::new(troupe());
        cast.enter_all(&mut scheduler);

        while cast.remove_last(&mut scheduler).is_some() {}
        assert_eq!(cast.on_stage(), 0);
        assert!(scheduler.presented_entities().is_empty());
        assert_eq!(cast.remove_last(&mut scheduler), None);
    }
}
