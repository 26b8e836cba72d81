//! Puppet engine crate.
//!
//! Frame scheduling for animated skeletal entities on top of a `wgpu`/`winit`
//! runtime: slot pool, playback clock, entity registry and the tick that ties
//! them to a presentation surface.

pub mod core;
pub mod coords;
pub mod device;
pub mod input;
pub mod logging;
pub mod paint;
pub mod render;
pub mod schedule;
pub mod time;
pub mod window;
