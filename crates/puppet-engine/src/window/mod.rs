//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and windows, wires each window to its GPU
//! context, and turns redraws into `App::on_frame` calls.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
