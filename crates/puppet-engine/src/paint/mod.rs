//! Color model shared by the scheduler config and renderers.
//!
//! Geometry types remain in `coords`.

pub mod color;

pub use color::Color;
