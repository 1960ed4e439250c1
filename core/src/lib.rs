//! Core types for biu.
//!
//! Everything here is re-exported by the `biu` crate, which is what applications should depend on.

pub mod clip;
pub mod clock;
pub mod config;
pub mod easing;
pub mod frame;
pub mod interpolation;
pub mod monitor;
pub mod scene;
pub mod sequencer;
pub mod stage;
pub mod tween;
