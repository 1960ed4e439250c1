//! Includes the types commonly used for wiring up a display.

pub use crate::{
    Clip, ClipChain, ClipPlayer, Clock, CompletionMailbox, CyclicTween, Cycle, DisplayMode, Easing,
    Frame, FrameBuffer, FrameSink, IdleMonitor, Millis, PassMode, PlaybackToken, Scene, Sequencer,
    Stage, StageBuilder, StageConfig, Tween,
};
