//! Animation plumbing for small TFT panels: eased tweens, a clip sequencer for externally decoded
//! GIF/Lottie resources, an idle monitor fed by a trigger interrupt, and procedural scenes drawn
//! with `embedded-graphics`.
//!
//! A typical render task builds a [`Stage`] once and calls [`Stage::tick`] every frame:
//!
//! ```
//! use biu::prelude::*;
//! use biu::{Area, FlushDone};
//! use std::sync::Arc;
//!
//! struct Gif;
//!
//! impl ClipPlayer for Gif {
//!     type Handle = &'static str;
//!
//!     fn play(&mut self, _handle: &&'static str, _mode: PassMode, _token: PlaybackToken) {}
//!     fn stop(&mut self) {}
//! }
//!
//! struct Panel;
//!
//! impl FrameSink for Panel {
//!     fn flush(&mut self, _area: Area, _pixels: &[u16], done: FlushDone) {
//!         done.notify();
//!     }
//! }
//!
//! let chain = ClipChain::builder()
//!     .then("start", "excited_start", 1)
//!     .then("loop", "excited_loop", 2)
//!     .then("end", "excited_end", 1)
//!     .build()
//!     .unwrap();
//! let sequencer = Sequencer::new(chain, Gif, Arc::new(CompletionMailbox::new()));
//! let mut stage = StageBuilder::new()
//!     .build(sequencer, Panel, Millis(0))
//!     .unwrap();
//!
//! assert_eq!(stage.tick(Millis(0)).unwrap(), Frame::NoScene);
//! assert_eq!(stage.mode(), Some(DisplayMode::Active));
//! ```

pub mod prelude;

pub use biu_core::{
    clip::{ChainError, Clip, ClipChain, ClipChainBuilder, Loops},
    clock::{Clock, ManualClock, Millis, StdClock},
    config::{ConfigError, LookConfig, StageConfig},
    easing::{CubicBezierEasing, Easing, EasingFunction},
    frame::{Area, FlushDone, FrameBuffer, FrameError, FrameSink, Presenter},
    interpolation::Lerp,
    monitor::{DisplayMode, IdleMonitor, TriggerConfig},
    scene::{Ball, BouncingBalls, LookAroundEyes, Scene, Spinner, LOOK_TARGETS},
    sequencer::{
        ClipPlayer, CompletionMailbox, Notification, PassMode, PlaybackToken, Sequencer,
        SequencerState,
    },
    stage::{Frame, Stage, StageBuilder, StageError},
    tween::{Cycle, CyclicTween, Tween},
};
