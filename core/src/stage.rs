//! The per-frame driver that ties the idle monitor, the clip sequencer and the procedural scenes to
//! a frame sink.
//!
//! A [`Stage`] is the one context object the render task owns. The trigger source only ever sees
//! the [`IdleMonitor`] handle returned by [`Stage::monitor`], and the player only ever sees the
//! sequencer's [`CompletionMailbox`](crate::sequencer::CompletionMailbox).

use enum_map::EnumMap;
use log::{debug, info, trace};
use std::sync::Arc;
use thiserror::Error;

use crate::clip::ChainError;
use crate::clock::Millis;
use crate::config::{ConfigError, StageConfig};
use crate::frame::{FrameBuffer, FrameError, FrameSink, Presenter};
use crate::monitor::{DisplayMode, IdleMonitor};
use crate::scene::Scene;
use crate::sequencer::{ClipPlayer, Notification, Sequencer};

/// What happened to the frame during a [`Stage::tick`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Frame {
    /// A scene was rendered and handed to the sink.
    Presented,
    /// The sink was still busy with the previous transfer; the frame was skipped.
    SinkBusy,
    /// The current mode has no scene; the clip player owns the display.
    NoScene,
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Builder for a [`Stage`].
///
/// Scenes are registered per [`DisplayMode`]. A mode without a scene leaves the display to the
/// clip player; by default neither mode has one.
#[derive(Default)]
pub struct StageBuilder {
    config: StageConfig,
    scenes: EnumMap<DisplayMode, Option<Box<dyn Scene>>>,
}

impl StageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: StageConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the scene shown while in `mode`, replacing any previous one.
    pub fn on(mut self, mode: DisplayMode, scene: impl Scene + 'static) -> Self {
        self.scenes[mode] = Some(Box::new(scene));
        self
    }

    /// Validates the configuration and assembles the stage. `now` is the time the stage counts as
    /// the last activity.
    pub fn build<P: ClipPlayer, S: FrameSink>(
        self,
        sequencer: Sequencer<P>,
        sink: S,
        now: Millis,
    ) -> Result<Stage<P, S>, StageError> {
        self.config.validate()?;
        let monitor = Arc::new(IdleMonitor::new(self.config.trigger_config(), now));
        Ok(Stage {
            buffer: FrameBuffer::new(self.config.width, self.config.height),
            config: self.config,
            monitor,
            sequencer,
            scenes: self.scenes,
            presenter: Presenter::new(sink),
            mode: None,
            seen_triggers: 0,
        })
    }
}

/// Drives everything once per frame.
///
/// Each [`tick`](Self::tick):
///
/// 1. polls the [`IdleMonitor`] for the display mode;
/// 2. on a mode change, starts (entering [`Active`](DisplayMode::Active)) or stops (entering
///    [`Idle`](DisplayMode::Idle)) the clip chain and enters the mode's scene;
/// 3. with `restart_on_trigger`, restarts the chain when a trigger arrives while already active;
/// 4. applies any completion the player has posted;
/// 5. renders the mode's scene and submits it, unless the sink is still busy.
///
/// Nothing in a tick blocks.
pub struct Stage<P: ClipPlayer, S: FrameSink> {
    config: StageConfig,
    monitor: Arc<IdleMonitor>,
    sequencer: Sequencer<P>,
    scenes: EnumMap<DisplayMode, Option<Box<dyn Scene>>>,
    presenter: Presenter<S>,
    buffer: FrameBuffer,
    mode: Option<DisplayMode>,
    seen_triggers: u32,
}

impl<P: ClipPlayer, S: FrameSink> Stage<P, S> {
    /// Handle for the trigger source. Clone it into the interrupt handler or a `static`.
    pub fn monitor(&self) -> Arc<IdleMonitor> {
        Arc::clone(&self.monitor)
    }

    /// Mode as of the last tick; `None` before the first one.
    pub fn mode(&self) -> Option<DisplayMode> {
        self.mode
    }

    pub fn tick(&mut self, now: Millis) -> Result<Frame, StageError> {
        let mode = self.monitor.poll(now);
        let triggers = self.monitor.trigger_count();
        let triggered = triggers != self.seen_triggers;
        self.seen_triggers = triggers;

        if self.mode != Some(mode) {
            self.enter(mode, now);
        } else if triggered && mode == DisplayMode::Active && self.config.restart_on_trigger {
            debug!("Trigger while active, restarting clip chain");
            self.sequencer.start();
        }

        match self.sequencer.service() {
            Some(Notification::Stale) => trace!("Dropped stale completion"),
            Some(notification) => debug!("{notification:?}"),
            None => {}
        }

        let Some(scene) = self.scenes[mode].as_mut() else {
            return Ok(Frame::NoScene);
        };
        if !self.presenter.is_ready() {
            trace!("Sink busy, skipping frame at {}", now.as_u32());
            return Ok(Frame::SinkBusy);
        }
        scene.render(now, &mut self.buffer);
        let area = self.buffer.area()?;
        match self.presenter.submit(area, self.buffer.pixels()) {
            Ok(()) => Ok(Frame::Presented),
            Err(FrameError::Busy) => Ok(Frame::SinkBusy),
            Err(err) => Err(err.into()),
        }
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn sequencer(&self) -> &Sequencer<P> {
        &self.sequencer
    }

    pub fn sequencer_mut(&mut self) -> &mut Sequencer<P> {
        &mut self.sequencer
    }

    pub fn sink(&self) -> &S {
        self.presenter.sink()
    }

    pub fn sink_mut(&mut self) -> &mut S {
        self.presenter.sink_mut()
    }

    /// The most recently rendered frame.
    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    fn enter(&mut self, mode: DisplayMode, now: Millis) {
        match self.mode {
            Some(previous) => info!("Display mode {previous:?} -> {mode:?}"),
            None => info!("Display mode {mode:?}"),
        }
        self.mode = Some(mode);
        match mode {
            DisplayMode::Active => self.sequencer.start(),
            DisplayMode::Idle => self.sequencer.stop(),
        }
        if let Some(scene) = self.scenes[mode].as_mut() {
            scene.enter(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::ClipChain;
    use crate::frame::{Area, FlushDone};
    use crate::sequencer::{CompletionMailbox, PassMode, PlaybackToken, SequencerState};
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Default)]
    struct FakePlayer {
        plays: Vec<(u8, PlaybackToken)>,
        stops: usize,
    }

    impl ClipPlayer for FakePlayer {
        type Handle = u8;

        fn play(&mut self, handle: &u8, _mode: PassMode, token: PlaybackToken) {
            self.plays.push((*handle, token));
        }

        fn stop(&mut self) {
            self.stops += 1;
        }
    }

    #[derive(Default)]
    struct FakeSink {
        frames: usize,
        hold: bool,
        pending: Option<FlushDone>,
    }

    impl FrameSink for FakeSink {
        fn flush(&mut self, _area: Area, _pixels: &[u16], done: FlushDone) {
            self.frames += 1;
            if self.hold {
                self.pending = Some(done);
            } else {
                done.notify();
            }
        }
    }

    struct CountingScene {
        entered: Rc<Cell<u32>>,
        rendered: Rc<Cell<u32>>,
    }

    impl Scene for CountingScene {
        fn enter(&mut self, _now: Millis) {
            self.entered.set(self.entered.get() + 1);
        }

        fn render(&mut self, _now: Millis, _target: &mut FrameBuffer) {
            self.rendered.set(self.rendered.get() + 1);
        }
    }

    fn sequencer() -> Sequencer<FakePlayer> {
        let chain = ClipChain::builder()
            .then("start", 0, 1)
            .then("loop", 1, 2)
            .then("end", 2, 1)
            .build()
            .unwrap();
        Sequencer::new(chain, FakePlayer::default(), Arc::new(CompletionMailbox::new()))
    }

    fn build_stage(
        config: StageConfig,
    ) -> (Stage<FakePlayer, FakeSink>, Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let entered = Rc::new(Cell::new(0));
        let rendered = Rc::new(Cell::new(0));
        let scene = CountingScene {
            entered: Rc::clone(&entered),
            rendered: Rc::clone(&rendered),
        };
        let stage = StageBuilder::new()
            .config(config)
            .on(DisplayMode::Idle, scene)
            .build(sequencer(), FakeSink::default(), Millis(0))
            .unwrap();
        (stage, entered, rendered)
    }

    #[test]
    fn when_first_tick_then_active_and_chain_started() {
        let (mut stage, _, rendered) = build_stage(StageConfig::default());

        assert_eq!(stage.tick(Millis(0)).unwrap(), Frame::NoScene);
        assert_eq!(stage.mode(), Some(DisplayMode::Active));
        assert_eq!(stage.sequencer().player().plays.len(), 1);
        assert_eq!(stage.sequencer().player().plays[0].0, 0);
        assert_eq!(rendered.get(), 0);
    }

    #[test]
    fn when_idle_then_chain_stopped_and_scene_presented() {
        let (mut stage, entered, rendered) = build_stage(StageConfig::default());
        stage.tick(Millis(0)).unwrap();

        assert_eq!(stage.tick(Millis(2999)).unwrap(), Frame::NoScene);
        assert_eq!(stage.tick(Millis(3000)).unwrap(), Frame::Presented);

        assert_eq!(stage.mode(), Some(DisplayMode::Idle));
        assert_eq!(stage.sequencer().state(), SequencerState::Stopped);
        assert_eq!(stage.sequencer().player().stops, 1);
        assert_eq!(entered.get(), 1);
        assert_eq!(rendered.get(), 1);
        assert_eq!(stage.sink().frames, 1);
    }

    #[test]
    fn when_triggered_while_idle_then_chain_restarts_from_first_clip() {
        let (mut stage, _, _) = build_stage(StageConfig::default());
        let monitor = stage.monitor();
        stage.tick(Millis(0)).unwrap();
        stage.tick(Millis(3000)).unwrap();

        monitor.on_trigger(Millis(3500));
        assert_eq!(stage.tick(Millis(3500)).unwrap(), Frame::NoScene);

        assert_eq!(stage.mode(), Some(DisplayMode::Active));
        let plays = &stage.sequencer().player().plays;
        assert_eq!(plays.len(), 2);
        assert_eq!(plays[1].0, 0);
    }

    #[test]
    fn when_completions_posted_then_tick_advances_chain() {
        let (mut stage, _, _) = build_stage(StageConfig::default());
        let mailbox = stage.sequencer().mailbox();
        stage.tick(Millis(0)).unwrap();

        let token = stage.sequencer().player().plays[0].1;
        mailbox.post(token);
        // A repeated post of the same token is a no-op once applied.
        stage.tick(Millis(16)).unwrap();
        mailbox.post(token);
        stage.tick(Millis(32)).unwrap();

        assert_eq!(
            stage.sequencer().state(),
            SequencerState::Playing {
                clip: 1,
                remaining: Some(2)
            }
        );
    }

    #[test]
    fn when_triggered_while_active_then_restart_only_if_configured() {
        let (mut stage, _, _) = build_stage(StageConfig::default());
        let monitor = stage.monitor();
        stage.tick(Millis(0)).unwrap();
        monitor.on_trigger(Millis(100));
        stage.tick(Millis(100)).unwrap();
        assert_eq!(stage.sequencer().player().plays.len(), 1);

        let (mut stage, _, _) = build_stage(StageConfig {
            restart_on_trigger: true,
            ..StageConfig::default()
        });
        let monitor = stage.monitor();
        stage.tick(Millis(0)).unwrap();
        monitor.on_trigger(Millis(100));
        stage.tick(Millis(100)).unwrap();
        stage.tick(Millis(116)).unwrap();
        assert_eq!(stage.sequencer().player().plays.len(), 2);
    }

    #[test]
    fn when_sink_busy_then_frame_skipped() {
        let (mut stage, _, rendered) = build_stage(StageConfig::default());
        stage.sink_mut().hold = true;
        stage.tick(Millis(0)).unwrap();

        assert_eq!(stage.tick(Millis(3000)).unwrap(), Frame::Presented);
        assert_eq!(stage.tick(Millis(3016)).unwrap(), Frame::SinkBusy);
        assert_eq!(rendered.get(), 1);

        stage.sink_mut().pending.take().unwrap().notify();
        assert_eq!(stage.tick(Millis(3032)).unwrap(), Frame::Presented);
        assert_eq!(rendered.get(), 2);
        assert_eq!(stage.sink().frames, 2);
    }

    #[test]
    fn when_config_invalid_then_build_fails() {
        let result = StageBuilder::new()
            .config(StageConfig {
                idle_threshold_ms: 0,
                ..StageConfig::default()
            })
            .build(sequencer(), FakeSink::default(), Millis(0));

        assert!(matches!(
            result,
            Err(StageError::Config(ConfigError::Invalid { .. }))
        ));
    }
}
