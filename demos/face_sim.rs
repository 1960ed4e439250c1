//! Simulates the face firmware on the host for a minute of device time.
//!
//! A fake GIF player takes a fixed time per pass and posts its completions to the sequencer's
//! mailbox, the way an LVGL `LV_EVENT_READY` handler would. A scripted "touch pad" fires a few
//! bursts of triggers. While idle the look-around eyes are rendered into the frame buffer, and a
//! sink that pretends to be an SPI panel takes two frames to finish each transfer.
//!
//! Pass a JSON file as the first argument to override the stage configuration, and set `RUST_LOG`
//! (e.g. `RUST_LOG=debug`) to see sequencer transitions.

use biu::prelude::*;
use biu::{Area, FlushDone, LookAroundEyes, ManualClock, StageError};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::error::Error;
use std::sync::Arc;

const FRAME_MS: u32 = 16;
const SIM_MS: u32 = 60_000;
const PASS_MS: u32 = 1200;
const TOUCHES: [u32; 6] = [8_000, 8_300, 8_320, 20_000, 41_000, 41_050];

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => StageConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => StageConfig {
            restart_on_trigger: true,
            debounce_ms: Some(50),
            ..StageConfig::default()
        },
    };

    let clock = Arc::new(ManualClock::new(Millis(0)));
    let mailbox = Arc::new(CompletionMailbox::new());
    let chain = ClipChain::builder()
        .then("start", "excited_start.gif", 1)
        .then("loop", "excited_loop.gif", 2)
        .then("end", "excited_end.gif", 1)
        .build()
        .map_err(StageError::from)?;
    let player = GifPlayer {
        clock: Arc::clone(&clock),
        mailbox: Arc::clone(&mailbox),
        playing: None,
    };
    let eyes = LookAroundEyes::new(config.look, StdRng::seed_from_u64(2024))?;
    let mut stage = StageBuilder::new()
        .config(config)
        .on(DisplayMode::Idle, eyes)
        .build(
            Sequencer::new(chain, player, mailbox),
            SpiPanel::default(),
            clock.now(),
        )?;
    let touch_pad = stage.monitor();

    let mut presented = 0;
    let mut skipped = 0;
    let mut touches = TOUCHES.iter().peekable();
    while clock.now().as_u32() < SIM_MS {
        let now = clock.advance(FRAME_MS);
        while let Some(&&at) = touches.peek() {
            if at > now.as_u32() {
                break;
            }
            if !touch_pad.on_trigger(now) {
                info!("Touch at {} ms debounced", now.as_u32());
            }
            touches.next();
        }
        stage.sequencer_mut().player_mut().pump(now);
        stage.sink_mut().tick();
        match stage.tick(now)? {
            Frame::Presented => presented += 1,
            Frame::SinkBusy => skipped += 1,
            Frame::NoScene => {}
        }
    }

    info!(
        "Simulated {} s: {} frames presented, {} skipped while the panel was busy, {} triggers",
        SIM_MS / 1000,
        presented,
        skipped,
        touch_pad.trigger_count()
    );
    print_thumbnail(stage.frame_buffer());
    Ok(())
}

struct GifPlayer {
    clock: Arc<ManualClock>,
    mailbox: Arc<CompletionMailbox>,
    playing: Option<(PlaybackToken, PassMode, Millis)>,
}

impl GifPlayer {
    fn pump(&mut self, now: Millis) {
        if let Some((token, PassMode::Single, started)) = self.playing {
            if now.since(started) >= PASS_MS as i32 {
                self.mailbox.post(token);
                self.playing = None;
            }
        }
    }
}

impl ClipPlayer for GifPlayer {
    type Handle = &'static str;

    fn play(&mut self, handle: &&'static str, mode: PassMode, token: PlaybackToken) {
        info!("Player: {handle} ({mode:?})");
        self.playing = Some((token, mode, self.clock.now()));
    }

    fn stop(&mut self) {
        info!("Player: stopped");
        self.playing = None;
    }
}

#[derive(Default)]
struct SpiPanel {
    in_flight: Option<(FlushDone, u32)>,
}

impl SpiPanel {
    /// Advances the pretend DMA transfer by one frame.
    fn tick(&mut self) {
        if let Some((done, frames_left)) = self.in_flight.take() {
            if frames_left <= 1 {
                done.notify();
            } else {
                self.in_flight = Some((done, frames_left - 1));
            }
        }
    }
}

impl FrameSink for SpiPanel {
    fn flush(&mut self, _area: Area, _pixels: &[u16], done: FlushDone) {
        self.in_flight = Some((done, 2));
    }
}

fn print_thumbnail(buffer: &FrameBuffer) {
    for y in (0..buffer.height()).step_by(12) {
        let row: String = (0..buffer.width())
            .step_by(6)
            .map(|x| match buffer.pixel(x, y) {
                Some(0) | None => ' ',
                Some(0xffff) => '#',
                Some(_) => '+',
            })
            .collect();
        println!("{row}");
    }
}
