//! The clip sequencer: a state machine that walks a [`ClipChain`] as the external player reports
//! finished passes.
//!
//! Every request to the [`ClipPlayer`] carries a [`PlaybackToken`] stamped with a fresh generation.
//! Only the token from the most recent request is honored, so a late notification from a clip the
//! sequencer already moved past (or a player object that outlived its use) is dropped instead of
//! advancing the chain twice. Exactly one subscription is live at any time.

use crate::clip::{Clip, ClipChain};
use log::{debug, trace};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Identifies one playback request made by a [`Sequencer`].
///
/// The player hands it back, unchanged, when the pass it was issued for finishes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct PlaybackToken {
    generation: u32,
    clip: usize,
}

impl PlaybackToken {
    /// Subscription epoch. Never zero.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Index in the chain of the clip the request was made for.
    pub fn clip_index(&self) -> usize {
        self.clip
    }
}

/// How the player should run a clip it was asked to play.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PassMode {
    /// Play one full pass, then report completion with the request's token exactly once.
    Single,
    /// Loop until told otherwise and never report completion.
    Continuous,
}

/// The external animation player, e.g. an LVGL GIF widget or an rlottie renderer.
///
/// The player owns decoding and drives pixels to the panel on its own schedule. Whether it reuses
/// one widget or recreates it for every [`play`](Self::play) is up to the implementation.
///
/// Completions must not be delivered from inside `play` or `stop` by calling back into the
/// sequencer; post them to the sequencer's [`CompletionMailbox`] (from any thread or interrupt
/// context), or hand the token to [`Sequencer::on_finished`] later from the render task.
pub trait ClipPlayer {
    /// Reference to a decoded clip, as stored in the [`ClipChain`].
    type Handle;

    /// Replaces the active clip with `handle` and starts it from its first frame.
    ///
    /// This is the whole "set source, reset loop count, restart, subscribe" sequence; any
    /// subscription from a previous request is superseded by `token`.
    fn play(&mut self, handle: &Self::Handle, mode: PassMode, token: PlaybackToken);

    /// Stops output. Any outstanding token becomes stale.
    fn stop(&mut self);
}

/// Lock-free hand-off for completion notifications raised outside the render task.
///
/// Holds at most one generation. Posting keeps the newest generation seen, so a stale
/// notification that arrives after a valid one cannot hide it.
#[derive(Debug, Default)]
pub struct CompletionMailbox {
    latest: AtomicU32,
}

impl CompletionMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the pass for `token` finished. Safe from any context; never blocks.
    pub fn post(&self, token: PlaybackToken) {
        self.latest.fetch_max(token.generation, Ordering::AcqRel);
    }

    /// Removes and returns the posted generation, if any.
    pub fn take(&self) -> Option<u32> {
        match self.latest.swap(0, Ordering::AcqRel) {
            0 => None,
            generation => Some(generation),
        }
    }
}

/// Where the [`Sequencer`] is in its chain.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SequencerState {
    /// Constructed, [`start`](Sequencer::start) not called yet.
    NotStarted,
    /// Playing clip `clip`, with `remaining` passes left including the current one (`None` for a
    /// clip that loops forever).
    Playing { clip: usize, remaining: Option<u32> },
    /// [`stop`](Sequencer::stop) was called.
    Stopped,
}

/// Result of handling one completion notification.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Notification {
    /// Not for the current request; nothing changed.
    Stale,
    /// The clip has passes left and was played again.
    Replayed { clip: usize, remaining: u32 },
    /// The clip finished its last pass and the chain moved on.
    Advanced { from: usize, to: usize },
}

/// Chains clips, advancing to the next one whenever the current one finishes all of its passes.
///
/// The chain is a cycle: after the last clip the sequencer wraps to the first. A clip that loops
/// forever never finishes, so the chain stays on it until [`start`](Self::start) is called again.
pub struct Sequencer<P: ClipPlayer> {
    chain: ClipChain<P::Handle>,
    player: P,
    mailbox: Arc<CompletionMailbox>,
    state: SequencerState,
    generation: u32,
}

impl<P: ClipPlayer> Sequencer<P> {
    /// Creates a sequencer in the [`NotStarted`](SequencerState::NotStarted) state.
    ///
    /// `mailbox` should be the same one the player posts completions to.
    pub fn new(chain: ClipChain<P::Handle>, player: P, mailbox: Arc<CompletionMailbox>) -> Self {
        Self {
            chain,
            player,
            mailbox,
            state: SequencerState::NotStarted,
            generation: 0,
        }
    }

    /// Plays the chain from its first clip, preempting whatever was playing.
    pub fn start(&mut self) {
        debug!("Starting clip chain ({} clips)", self.chain.len());
        self.enter_clip(0);
    }

    /// Stops the player and invalidates the outstanding token.
    pub fn stop(&mut self) {
        if self.state == SequencerState::Stopped {
            return;
        }
        debug!("Stopping clip chain");
        self.generation = next_generation(self.generation);
        self.state = SequencerState::Stopped;
        self.player.stop();
    }

    /// Handles the completion of the pass that `token` was issued for.
    pub fn on_finished(&mut self, token: PlaybackToken) -> Notification {
        self.complete(token.generation)
    }

    /// Applies a completion posted to the mailbox, if there is one. Call once per frame.
    pub fn service(&mut self) -> Option<Notification> {
        let generation = self.mailbox.take()?;
        Some(self.complete(generation))
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// The clip currently playing, if any.
    pub fn current_clip(&self) -> Option<&Clip<P::Handle>> {
        match self.state {
            SequencerState::Playing { clip, .. } => self.chain.get(clip),
            _ => None,
        }
    }

    /// The token of the request currently in flight, if any.
    pub fn current_token(&self) -> Option<PlaybackToken> {
        match self.state {
            SequencerState::Playing { clip, .. } => Some(PlaybackToken {
                generation: self.generation,
                clip,
            }),
            _ => None,
        }
    }

    /// A handle to the mailbox completions are drained from.
    pub fn mailbox(&self) -> Arc<CompletionMailbox> {
        Arc::clone(&self.mailbox)
    }

    /// The clips being sequenced.
    pub fn chain(&self) -> &ClipChain<P::Handle> {
        &self.chain
    }

    /// The player the sequencer drives.
    pub fn player(&self) -> &P {
        &self.player
    }

    /// Mutable access to the player, for servicing it between ticks. Calling
    /// [`ClipPlayer::play`] directly bypasses the sequencer's tokens.
    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    fn enter_clip(&mut self, index: usize) {
        let remaining = self.chain.get(index).and_then(|clip| clip.loops().passes());
        self.state = SequencerState::Playing {
            clip: index,
            remaining,
        };
        self.play_pass(index);
    }

    fn play_pass(&mut self, index: usize) {
        self.generation = next_generation(self.generation);
        let token = PlaybackToken {
            generation: self.generation,
            clip: index,
        };
        if let Some(clip) = self.chain.get(index) {
            let mode = if clip.loops().is_infinite() {
                PassMode::Continuous
            } else {
                PassMode::Single
            };
            debug!(
                "Playing clip '{}' (#{}, {:?}, generation {})",
                clip.name(),
                index,
                mode,
                token.generation
            );
            self.player.play(clip.handle(), mode, token);
        }
    }

    fn complete(&mut self, generation: u32) -> Notification {
        let SequencerState::Playing { clip, remaining } = self.state else {
            trace!("Ignoring completion {generation}: not playing");
            return Notification::Stale;
        };
        if generation != self.generation {
            trace!("Ignoring stale completion {generation} (current {})", self.generation);
            return Notification::Stale;
        }
        let Some(remaining) = remaining else {
            trace!("Ignoring completion for clip #{clip}, which loops forever");
            return Notification::Stale;
        };
        if remaining > 1 {
            let remaining = remaining - 1;
            self.state = SequencerState::Playing {
                clip,
                remaining: Some(remaining),
            };
            self.play_pass(clip);
            Notification::Replayed { clip, remaining }
        } else {
            let next = self.chain.next_index(clip);
            self.enter_clip(next);
            Notification::Advanced {
                from: clip,
                to: next,
            }
        }
    }
}

// Zero is reserved as the empty mailbox value.
fn next_generation(generation: u32) -> u32 {
    generation.wrapping_add(1).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingPlayer {
        plays: Vec<(&'static str, PassMode, PlaybackToken)>,
        stops: usize,
    }

    impl RecordingPlayer {
        fn last_token(&self) -> PlaybackToken {
            self.plays.last().map(|(_, _, token)| *token).unwrap()
        }

        fn last_clip(&self) -> &'static str {
            self.plays.last().map(|(clip, _, _)| *clip).unwrap()
        }
    }

    impl ClipPlayer for RecordingPlayer {
        type Handle = &'static str;

        fn play(&mut self, handle: &Self::Handle, mode: PassMode, token: PlaybackToken) {
            self.plays.push((*handle, mode, token));
        }

        fn stop(&mut self) {
            self.stops += 1;
        }
    }

    fn face_sequencer() -> Sequencer<RecordingPlayer> {
        let chain = ClipChain::builder()
            .then("start", "excited_start", 1)
            .then("loop", "excited_loop", 2)
            .then("end", "excited_end", 1)
            .build()
            .unwrap();
        Sequencer::new(chain, RecordingPlayer::default(), Arc::new(CompletionMailbox::new()))
    }

    fn finish_current(sequencer: &mut Sequencer<RecordingPlayer>) -> Notification {
        let token = sequencer.player().last_token();
        sequencer.on_finished(token)
    }

    #[test]
    fn when_constructed_then_not_started_and_silent() {
        let sequencer = face_sequencer();

        assert_eq!(sequencer.state(), SequencerState::NotStarted);
        assert!(sequencer.player().plays.is_empty());
        assert!(sequencer.current_clip().is_none());
        assert!(sequencer.current_token().is_none());
    }

    #[test]
    fn when_started_then_plays_first_clip_once() {
        let mut sequencer = face_sequencer();
        sequencer.start();

        assert_eq!(
            sequencer.state(),
            SequencerState::Playing {
                clip: 0,
                remaining: Some(1)
            }
        );
        assert_eq!(sequencer.player().plays.len(), 1);
        assert_eq!(sequencer.player().last_clip(), "excited_start");
        assert_eq!(sequencer.player().plays[0].1, PassMode::Single);
        assert_eq!(sequencer.current_token(), Some(sequencer.player().last_token()));
    }

    #[test]
    fn when_four_passes_finish_then_cycle_returns_to_first_clip() {
        let mut sequencer = face_sequencer();
        sequencer.start();

        assert_eq!(
            finish_current(&mut sequencer),
            Notification::Advanced { from: 0, to: 1 }
        );
        assert_eq!(
            finish_current(&mut sequencer),
            Notification::Replayed {
                clip: 1,
                remaining: 1
            }
        );
        assert_eq!(
            finish_current(&mut sequencer),
            Notification::Advanced { from: 1, to: 2 }
        );
        assert_eq!(
            finish_current(&mut sequencer),
            Notification::Advanced { from: 2, to: 0 }
        );

        assert_eq!(
            sequencer.state(),
            SequencerState::Playing {
                clip: 0,
                remaining: Some(1)
            }
        );
        let played: Vec<_> = sequencer.player().plays.iter().map(|p| p.0).collect();
        assert_eq!(
            played,
            [
                "excited_start",
                "excited_loop",
                "excited_loop",
                "excited_end",
                "excited_start"
            ]
        );
    }

    #[test]
    fn when_stale_token_arrives_then_no_transition() {
        let mut sequencer = face_sequencer();
        sequencer.start();
        let start_token = sequencer.player().last_token();
        sequencer.on_finished(start_token);
        let plays_before = sequencer.player().plays.len();

        assert_eq!(sequencer.on_finished(start_token), Notification::Stale);
        assert_eq!(
            sequencer.state(),
            SequencerState::Playing {
                clip: 1,
                remaining: Some(2)
            }
        );
        assert_eq!(sequencer.player().plays.len(), plays_before);
    }

    #[test]
    fn when_pass_token_reused_after_replay_then_ignored() {
        let mut sequencer = face_sequencer();
        sequencer.start();
        finish_current(&mut sequencer);
        let first_pass = sequencer.player().last_token();
        sequencer.on_finished(first_pass);

        assert_eq!(sequencer.on_finished(first_pass), Notification::Stale);
        assert_eq!(
            sequencer.state(),
            SequencerState::Playing {
                clip: 1,
                remaining: Some(1)
            }
        );
    }

    #[test]
    fn when_not_started_then_notifications_ignored() {
        let mut sequencer = face_sequencer();
        let token = PlaybackToken {
            generation: 1,
            clip: 0,
        };

        assert_eq!(sequencer.on_finished(token), Notification::Stale);
        assert_eq!(sequencer.state(), SequencerState::NotStarted);
    }

    #[test]
    fn when_clip_loops_forever_then_chain_stalls() {
        let chain = ClipChain::builder()
            .then("wake", "wake", 1)
            .then("idle", "idle", 0)
            .build()
            .unwrap();
        let mut sequencer =
            Sequencer::new(chain, RecordingPlayer::default(), Arc::new(CompletionMailbox::new()));
        sequencer.start();
        finish_current(&mut sequencer);

        assert_eq!(sequencer.player().plays[1].1, PassMode::Continuous);
        assert_eq!(finish_current(&mut sequencer), Notification::Stale);
        assert_eq!(
            sequencer.state(),
            SequencerState::Playing {
                clip: 1,
                remaining: None
            }
        );
        assert_eq!(sequencer.player().plays.len(), 2);
    }

    #[test]
    fn when_restarted_mid_chain_then_preempts_and_invalidates_old_token() {
        let mut sequencer = face_sequencer();
        sequencer.start();
        finish_current(&mut sequencer);
        let loop_token = sequencer.player().last_token();

        sequencer.start();

        assert_eq!(sequencer.player().last_clip(), "excited_start");
        assert_eq!(sequencer.on_finished(loop_token), Notification::Stale);
        assert_eq!(
            finish_current(&mut sequencer),
            Notification::Advanced { from: 0, to: 1 }
        );
    }

    #[test]
    fn when_stopped_then_player_stops_and_tokens_go_stale() {
        let mut sequencer = face_sequencer();
        sequencer.start();
        let token = sequencer.player().last_token();

        sequencer.stop();
        sequencer.stop();

        assert_eq!(sequencer.player().stops, 1);
        assert_eq!(sequencer.state(), SequencerState::Stopped);
        assert_eq!(sequencer.on_finished(token), Notification::Stale);
    }

    #[test]
    fn when_completion_posted_then_service_applies_it() {
        let mut sequencer = face_sequencer();
        let mailbox = sequencer.mailbox();
        sequencer.start();

        assert_eq!(sequencer.service(), None);

        mailbox.post(sequencer.player().last_token());

        assert_eq!(sequencer.service(), Some(Notification::Advanced { from: 0, to: 1 }));
        assert_eq!(sequencer.service(), None);
    }

    #[test]
    fn when_stale_posted_after_valid_then_valid_survives() {
        let mut sequencer = face_sequencer();
        let mailbox = sequencer.mailbox();
        sequencer.start();
        let stale = sequencer.player().last_token();
        finish_current(&mut sequencer);

        mailbox.post(sequencer.player().last_token());
        mailbox.post(stale);

        assert_eq!(
            sequencer.service(),
            Some(Notification::Replayed {
                clip: 1,
                remaining: 1
            })
        );
    }

    #[test]
    fn generations_skip_zero_on_wrap() {
        assert_eq!(next_generation(u32::MAX), 1);
        assert_eq!(next_generation(0), 1);
        assert_eq!(next_generation(41), 42);
    }
}
