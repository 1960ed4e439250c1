//! Timed, eased interpolation between two values.
//!
//! A [`Tween`] never pushes updates. The render loop pulls [`Tween::value`] once per frame with the
//! current clock reading, so frame pacing stays entirely in the hands of whoever drives the loop
//! and nothing here ever sleeps.

use crate::clock::Millis;
use crate::easing::{Easing, EasingFunction};
use crate::interpolation::Lerp;

/// A single timed interpolation from one value to another.
///
/// The tween is armed with the clock reading at which it starts. Afterward it is immutable except
/// for re-arming (any of [`start`](Self::start), [`restart`](Self::restart),
/// [`reverse`](Self::reverse) or [`retarget`](Self::retarget)), which always preempts whatever was
/// in flight. Queries can be made any number of times without side effects.
///
/// # Example
///
/// ```
/// use biu_core::clock::Millis;
/// use biu_core::easing::Easing;
/// use biu_core::tween::Tween;
///
/// let tween = Tween::new(Millis(1000), 0.0, 100.0, 1000, Easing::InOutQuad);
///
/// assert_eq!(tween.value(Millis(1000)), 0.0);
/// assert_eq!(tween.value(Millis(1500)), 50.0);
/// assert_eq!(tween.value(Millis(2000)), 100.0);
/// assert!(tween.is_done(Millis(2000)));
/// ```
#[derive(Clone, Debug)]
pub struct Tween<T = f64> {
    from: T,
    to: T,
    start_time: Millis,
    duration_ms: u32,
    easing: Easing,
}

impl<T: Lerp + Clone> Tween<T> {
    /// Creates a tween armed at `now`.
    ///
    /// A `duration_ms` of zero is allowed and means the tween is already done.
    pub fn new(now: Millis, from: T, to: T, duration_ms: u32, easing: Easing) -> Self {
        Self {
            from,
            to,
            start_time: now,
            duration_ms,
            easing,
        }
    }

    /// Creates a tween that is already at rest at `value`.
    pub fn settled(value: T) -> Self {
        Self::new(Millis::ZERO, value.clone(), value, 0, Easing::Linear)
    }

    /// Re-arms the tween, overwriting every field.
    pub fn start(&mut self, now: Millis, from: T, to: T, duration_ms: u32, easing: Easing) {
        *self = Self::new(now, from, to, duration_ms, easing);
    }

    /// Re-arms with the same endpoints. Calling this each time the tween finishes produces a
    /// sawtooth.
    pub fn restart(&mut self, now: Millis) {
        self.start_time = now;
    }

    /// Re-arms with `from` and `to` swapped. Calling this each time the tween finishes produces a
    /// triangle wave.
    pub fn reverse(&mut self, now: Millis) {
        std::mem::swap(&mut self.from, &mut self.to);
        self.start_time = now;
    }

    /// Re-arms from wherever the tween currently is towards a new target, keeping the easing.
    pub fn retarget(&mut self, now: Millis, to: T, duration_ms: u32) {
        self.from = self.value(now);
        self.to = to;
        self.start_time = now;
        self.duration_ms = duration_ms;
    }

    /// Normalized time, clamped to `0.0..=1.0`.
    pub fn progress(&self, now: Millis) -> f32 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        let elapsed = elapsed(now, self.start_time);
        if elapsed <= 0 {
            return 0.0;
        }
        (elapsed as f32 / self.duration_ms as f32).clamp(0.0, 1.0)
    }

    /// The interpolated value at `now`.
    pub fn value(&self, now: Millis) -> T {
        let eased = self.easing.calc(self.progress(now));
        self.from.lerp(&self.to, eased)
    }

    /// Whether at least `duration` has elapsed since the tween was armed.
    pub fn is_done(&self, now: Millis) -> bool {
        self.duration_ms == 0 || elapsed(now, self.start_time) >= i64::from(self.duration_ms)
    }

    /// Value at the start of the current run.
    pub fn from(&self) -> &T {
        &self.from
    }

    /// Value the tween settles on.
    pub fn to(&self) -> &T {
        &self.to
    }

    /// Clock reading at which the current run was armed.
    pub fn start_time(&self) -> Millis {
        self.start_time
    }

    /// Length of the current run.
    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }

    /// Clock reading at which the tween is done.
    pub fn end_time(&self) -> Millis {
        self.start_time + self.duration_ms
    }

    /// Shape applied to the progress.
    pub fn easing(&self) -> &Easing {
        &self.easing
    }
}

/// Milliseconds from `start` to `now`. Readings far behind `start` are taken as the counter having
/// wrapped past it, so a tween left unsampled for weeks still reads as finished.
fn elapsed(now: Millis, start: Millis) -> i64 {
    let since = now.since(start);
    if since < i32::MIN / 2 {
        i64::from(since as u32)
    } else {
        i64::from(since)
    }
}

/// What a [`CyclicTween`] does once its tween is done.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Cycle {
    /// Stop at `to`.
    #[default]
    Once,
    /// Jump back to `from` and play again (sawtooth), as for a spinner.
    Wrap,
    /// Swap the endpoints and play back (triangle wave), as for a breathing glow.
    PingPong,
}

/// A [`Tween`] that re-arms itself according to a [`Cycle`] policy whenever it is sampled after
/// finishing.
///
/// A new segment starts where the previous one ended rather than at the sampling time, so slow
/// frames do not make the cycle drift. If sampling stalls for longer than a whole segment the
/// cycle is re-anchored at the sampling time instead of replaying missed segments.
#[derive(Clone, Debug)]
pub struct CyclicTween<T = f64> {
    tween: Tween<T>,
    cycle: Cycle,
    segments: u32,
}

impl<T: Lerp + Clone> CyclicTween<T> {
    pub fn new(tween: Tween<T>, cycle: Cycle) -> Self {
        Self {
            tween,
            cycle,
            segments: 0,
        }
    }

    /// Re-arms if the current segment is done, then returns the value at `now`.
    pub fn sample(&mut self, now: Millis) -> T {
        if self.cycle != Cycle::Once && self.tween.is_done(now) && self.tween.duration_ms() > 0 {
            let end = self.tween.end_time();
            let next_start = if elapsed(now, end) < i64::from(self.tween.duration_ms()) {
                end
            } else {
                now
            };
            match self.cycle {
                Cycle::Wrap => self.tween.restart(next_start),
                Cycle::PingPong => self.tween.reverse(next_start),
                Cycle::Once => {}
            }
            self.segments = self.segments.wrapping_add(1);
        }
        self.tween.value(now)
    }

    /// Restarts the current segment at `now`. After an odd number of ping-pong segments this runs
    /// from the original end back to the original start.
    pub fn reset(&mut self, now: Millis) {
        self.tween.restart(now);
    }

    /// Number of times the tween has been re-armed.
    pub fn segments(&self) -> u32 {
        self.segments
    }

    /// The segment currently being played.
    pub fn tween(&self) -> &Tween<T> {
        &self.tween
    }

    /// What happens when a segment finishes.
    pub fn cycle(&self) -> Cycle {
        self.cycle
    }
}
