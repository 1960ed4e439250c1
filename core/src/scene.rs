//! Procedural scenes rendered straight into a [`FrameBuffer`].
//!
//! A scene is only asked for pixels. It decides for itself what changes between frames, using
//! [`Tween`]s sampled at the frame's clock reading, so it renders correctly no matter how
//! irregularly frames arrive.

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{
    Arc, Circle, PrimitiveStyle, PrimitiveStyleBuilder, Rectangle, RoundedRectangle,
};
use rand::Rng;

use crate::clock::Millis;
use crate::config::{ConfigError, LookConfig};
use crate::easing::Easing;
use crate::frame::{drawn, FrameBuffer};
use crate::tween::{Cycle, CyclicTween, Tween};

/// Something the stage can show for a [`DisplayMode`](crate::monitor::DisplayMode).
pub trait Scene {
    /// Called when the scene becomes visible, before its first [`render`](Self::render).
    fn enter(&mut self, now: Millis);

    /// Draws the frame for `now`. Scenes own the whole buffer and are expected to clear it.
    fn render(&mut self, now: Millis, target: &mut FrameBuffer);
}

impl<S: Scene + ?Sized> Scene for Box<S> {
    fn enter(&mut self, now: Millis) {
        (**self).enter(now)
    }

    fn render(&mut self, now: Millis, target: &mut FrameBuffer) {
        (**self).render(now, target)
    }
}

/// Where the pupils can look, as offsets from the middle of each eye.
pub const LOOK_TARGETS: [(i32, i32); 8] = [
    (10, 10),
    (-10, 10),
    (10, -5),
    (-10, -5),
    (10, 20),
    (-10, 20),
    (0, 0),
    (0, 15),
];

const EYE_SIZE: Size = Size::new(60, 80);
const EYE_ORIGINS: [Point; 2] = [Point::new(60, 80), Point::new(120, 80)];
const EYE_CORNER_RADIUS: u32 = 30;
const PUPIL_MIN: u32 = 18;
const PUPIL_MAX: u32 = 22;
const BREATH_MS: u32 = 1500;

/// Two eyes that glance around at random while nobody is interacting.
///
/// Every `look_min_ms..look_max_ms` the pupils glide over `look_move_ms` towards one of
/// [`LOOK_TARGETS`]. Each glance has a one-in-four chance of picking a new direction; otherwise it
/// returns to the previous one. The pupils also slowly dilate and contract.
pub struct LookAroundEyes<R: Rng> {
    rng: R,
    config: LookConfig,
    direction: usize,
    gaze_x: Tween<i32>,
    gaze_y: Tween<i32>,
    pupil: CyclicTween<u32>,
    last_glance: Millis,
    next_glance_after: u32,
    glances: u32,
}

impl<R: Rng> LookAroundEyes<R> {
    /// Fails if `config` has an empty pause range.
    pub fn new(config: LookConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut eyes = Self {
            rng,
            config,
            direction: 0,
            gaze_x: Tween::new(Millis::ZERO, 0, 0, 0, Easing::InOutQuad),
            gaze_y: Tween::new(Millis::ZERO, 0, 0, 0, Easing::InOutQuad),
            pupil: CyclicTween::new(
                Tween::new(Millis::ZERO, PUPIL_MIN, PUPIL_MAX, BREATH_MS, Easing::InOutSine),
                Cycle::PingPong,
            ),
            last_glance: Millis::ZERO,
            next_glance_after: 0,
            glances: 0,
        };
        eyes.next_glance_after = eyes.pause();
        Ok(eyes)
    }

    /// Pupil offset from the middle of each eye at `now`.
    pub fn gaze(&self, now: Millis) -> (i32, i32) {
        (self.gaze_x.value(now), self.gaze_y.value(now))
    }

    /// Offset the pupils are moving towards, or resting at.
    pub fn target(&self) -> (i32, i32) {
        (*self.gaze_x.to(), *self.gaze_y.to())
    }

    /// Number of glances since construction.
    pub fn glances(&self) -> u32 {
        self.glances
    }

    fn pause(&mut self) -> u32 {
        self.rng
            .gen_range(self.config.look_min_ms..self.config.look_max_ms)
    }

    fn glance(&mut self, now: Millis) {
        if self.rng.gen_range(0..4) == 0 {
            self.direction = self.rng.gen_range(0..LOOK_TARGETS.len());
        }
        let (x, y) = LOOK_TARGETS[self.direction];
        self.gaze_x.retarget(now, x, self.config.look_move_ms);
        self.gaze_y.retarget(now, y, self.config.look_move_ms);
        self.last_glance = now;
        self.next_glance_after = self.pause();
        self.glances = self.glances.wrapping_add(1);
    }
}

impl<R: Rng> Scene for LookAroundEyes<R> {
    fn enter(&mut self, now: Millis) {
        let (x, y) = self.gaze(now);
        self.gaze_x.start(now, x, x, 0, Easing::InOutQuad);
        self.gaze_y.start(now, y, y, 0, Easing::InOutQuad);
        self.pupil.reset(now);
        self.last_glance = now;
        self.next_glance_after = self.pause();
    }

    fn render(&mut self, now: Millis, target: &mut FrameBuffer) {
        if now.since(self.last_glance) > self.next_glance_after as i32 {
            self.glance(now);
        }
        let (dx, dy) = self.gaze(now);
        let diameter = self.pupil.sample(now);

        let white = PrimitiveStyleBuilder::new()
            .fill_color(Rgb565::WHITE)
            .stroke_color(Rgb565::new(20, 40, 20))
            .stroke_width(2)
            .build();
        let black = PrimitiveStyle::with_fill(Rgb565::BLACK);

        drawn(target.clear(Rgb565::BLACK));
        for origin in EYE_ORIGINS {
            let eye = Rectangle::new(origin, EYE_SIZE);
            drawn(
                RoundedRectangle::with_equal_corners(
                    eye,
                    Size::new(EYE_CORNER_RADIUS, EYE_CORNER_RADIUS),
                )
                .into_styled(white)
                .draw(target),
            );
            drawn(
                Circle::with_center(eye.center() + Point::new(dx, dy), diameter)
                    .into_styled(black)
                    .draw(target),
            );
        }
    }
}

/// A loading arc that spins at a constant rate.
pub struct Spinner {
    center: Point,
    diameter: u32,
    sweep_deg: f32,
    angle: CyclicTween<f32>,
}

impl Spinner {
    /// A spinner centered at `center` that completes one turn every `period_ms`.
    pub fn new(center: Point, diameter: u32, period_ms: u32) -> Self {
        Self {
            center,
            diameter,
            sweep_deg: 90.0,
            angle: CyclicTween::new(
                Tween::new(Millis::ZERO, 0.0, 360.0, period_ms, Easing::Linear),
                Cycle::Wrap,
            ),
        }
    }

    /// Start angle of the arc at `now`, in degrees.
    pub fn angle(&mut self, now: Millis) -> f32 {
        self.angle.sample(now)
    }
}

impl Scene for Spinner {
    fn enter(&mut self, now: Millis) {
        self.angle.reset(now);
    }

    fn render(&mut self, now: Millis, target: &mut FrameBuffer) {
        let start = self.angle(now);
        drawn(target.clear(Rgb565::BLACK));
        drawn(
            Arc::with_center(self.center, self.diameter, start.deg(), self.sweep_deg.deg())
                .into_styled(PrimitiveStyle::with_stroke(Rgb565::WHITE, 6))
                .draw(target),
        );
    }
}

/// One ball of [`BouncingBalls`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub vy: f32,
}

/// Balls falling under gravity and bouncing off the bottom edge, losing energy on each bounce.
///
/// The simulation steps once per rendered frame, not per millisecond.
pub struct BouncingBalls<R: Rng> {
    rng: R,
    width: u16,
    height: u16,
    balls: Vec<Ball>,
}

impl<R: Rng> BouncingBalls<R> {
    pub const RADIUS: f32 = 12.0;
    pub const GRAVITY: f32 = 0.6;
    pub const DAMPING: f32 = 0.8;

    pub fn new(count: usize, width: u16, height: u16, rng: R) -> Self {
        let mut scene = Self {
            rng,
            width,
            height,
            balls: Vec::with_capacity(count),
        };
        scene.scatter(count);
        scene
    }

    pub fn balls(&self) -> &[Ball] {
        &self.balls
    }

    /// Advances every ball by one frame.
    pub fn step(&mut self) {
        let floor = self.height as f32 - Self::RADIUS;
        for ball in self.balls.iter_mut() {
            ball.y += ball.vy;
            ball.vy += Self::GRAVITY;
            if ball.y > floor {
                ball.y = floor;
                ball.vy = -ball.vy * Self::DAMPING;
            }
        }
    }

    fn scatter(&mut self, count: usize) {
        let (r, w, h) = (Self::RADIUS, self.width as f32, self.height as f32);
        self.balls.clear();
        for _ in 0..count {
            let x = if w > 2.0 * r {
                self.rng.gen_range(r..w - r)
            } else {
                w / 2.0
            };
            let y = if h > 2.0 * r {
                self.rng.gen_range(r..h - r)
            } else {
                h / 2.0
            };
            self.balls.push(Ball { x, y, vy: 0.0 });
        }
    }
}

impl<R: Rng> Scene for BouncingBalls<R> {
    fn enter(&mut self, _now: Millis) {
        let count = self.balls.len();
        self.scatter(count);
    }

    fn render(&mut self, _now: Millis, target: &mut FrameBuffer) {
        self.step();
        let style = PrimitiveStyle::with_fill(Rgb565::WHITE);
        let diameter = 2 * Self::RADIUS as u32 + 1;
        drawn(target.clear(Rgb565::BLACK));
        for ball in &self.balls {
            drawn(
                Circle::with_center(Point::new(ball.x as i32, ball.y as i32), diameter)
                    .into_styled(style)
                    .draw(target),
            );
        }
    }
}
