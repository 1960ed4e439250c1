//! Contains the [`Easing`] enum which defines the easing curves available to tweens, as well as an
//! [`EasingFunction`] trait for defining custom easings.

use dyn_clone::{clone_trait_object, DynClone};
use lazy_static::lazy_static;
use lyon_geom::{CubicBezierSegment, Point};
use std::f32::consts::PI;
use std::fmt::Debug;

/// Provides an easing function, AKA animation timing function, for non-linear interpolation of
/// values along some curve.
///
/// Easing functions and [`Lerp`](crate::interpolation::Lerp) are complementary: the easing remaps
/// normalized time, and the lerp turns the remapped time into a value between the two endpoints of
/// a [`Tween`](crate::tween::Tween).
pub trait EasingFunction: Debug + DynClone + Send + Sync {
    /// Computes the `y` value along the curve for a given `x` position.
    ///
    /// Expects `x` to be normalized (from 0 to 1) and returns a normalized y-value which is
    /// typically between 0 and 1, but may be outside that range (e.g. [`Easing::OutBack`]).
    fn calc(&self, x: f32) -> f32;
}

clone_trait_object!(EasingFunction);

/// Specifies a standard or custom [`EasingFunction`].
///
/// The polynomial, sine and back curves are evaluated in closed form, so their fixed points are
/// exact; for example `InOutQuad` returns exactly `0.5` at `x = 0.5`. The CSS curves are cubic
/// beziers.
#[derive(Clone, Debug, Default)]
pub enum Easing {
    /// Linear easing, i.e. no easing or curve, only straight-line interpolation.
    #[default]
    Linear,
    /// Curve equivalent to CSS
    /// [`ease`](https://developer.mozilla.org/en-US/docs/Web/CSS/easing-function#ease).
    Ease,
    /// Curve equivalent to CSS
    /// [`ease-in`](https://developer.mozilla.org/en-US/docs/Web/CSS/easing-function#ease-in).
    In,
    /// Curve equivalent to CSS
    /// [`ease-out`](https://developer.mozilla.org/en-US/docs/Web/CSS/easing-function#ease-out).
    Out,
    /// Curve equivalent to CSS
    /// [`ease-in-out`](https://developer.mozilla.org/en-US/docs/Web/CSS/easing-function#ease-in-out).
    InOut,
    /// Quadratic (`x^2`) easing that starts slowly and ends quickly.
    ///
    /// See: <https://easings.net/#easeInQuad>
    InQuad,
    /// Quadratic easing that starts quickly and ends slowly.
    ///
    /// See: <https://easings.net/#easeOutQuad>
    OutQuad,
    /// Quadratic easing that starts slowly, speeds up, and then ends slowly. This is the
    /// smooth-step curve used for pupil movement, the same shape as LVGL's `lv_anim_path_ease_in_out`.
    ///
    /// See: <https://easings.net/#easeInOutQuad>
    InOutQuad,
    /// Cubic (`x^3`) easing that starts slowly and ends quickly.
    ///
    /// See: <https://easings.net/#easeInCubic>
    InCubic,
    /// Cubic easing that starts quickly and ends slowly.
    ///
    /// See: <https://easings.net/#easeOutCubic>
    OutCubic,
    /// Cubic easing that starts slowly, speeds up, and then ends slowly. Slightly steeper than
    /// [`InOutQuad`](Self::InOutQuad).
    ///
    /// See: <https://easings.net/#easeInOutCubic>
    InOutCubic,
    /// Sinusoidal easing that starts slowly and ends quickly. Subtle, almost linear curve.
    ///
    /// See: <https://easings.net/#easeInSine>
    InSine,
    /// Sinusoidal easing that starts quickly and ends slowly.
    ///
    /// See: <https://easings.net/#easeOutSine>
    OutSine,
    /// Sinusoidal easing that starts slowly, speeds up, and then ends slowly.
    ///
    /// See: <https://easings.net/#easeInOutSine>
    InOutSine,
    /// Moves slightly backward (negative) before accelerating forward.
    ///
    /// See: <https://easings.net/#easeInBack>
    InBack,
    /// Overshoots the terminal value (goes above 1.0) before settling at the final value.
    ///
    /// See: <https://easings.net/#easeOutBack>
    OutBack,
    /// User-defined easing, such as an ad-hoc [`CubicBezierEasing`].
    Custom(Box<dyn EasingFunction>),
}

const BACK_C1: f32 = 1.70158;
const BACK_C3: f32 = BACK_C1 + 1.0;

impl EasingFunction for Easing {
    fn calc(&self, x: f32) -> f32 {
        match self {
            Self::Linear => x,
            Self::Ease => EASE_WEB.calc(x),
            Self::In => EASE_IN.calc(x),
            Self::Out => EASE_OUT.calc(x),
            Self::InOut => EASE_IN_OUT.calc(x),
            Self::InQuad => x * x,
            Self::OutQuad => 1.0 - (1.0 - x) * (1.0 - x),
            Self::InOutQuad => {
                if x < 0.5 {
                    2.0 * x * x
                } else {
                    1.0 - (-2.0 * x + 2.0).powi(2) / 2.0
                }
            }
            Self::InCubic => x * x * x,
            Self::OutCubic => 1.0 - (1.0 - x).powi(3),
            Self::InOutCubic => {
                if x < 0.5 {
                    4.0 * x * x * x
                } else {
                    1.0 - (-2.0 * x + 2.0).powi(3) / 2.0
                }
            }
            Self::InSine => 1.0 - (x * PI / 2.0).cos(),
            Self::OutSine => (x * PI / 2.0).sin(),
            Self::InOutSine => -((PI * x).cos() - 1.0) / 2.0,
            Self::InBack => BACK_C3 * x * x * x - BACK_C1 * x * x,
            Self::OutBack => {
                1.0 + BACK_C3 * (x - 1.0).powi(3) + BACK_C1 * (x - 1.0).powi(2)
            }
            Self::Custom(custom) => custom.calc(x),
        }
    }
}

lazy_static! {
    static ref EASE_WEB: CubicBezierEasing = CubicBezierEasing::new(0.25, 0.1, 0.25, 1.0);
    static ref EASE_IN: CubicBezierEasing = CubicBezierEasing::new(0.42, 0.0, 1.0, 1.0);
    static ref EASE_OUT: CubicBezierEasing = CubicBezierEasing::new(0.0, 0.0, 0.58, 1.0);
    static ref EASE_IN_OUT: CubicBezierEasing = CubicBezierEasing::new(0.42, 0.0, 0.58, 1.0);
}

/// Easing function defined by a cubic bezier curve with the start and end points fixed at `(0, 0)`
/// and `(1, 1)`, i.e. only the control points are specified.
///
/// Instances may be created and used in [`Easing::Custom`] when the standard easings do not
/// suffice.
#[derive(Clone, Debug)]
pub struct CubicBezierEasing {
    segment: CubicBezierSegment<f32>,
}

impl CubicBezierEasing {
    /// Creates a new [`CubicBezierEasing`] with control points `(x1, y1)` and `(x2, y2)`.
    ///
    /// To experiment with different curves, see: <https://cubic-bezier.com/>
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            segment: CubicBezierSegment {
                from: Point::new(0.0, 0.0),
                to: Point::new(1.0, 1.0),
                ctrl1: Point::new(x1, y1),
                ctrl2: Point::new(x2, y2),
            },
        }
    }
}

impl EasingFunction for CubicBezierEasing {
    fn calc(&self, x: f32) -> f32 {
        if x <= 0.0 || x >= 1.0 {
            return x;
        }
        // The curve is parametric, so `x` first has to be mapped back to the bezier parameter.
        let t = self
            .segment
            .solve_t_for_x(x)
            .iter()
            .copied()
            .find(|t| (0.0..=1.0).contains(t))
            .unwrap_or(x);
        self.segment.y(t)
    }
}
