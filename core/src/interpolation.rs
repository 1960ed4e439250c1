//! Traits and implementations related to interpolation of tweened values.

use num_traits::FromPrimitive;

/// Trait for a type that supports the standard `lerp` (**l**inear int**erp**olation) operation.
///
/// `Lerp` assumes a normalized `x` value, such that _x0_ = 0 and _x1_ = 1, which reduces the
/// straight-line equation to:
///
/// `lerp(y0, y1, x) = y0 + x(y1 - y0)`
///
/// `x` is not clamped. Easings such as [`OutBack`](crate::easing::Easing::OutBack) produce values
/// outside `0..=1`, and the result then extrapolates past the endpoints.
///
/// All primitive numeric types are `lerp`able. Integer types are interpolated in floating point
/// and rounded, which is what pixel offsets on a panel want.
pub trait Lerp {
    /// Computes the linear interpolation between this value (`y0`) and a second (`y1`) value of the
    /// same type, at normalized position `x`.
    ///
    /// # Example
    ///
    /// ```
    /// use biu_core::interpolation::Lerp;
    ///
    /// let y0: f64 = 5.0;
    /// let y1: f64 = 15.0;
    ///
    /// assert_eq!(y0.lerp(&y1, 0.0), 5.0);
    /// assert_eq!(y0.lerp(&y1, 0.25), 7.5);
    /// assert_eq!(y0.lerp(&y1, 0.5), 10.0);
    /// assert_eq!(y0.lerp(&y1, 1.0), 15.0);
    /// ```
    fn lerp(&self, y1: &Self, x: f32) -> Self;
}

// Integers go through `f32` using the `tb + (1 - t)a` form, so the subtraction never happens in the
// integer domain (no overflow for e.g. i8 -128..127). Results that do not fit saturate at the
// type's bounds, which only happens when an overshooting easing pushes past the range.
macro_rules! impl_lerp_for_integer_types {
    ($($t:ty),*) => {
        $( impl Lerp for $t {
            fn lerp(&self, y1: &Self, x: f32) -> Self {
                let result = (*self as f32).lerp(&(*y1 as f32), x).round();
                Self::from_f32(result).unwrap_or(if result < 0.0 { <$t>::MIN } else { <$t>::MAX })
            }
        }) *
    }
}

impl_lerp_for_integer_types! { i8, i16, i32, i64, u8, u16, u32, u64, usize }

impl Lerp for f32 {
    fn lerp(&self, y1: &Self, x: f32) -> Self {
        self * (1.0 - x) + y1 * x
    }
}

impl Lerp for f64 {
    fn lerp(&self, y1: &Self, x: f32) -> Self {
        self + (y1 - self) * x as f64
    }
}
