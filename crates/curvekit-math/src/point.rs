//! Values a curve can interpolate: scalars for 1D curves, `DVec2` for 2D ones.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};

use glam::DVec2;

/// Vector-space operations shared by every control point type.
pub trait ControlPoint:
    Copy
    + Debug
    + Default
    + PartialEq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
    + AddAssign
    + SubAssign
    + Send
    + Sync
    + 'static
{
    const ZERO: Self;

    /// Euclidean length.
    fn norm(self) -> f64;

    fn dot(self, other: Self) -> f64;

    /// Per-component product, used for non-uniform scaling.
    fn component_mul(self, other: Self) -> Self;

    fn distance(self, other: Self) -> f64 {
        (self - other).norm()
    }

    fn approx_eq(self, other: Self, tolerance: f64) -> bool {
        self.distance(other) <= tolerance
    }

    fn lerp(self, other: Self, t: f64) -> Self {
        self * (1.0 - t) + other * t
    }

    /// Distance from `self` to the segment `[a, b]`.
    fn distance_to_segment(self, a: Self, b: Self) -> f64 {
        let ab = b - a;
        let len2 = ab.dot(ab);
        if len2 <= f64::MIN_POSITIVE {
            return self.distance(a);
        }
        let t = ((self - a).dot(ab) / len2).clamp(0.0, 1.0);
        self.distance(a + ab * t)
    }
}

impl ControlPoint for f64 {
    const ZERO: Self = 0.0;

    fn norm(self) -> f64 {
        self.abs()
    }

    fn dot(self, other: Self) -> f64 {
        self * other
    }

    fn component_mul(self, other: Self) -> Self {
        self * other
    }
}

impl ControlPoint for DVec2 {
    const ZERO: Self = DVec2::ZERO;

    fn norm(self) -> f64 {
        self.length()
    }

    fn dot(self, other: Self) -> f64 {
        DVec2::dot(self, other)
    }

    fn component_mul(self, other: Self) -> Self {
        self * other
    }
}
