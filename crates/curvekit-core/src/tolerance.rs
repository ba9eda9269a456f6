/// Equality tolerance used for domains, points and parameters.
///
/// Derived from single precision machine epsilon so that data coming from
/// `f32` sources (font outlines, SVG numbers) still compares equal.
pub const EPSILON: f64 = f32::EPSILON as f64;

/// Default absolute error for arc-length quadrature.
pub const DEFAULT_MAX_ERROR: f64 = 1e-7;

/// Default iteration cap for arc-length inversion.
pub const DEFAULT_MAX_ITERATIONS: usize = 32;

/// Tolerances a path uses to decide whether end points meet.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tolerance {
    /// Linear tolerance for distance comparisons (in model units)
    pub linear: f64,
}

impl Tolerance {
    pub const DEFAULT_LINEAR: f64 = EPSILON;

    pub fn new(linear: f64) -> Self {
        Self { linear }
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LINEAR)
    }
}
