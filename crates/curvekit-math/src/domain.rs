//! Closed parameter interval owned by every curve.

use approx::AbsDiffEq;
use curvekit_core::{CurveError, Result, EPSILON};
use serde::{Deserialize, Serialize};

/// An ordered real interval `[start, end]` with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Domain {
    start: f64,
    end: f64,
}

impl Domain {
    pub fn new(start: f64, end: f64) -> Result<Self> {
        if !(start <= end) {
            return Err(CurveError::InvalidParameter(format!(
                "domain start {start} must not exceed end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn unit() -> Self {
        Self {
            start: 0.0,
            end: 1.0,
        }
    }

    /// A single-value domain.
    pub fn degenerate(at: f64) -> Self {
        Self { start: at, end: at }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_degenerate(&self) -> bool {
        self.length() <= EPSILON
    }

    /// Containment test with `EPSILON` slack on both ends.
    pub fn contains(&self, u: f64) -> bool {
        u >= self.start - EPSILON && u <= self.end + EPSILON
    }

    pub fn clamp(&self, u: f64) -> f64 {
        u.clamp(self.start, self.end)
    }

    pub fn is_start(&self, u: f64) -> bool {
        (u - self.start).abs() <= EPSILON
    }

    pub fn is_end(&self, u: f64) -> bool {
        (u - self.end).abs() <= EPSILON
    }

    /// Map `u` to `[0, 1]`; a degenerate domain maps everything to 0.
    pub fn to_local(&self, u: f64) -> f64 {
        let len = self.length();
        if len <= 0.0 {
            0.0
        } else {
            (u - self.start) / len
        }
    }

    pub fn from_local(&self, t: f64) -> f64 {
        self.start + t * self.length()
    }

    /// Same length, moved by `delta`.
    pub fn shifted(&self, delta: f64) -> Self {
        Self {
            start: self.start + delta,
            end: self.end + delta,
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Affine map from `self` onto `target`.
    ///
    /// Fails when `self` is degenerate and `target` is not, since no affine
    /// map can stretch a point into an interval.
    pub fn remap_to(&self, target: &Self) -> Result<impl Fn(f64) -> f64> {
        let len = self.length();
        let scale = if len > 0.0 {
            target.length() / len
        } else if target.length() > 0.0 {
            return Err(CurveError::InvalidParameter(
                "cannot rescale a degenerate domain".to_string(),
            ));
        } else {
            1.0
        };
        let (from, to) = (self.start, target.start);
        Ok(move |u: f64| to + (u - from) * scale)
    }
}

impl AbsDiffEq for Domain {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.start.abs_diff_eq(&other.start, epsilon) && self.end.abs_diff_eq(&other.end, epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_reversed_domain_rejected() {
        assert!(Domain::new(1.0, 0.0).is_err());
        assert!(Domain::new(f64::NAN, 0.0).is_err());
        assert!(Domain::new(2.0, 2.0).unwrap().is_degenerate());
    }

    #[test]
    fn test_local_mapping() {
        let d = Domain::new(2.0, 6.0).unwrap();
        assert_eq!(d.to_local(3.0), 0.25);
        assert_eq!(d.from_local(0.5), 4.0);
        assert_eq!(Domain::degenerate(1.0).to_local(5.0), 0.0);
    }

    #[test]
    fn test_contains_with_slack() {
        let d = Domain::unit();
        assert!(d.contains(1.0 + EPSILON * 0.5));
        assert!(!d.contains(1.1));
        assert!(d.is_end(1.0 - EPSILON * 0.5));
    }

    #[test]
    fn test_remap() {
        let from = Domain::new(0.0, 2.0).unwrap();
        let to = Domain::new(10.0, 11.0).unwrap();
        let map = from.remap_to(&to).unwrap();
        assert_abs_diff_eq!(map(1.0), 10.5);
        assert!(Domain::degenerate(0.0).remap_to(&to).is_err());
        let shift = Domain::degenerate(0.0).remap_to(&Domain::degenerate(3.0)).unwrap();
        assert_abs_diff_eq!(shift(0.0), 3.0);
    }

    #[test]
    fn test_shift_and_union() {
        let d = Domain::unit().shifted(2.0);
        assert_abs_diff_eq!(d, Domain::new(2.0, 3.0).unwrap());
        let u = d.union(&Domain::unit());
        assert_eq!((u.start(), u.end()), (0.0, 3.0));
    }
}
