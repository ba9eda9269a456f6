//! Curve trait and implementations.
//!
//! Every curve family is generic over its [`ControlPoint`] type, so the same
//! code serves scalar (1D) and planar (`DVec2`) curves.

mod bezier;
mod bspline;
mod polyline;
mod registry;

use std::any::Any;
use std::fmt::Debug;

use curvekit_core::{CurveError, Result, EPSILON};
use curvekit_math::quadrature::integrate;
use curvekit_math::{ControlPoint, Domain};
use serde::{Deserialize, Serialize};

use crate::tessellate;

pub use bezier::BezierCurve;
pub use bspline::{BSplineCurve, KnotGeneration};
pub use polyline::{PolylineCurve, PolylineKey};
pub use registry::{CurveConstructor, CurveRegistry};

/// Stable tag identifying a concrete curve family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveKind {
    Bezier,
    BSpline,
    Polyline,
    Path,
}

/// Derivative order accepted by [`Curve::derivative`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivativeOrder {
    First,
    Second,
}

impl DerivativeOrder {
    pub fn as_usize(self) -> usize {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }
}

/// Trait for parametric curves over a real [`Domain`].
pub trait Curve<P: ControlPoint>: Debug + Send + Sync {
    fn kind(&self) -> CurveKind;

    fn domain(&self) -> Domain;

    /// Move the curve onto `domain`, re-parametrizing knots or keys.
    fn set_domain(&mut self, domain: Domain) -> Result<()>;

    fn points_count(&self) -> usize;

    fn point(&self, index: usize) -> Result<P>;

    fn set_point(&mut self, index: usize, point: P) -> Result<()>;

    /// Evaluate the curve at parameter `u`; values outside the domain are clamped.
    fn evaluate(&self, u: f64) -> P;

    fn derivative(&self, order: DerivativeOrder, u: f64) -> P;

    /// Drop every point and reset to an empty degenerate domain.
    fn clear(&mut self);

    fn clone_box(&self) -> Box<dyn Curve<P>>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Family-specific part of [`Curve::cut`].
    ///
    /// Called with `u` inside the domain and outputs of the same kind.
    fn do_cut(&self, u: f64, left: &mut dyn Curve<P>, right: &mut dyn Curve<P>) -> Result<()>;

    fn start_point(&self) -> P {
        self.evaluate(self.domain().start())
    }

    fn end_point(&self) -> P {
        self.evaluate(self.domain().end())
    }

    /// Norm of the first derivative.
    fn speed(&self, u: f64) -> f64 {
        self.derivative(DerivativeOrder::First, u).norm()
    }

    /// Arc length between `u0` and `u1` (in any order), clamped to the domain.
    fn length(&self, u0: f64, u1: f64, max_error: f64) -> f64 {
        if self.points_count() == 0 {
            return 0.0;
        }
        let domain = self.domain();
        let (a, b) = if u0 <= u1 { (u0, u1) } else { (u1, u0) };
        let (a, b) = (domain.clamp(a), domain.clamp(b));
        if b <= a {
            return 0.0;
        }
        integrate(|u| self.speed(u), a, b, max_error)
    }

    fn total_length(&self, max_error: f64) -> f64 {
        let domain = self.domain();
        self.length(domain.start(), domain.end(), max_error)
    }

    /// Parameter at arc length `curve_pos` from the start.
    ///
    /// Positions before the start or past the end snap to the domain ends.
    /// Otherwise a Newton iteration runs on `length(start, u) - curve_pos`;
    /// when it does not reach the requested relative error within
    /// `max_iterations`, [`CurveError::NoConvergence`] carries the last pivot.
    fn global_parameter(&self, curve_pos: f64, max_error: f64, max_iterations: usize) -> Result<f64> {
        let domain = self.domain();
        let start = domain.start();
        if curve_pos <= 0.0 {
            return Ok(start);
        }
        let total = self.length(start, domain.end(), max_error);
        if curve_pos >= total {
            return Ok(domain.end());
        }

        let tolerance = (2.0 * EPSILON).max(max_error);
        let mut pivot = domain.from_local(curve_pos / total);
        for iteration in 0..max_iterations {
            let error = self.length(start, pivot, max_error) - curve_pos;
            let speed = self.speed(pivot);
            log::trace!("arc-length newton #{iteration}: pivot {pivot}, error {error}");
            if speed <= EPSILON {
                break;
            }
            pivot = domain.clamp(pivot - error / speed);
            if (error / total).abs() <= tolerance {
                return Ok(pivot);
            }
        }

        log::warn!("arc-length inversion of {curve_pos} did not converge, stopped at {pivot}");
        Err(CurveError::NoConvergence { parameter: pivot })
    }

    /// Split at `u` into `left` (`[start, u]`) and `right` (`[u, end]`).
    ///
    /// Both outputs must be of this curve's kind and are overwritten.
    fn cut(&self, u: f64, left: &mut dyn Curve<P>, right: &mut dyn Curve<P>) -> Result<()> {
        let domain = self.domain();
        if !domain.contains(u) {
            return Err(CurveError::OutOfRange(format!(
                "cut parameter {u} outside [{}, {}]",
                domain.start(),
                domain.end()
            )));
        }
        if left.kind() != self.kind() || right.kind() != self.kind() {
            return Err(CurveError::UnsupportedType(format!(
                "cannot cut a {:?} curve into {:?} and {:?}",
                self.kind(),
                left.kind(),
                right.kind()
            )));
        }
        self.do_cut(domain.clamp(u), left, right)
    }

    /// Split at the point `curve_pos` units of arc length from the start.
    fn cut_by_length(
        &self,
        curve_pos: f64,
        left: &mut dyn Curve<P>,
        right: &mut dyn Curve<P>,
        max_error: f64,
    ) -> Result<()> {
        let u = self.global_parameter(curve_pos, max_error, curvekit_core::DEFAULT_MAX_ITERATIONS)?;
        self.cut(u, left, right)
    }

    /// [`Curve::cut`] into two freshly allocated curves.
    fn split(&self, u: f64) -> Result<(Box<dyn Curve<P>>, Box<dyn Curve<P>>)> {
        let mut left = self.clone_box();
        left.clear();
        let mut right = left.clone_box();
        self.cut(u, left.as_mut(), right.as_mut())?;
        Ok((left, right))
    }

    fn translate(&mut self, delta: P) -> Result<()> {
        for i in 0..self.points_count() {
            let p = self.point(i)?;
            self.set_point(i, p + delta)?;
        }
        Ok(())
    }

    /// Scale every point about `pivot`, per component.
    fn scale(&mut self, pivot: P, factor: P) -> Result<()> {
        for i in 0..self.points_count() {
            let p = self.point(i)?;
            self.set_point(i, pivot + (p - pivot).component_mul(factor))?;
        }
        Ok(())
    }

    /// Parameters the flattener always samples, in increasing order.
    fn flatten_breaks(&self) -> Vec<f64> {
        let domain = self.domain();
        vec![domain.start(), domain.end()]
    }

    /// Approximate the curve by points whose chords stay within `max_deviation`.
    fn flatten(&self, max_deviation: f64) -> Vec<P> {
        tessellate::flatten(self, max_deviation)
    }
}

impl<P: ControlPoint> Clone for Box<dyn Curve<P>> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Downcast a cut output to its concrete type.
pub fn downcast_mut<C: Any, P: ControlPoint>(curve: &mut dyn Curve<P>) -> Result<&mut C> {
    let kind = curve.kind();
    curve.as_any_mut().downcast_mut::<C>().ok_or_else(|| {
        CurveError::UnsupportedType(format!(
            "{kind:?} curve is not a {}",
            std::any::type_name::<C>()
        ))
    })
}

fn index_error(index: usize, count: usize) -> CurveError {
    CurveError::OutOfRange(format!("point index {index} out of range (count {count})"))
}
