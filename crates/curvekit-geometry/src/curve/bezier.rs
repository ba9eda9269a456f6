//! Bezier curves in the Bernstein basis.

use std::any::Any;
use std::sync::OnceLock;

use curvekit_core::{CurveError, Result};
use curvekit_math::binomial::binomial_row;
use curvekit_math::{ControlPoint, Domain};
use serde::{Deserialize, Serialize};

use super::{downcast_mut, index_error, Curve, CurveKind, DerivativeOrder};

/// A Bezier curve of degree `points.len() - 1` over an arbitrary domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BezierCurve<P> {
    domain: Domain,
    points: Vec<P>,
    /// Control points of the first derivative, scaled to the domain.
    #[serde(skip)]
    first: OnceLock<Vec<P>>,
    #[serde(skip)]
    second: OnceLock<Vec<P>>,
}

impl<P: ControlPoint> BezierCurve<P> {
    pub fn new(points: &[P], domain: Domain) -> Result<Self> {
        let mut curve = Self::default();
        curve.set_points(points, domain)?;
        Ok(curve)
    }

    /// Replace all control points and the domain.
    pub fn set_points(&mut self, points: &[P], domain: Domain) -> Result<()> {
        if points.is_empty() {
            return Err(CurveError::InvalidParameter(
                "a Bezier curve needs at least one point".to_string(),
            ));
        }
        let mut owned = Vec::new();
        owned.try_reserve_exact(points.len())?;
        owned.extend_from_slice(points);
        self.points = owned;
        self.domain = domain;
        self.invalidate();
        Ok(())
    }

    pub fn degree(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    pub fn points(&self) -> &[P] {
        &self.points
    }

    fn invalidate(&mut self) {
        self.first = OnceLock::new();
        self.second = OnceLock::new();
    }

    fn first_differences(&self) -> &[P] {
        self.first
            .get_or_init(|| scaled_differences(&self.points, self.domain.length()))
    }

    fn second_differences(&self) -> &[P] {
        self.second
            .get_or_init(|| scaled_differences(self.first_differences(), self.domain.length()))
    }

    fn local(&self, u: f64) -> f64 {
        self.domain.to_local(u).clamp(0.0, 1.0)
    }

    /// Raise the degree by `k` without changing the shape.
    pub fn higher_degree(&mut self, k: usize) {
        if k == 0 || self.points.is_empty() {
            return;
        }
        self.points = elevate_points(&self.points, k);
        self.invalidate();
    }

    /// Lower the degree by one, approximately.
    ///
    /// Exact when the curve came from an elevation.
    pub fn lower_degree(&mut self) -> Result<()> {
        self.points = reduce_points(&self.points)?;
        self.invalidate();
        Ok(())
    }

    pub fn lower_degree_by(&mut self, k: usize) -> Result<()> {
        if k > self.degree() {
            return Err(CurveError::OutOfRange(format!(
                "cannot lower degree {} by {k}",
                self.degree()
            )));
        }
        let mut points = self.points.clone();
        for _ in 0..k {
            points = reduce_points(&points)?;
        }
        self.points = points;
        self.invalidate();
        Ok(())
    }

    /// Length of the control polygon, an upper bound of the arc length.
    pub fn control_polygon_length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    /// Whether every control point lies within `tolerance` of the chord.
    pub fn is_flat(&self, tolerance: f64) -> bool {
        match self.points.as_slice() {
            [] | [_] | [_, _] => true,
            [first, inner @ .., last] => inner
                .iter()
                .all(|p| p.distance_to_segment(*first, *last) <= tolerance),
        }
    }
}

/// Evaluate Bernstein coefficients at local `t` with Horner's scheme.
fn horner<P: ControlPoint>(points: &[P], t: f64) -> P {
    let Some((&first, rest)) = points.split_first() else {
        return P::ZERO;
    };
    let n = rest.len();
    if n == 0 {
        return first;
    }
    let s = 1.0 - t;
    let mut tn = 1.0;
    let mut bc = 1.0;
    let mut acc = first * s;
    for (i, &p) in rest[..n - 1].iter().enumerate() {
        let i = i + 1;
        tn *= t;
        bc *= (n - i + 1) as f64 / i as f64;
        acc = (acc + p * (tn * bc)) * s;
    }
    acc + rest[n - 1] * (tn * t)
}

/// Control points of the hodograph: `n / len * (P[i+1] - P[i])`.
fn scaled_differences<P: ControlPoint>(points: &[P], len: f64) -> Vec<P> {
    if points.len() < 2 || len <= 0.0 {
        return Vec::new();
    }
    let n = (points.len() - 1) as f64;
    points.windows(2).map(|w| (w[1] - w[0]) * (n / len)).collect()
}

/// Degree elevation by `k` in one step.
pub fn elevate_points<P: ControlPoint>(points: &[P], k: usize) -> Vec<P> {
    let n = points.len() - 1;
    let bn = binomial_row(n);
    let bk = binomial_row(k);
    let bnk = binomial_row(n + k);
    (0..=n + k)
        .map(|i| {
            let lo = i.saturating_sub(k);
            let hi = i.min(n);
            let mut q = P::ZERO;
            for j in lo..=hi {
                q += points[j] * (bn[j] * bk[i - j] / bnk[i]);
            }
            q
        })
        .collect()
}

/// Degree reduction by one.
///
/// The elevation equations `P[i] = a[i] Q[i-1] + (1 - a[i]) Q[i]` with
/// `a[i] = i / p` are solved from both ends toward the middle. The same
/// extrapolation is repeated on the reversed points, and the two solutions
/// are blended with a linear ramp.
pub fn reduce_points<P: ControlPoint>(points: &[P]) -> Result<Vec<P>> {
    if points.len() < 2 {
        return Err(CurveError::OutOfRange(
            "cannot lower the degree of a constant curve".to_string(),
        ));
    }
    let p = points.len() - 1;
    let forward = extrapolate_halves(points);
    let reversed: Vec<P> = points.iter().rev().copied().collect();
    let mut backward = extrapolate_halves(&reversed);
    backward.reverse();

    Ok(forward
        .iter()
        .zip(&backward)
        .enumerate()
        .map(|(i, (&f, &b))| {
            let lambda = if p == 1 { 0.5 } else { i as f64 / (p - 1) as f64 };
            f.lerp(b, lambda)
        })
        .collect())
}

/// Odd/even extrapolation: indices up to `r = (p - 1) / 2` come from the
/// start, the rest from the end, and an odd degree averages both estimates
/// of `Q[r]`.
fn extrapolate_halves<P: ControlPoint>(points: &[P]) -> Vec<P> {
    let p = points.len() - 1;
    let r = (p - 1) / 2;
    let alpha = |i: usize| i as f64 / p as f64;

    let mut q = vec![P::ZERO; p];
    q[0] = points[0];
    for i in 1..=r {
        let a = alpha(i);
        q[i] = (points[i] - q[i - 1] * a) / (1.0 - a);
    }
    if p >= 2 {
        q[p - 1] = points[p];
    }
    for i in (r + 1..p.saturating_sub(1)).rev() {
        let a = alpha(i + 1);
        q[i] = (points[i + 1] - q[i + 1] * (1.0 - a)) / a;
    }

    if p % 2 == 1 {
        let right = if r + 1 == p {
            points[p]
        } else {
            let a = alpha(r + 1);
            (points[r + 1] - q[r + 1] * (1.0 - a)) / a
        };
        q[r] = q[r].lerp(right, 0.5);
    }
    q
}

impl<P: ControlPoint> Curve<P> for BezierCurve<P> {
    fn kind(&self) -> CurveKind {
        CurveKind::Bezier
    }

    fn domain(&self) -> Domain {
        self.domain
    }

    fn set_domain(&mut self, domain: Domain) -> Result<()> {
        self.domain = domain;
        self.invalidate();
        Ok(())
    }

    fn points_count(&self) -> usize {
        self.points.len()
    }

    fn point(&self, index: usize) -> Result<P> {
        self.points
            .get(index)
            .copied()
            .ok_or_else(|| index_error(index, self.points.len()))
    }

    fn set_point(&mut self, index: usize, point: P) -> Result<()> {
        let count = self.points.len();
        let slot = self
            .points
            .get_mut(index)
            .ok_or_else(|| index_error(index, count))?;
        *slot = point;
        self.invalidate();
        Ok(())
    }

    fn evaluate(&self, u: f64) -> P {
        horner(&self.points, self.local(u))
    }

    fn derivative(&self, order: DerivativeOrder, u: f64) -> P {
        let t = self.local(u);
        match order {
            DerivativeOrder::First => horner(self.first_differences(), t),
            DerivativeOrder::Second => horner(self.second_differences(), t),
        }
    }

    fn clear(&mut self) {
        self.points.clear();
        self.domain = Domain::default();
        self.invalidate();
    }

    fn clone_box(&self) -> Box<dyn Curve<P>> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn do_cut(&self, u: f64, left: &mut dyn Curve<P>, right: &mut dyn Curve<P>) -> Result<()> {
        let left = downcast_mut::<Self, P>(left)?;
        let right = downcast_mut::<Self, P>(right)?;
        if self.points.is_empty() || self.domain.is_start(u) {
            left.clear();
            *right = self.clone();
            return Ok(());
        }
        if self.domain.is_end(u) {
            *left = self.clone();
            right.clear();
            return Ok(());
        }

        // De Casteljau: the outer edges of the triangle are the two halves
        let t = self.local(u);
        let n = self.points.len();
        let mut work = self.points.clone();
        let mut lhs = Vec::with_capacity(n);
        let mut rhs = vec![P::ZERO; n];
        lhs.push(work[0]);
        rhs[n - 1] = work[n - 1];
        for k in 1..n {
            for i in 0..n - k {
                work[i] = work[i].lerp(work[i + 1], t);
            }
            lhs.push(work[0]);
            rhs[n - 1 - k] = work[n - 1 - k];
        }

        let left_domain = Domain::new(self.domain.start(), u)?;
        let right_domain = Domain::new(u, self.domain.end())?;
        left.set_points(&lhs, left_domain)?;
        right.set_points(&rhs, right_domain)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use curvekit_math::{dvec2, DVec2};

    fn hump() -> BezierCurve<f64> {
        BezierCurve::new(&[0.0, 3.0, 3.0, 0.0], Domain::unit()).unwrap()
    }

    #[test]
    fn test_evaluate_cubic() {
        let c = hump();
        assert_eq!(c.degree(), 3);
        assert_abs_diff_eq!(c.evaluate(0.0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c.evaluate(0.5), 2.25, epsilon = 1e-12);
        assert_abs_diff_eq!(c.evaluate(1.0), 0.0, epsilon = 1e-12);
        // Out of domain values clamp
        assert_abs_diff_eq!(c.evaluate(-2.0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_points_rejected() {
        let err = BezierCurve::<f64>::new(&[], Domain::unit()).unwrap_err();
        assert!(matches!(err, CurveError::InvalidParameter(_)));
    }

    #[test]
    fn test_derivatives_follow_domain() {
        // C(t) = 2t + t^2 on [0, 1]
        let mut c = BezierCurve::new(&[0.0, 1.0, 3.0], Domain::unit()).unwrap();
        assert_abs_diff_eq!(c.derivative(DerivativeOrder::First, 0.5), 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c.derivative(DerivativeOrder::Second, 0.5), 2.0, epsilon = 1e-12);

        // Doubling the domain halves the first derivative
        c.set_domain(Domain::new(0.0, 2.0).unwrap()).unwrap();
        assert_abs_diff_eq!(c.derivative(DerivativeOrder::First, 1.0), 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(c.derivative(DerivativeOrder::Second, 1.0), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_set_point_invalidates_cache() {
        let mut c = BezierCurve::new(&[0.0, 1.0], Domain::unit()).unwrap();
        assert_abs_diff_eq!(c.derivative(DerivativeOrder::First, 0.5), 1.0, epsilon = 1e-12);
        c.set_point(1, 4.0).unwrap();
        assert_abs_diff_eq!(c.derivative(DerivativeOrder::First, 0.5), 4.0, epsilon = 1e-12);
        assert!(c.set_point(2, 0.0).is_err());
    }

    #[test]
    fn test_cut_halves_match() {
        let c = BezierCurve::new(
            &[dvec2(0.0, 0.0), dvec2(1.0, 2.0), dvec2(3.0, 2.0), dvec2(4.0, 0.0)],
            Domain::new(1.0, 3.0).unwrap(),
        )
        .unwrap();
        let mut left = BezierCurve::default();
        let mut right = BezierCurve::default();
        c.cut(1.5, &mut left, &mut right).unwrap();

        assert_abs_diff_eq!(left.domain().end(), 1.5);
        assert_abs_diff_eq!(right.domain().start(), 1.5);
        for u in [1.0, 1.2, 1.5] {
            assert!((left.evaluate(u) - c.evaluate(u)).length() < 1e-12);
        }
        for u in [1.5, 2.2, 3.0] {
            assert!((right.evaluate(u) - c.evaluate(u)).length() < 1e-12);
        }
    }

    #[test]
    fn test_cut_at_boundary() {
        let c = hump();
        let mut left = BezierCurve::default();
        let mut right = BezierCurve::default();
        c.cut(1.0, &mut left, &mut right).unwrap();
        assert_eq!(left.points(), c.points());
        assert_eq!(right.points_count(), 0);
    }

    #[test]
    fn test_elevate_then_reduce() {
        let mut c = BezierCurve::new(
            &[dvec2(0.0, 0.0), dvec2(1.0, 3.0), dvec2(2.0, -1.0), dvec2(4.0, 0.0)],
            Domain::unit(),
        )
        .unwrap();
        let original = c.clone();
        c.higher_degree(2);
        assert_eq!(c.degree(), 5);
        for i in 0..=10 {
            let u = i as f64 / 10.0;
            assert!((c.evaluate(u) - original.evaluate(u)).length() < 1e-12);
        }
        c.lower_degree_by(2).unwrap();
        assert_eq!(c.degree(), 3);
        for (a, b) in c.points().iter().zip(original.points()) {
            assert!((*a - *b).length() < 1e-9);
        }
    }

    #[test]
    fn test_reduce_line_to_constant_midpoint() {
        let reduced = reduce_points(&[dvec2(0.0, 0.0), dvec2(2.0, 2.0)]).unwrap();
        assert_eq!(reduced, vec![DVec2::new(1.0, 1.0)]);
        assert!(reduce_points(&[1.0]).is_err());
    }

    #[test]
    fn test_reduce_quartic_from_both_ends() {
        let reduced = reduce_points(&[
            dvec2(0.0, 0.0),
            dvec2(1.0, 3.0),
            dvec2(2.0, -3.0),
            dvec2(3.0, 3.0),
            dvec2(4.0, 0.0),
        ])
        .unwrap();
        let expected = [
            dvec2(0.0, 0.0),
            dvec2(4.0 / 3.0, 4.0),
            dvec2(8.0 / 3.0, 4.0),
            dvec2(4.0, 0.0),
        ];
        assert_eq!(reduced.len(), expected.len());
        for (a, b) in reduced.iter().zip(&expected) {
            assert!((*a - *b).length() < 1e-12, "{a} != {b}");
        }
    }

    #[test]
    fn test_reduce_cubic_averages_middle() {
        let reduced = reduce_points(&[dvec2(0.0, 0.0), dvec2(1.0, 2.0), dvec2(2.0, -2.0), dvec2(3.0, 0.0)])
            .unwrap();
        let expected = [dvec2(0.0, 0.0), dvec2(1.5, 0.0), dvec2(3.0, 0.0)];
        for (a, b) in reduced.iter().zip(&expected) {
            assert!((*a - *b).length() < 1e-12, "{a} != {b}");
        }
    }

    #[test]
    fn test_flatness() {
        let flat = BezierCurve::new(&[dvec2(0.0, 0.0), dvec2(1.0, 0.0), dvec2(2.0, 0.0)], Domain::unit())
            .unwrap();
        assert!(flat.is_flat(1e-9));
        assert_abs_diff_eq!(flat.control_polygon_length(), 2.0);
        assert!(!hump().is_flat(0.5));
    }
}
