//! Non-rational B-spline curves.

use std::any::Any;

use curvekit_core::{CurveError, Result, Validate, EPSILON};
use curvekit_math::{ControlPoint, Domain};
use serde::{Deserialize, Serialize};

use super::bezier::{elevate_points, reduce_points};
use super::{downcast_mut, index_error, Curve, CurveKind, DerivativeOrder};
use crate::nurbs::{self, deboor, knot, removal, BasisScratch, EndCondition};

/// How [`BSplineCurve::set_points`] lays out the knot vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnotGeneration {
    /// Evenly spaced knots across the domain.
    Uniform,
    /// Knots averaged from square-root chord parameters; always clamped.
    Centripetal,
}

/// A B-spline curve defined by degree, knot vector, and control points.
///
/// The domain is `[knots[degree], knots[len - degree - 1]]`. A curve is
/// *opened* when both ends carry `degree + 1` equal knots, so it passes
/// through its first and last control points.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BSplineCurve<P> {
    domain: Domain,
    degree: usize,
    knots: Vec<f64>,
    points: Vec<P>,
    opened: bool,
    uniform: bool,
}

impl<P: ControlPoint> BSplineCurve<P> {
    pub fn new(
        points: &[P],
        degree: usize,
        generation: KnotGeneration,
        opened: bool,
        domain: Domain,
    ) -> Result<Self> {
        let mut curve = Self::default();
        curve.set_points(points, degree, generation, opened, domain)?;
        Ok(curve)
    }

    pub fn with_knots(points: &[P], knots: &[f64], degree: usize) -> Result<Self> {
        let mut curve = Self::default();
        curve.set_points_with_knots(points, knots, degree)?;
        Ok(curve)
    }

    /// Replace the control points and generate a knot vector for them.
    pub fn set_points(
        &mut self,
        points: &[P],
        degree: usize,
        generation: KnotGeneration,
        opened: bool,
        domain: Domain,
    ) -> Result<()> {
        check_degree(degree, points.len())?;
        if domain.is_degenerate() {
            return Err(CurveError::InvalidParameter(
                "B-spline domain must not be degenerate".to_string(),
            ));
        }
        let knots = match generation {
            KnotGeneration::Uniform => knot::uniform_knots(points.len(), degree, opened, domain),
            KnotGeneration::Centripetal => {
                let params = knot::chord_parameters(points, 0.5, domain);
                knot::averaged_knots(&params, degree, points.len())
            }
        };
        let mut owned = Vec::new();
        owned.try_reserve_exact(points.len())?;
        owned.extend_from_slice(points);

        self.commit(degree, knots, owned);
        self.uniform = generation == KnotGeneration::Uniform;
        Ok(())
    }

    /// Replace the control points and knot vector with explicit ones.
    pub fn set_points_with_knots(&mut self, points: &[P], knots: &[f64], degree: usize) -> Result<()> {
        check_knots(degree, knots, points.len())?;
        let mut owned = Vec::new();
        owned.try_reserve_exact(points.len())?;
        owned.extend_from_slice(points);

        self.commit(degree, knots.to_vec(), owned);
        self.uniform = false;
        Ok(())
    }

    fn commit(&mut self, degree: usize, knots: Vec<f64>, points: Vec<P>) {
        self.degree = degree;
        self.opened = is_clamped(degree, &knots);
        self.domain = Domain::new(knots[degree], knots[knots.len() - degree - 1])
            .unwrap_or_else(|_| Domain::degenerate(knots[degree]));
        self.knots = knots;
        self.points = points;
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    pub fn points(&self) -> &[P] {
        &self.points
    }

    /// Both ends clamped.
    pub fn is_opened(&self) -> bool {
        self.opened
    }

    /// Knots are still the evenly spaced ones from [`KnotGeneration::Uniform`].
    pub fn is_uniform(&self) -> bool {
        self.uniform
    }

    fn last_index(&self) -> usize {
        self.points.len() - 1
    }

    fn ensure_not_empty(&self, operation: &str) -> Result<()> {
        if self.points.is_empty() {
            return Err(CurveError::InvalidOperation(format!(
                "cannot {operation} an empty B-spline"
            )));
        }
        Ok(())
    }

    /// Existing knot value within `EPSILON` of `u`, or `u` itself.
    fn snap(&self, u: f64) -> f64 {
        self.knots
            .iter()
            .copied()
            .find(|k| (k - u).abs() <= EPSILON)
            .unwrap_or(u)
    }

    pub fn find_span(&self, u: f64) -> Result<usize> {
        self.ensure_not_empty("search")?;
        Ok(knot::find_span(self.degree, &self.knots, self.last_index(), u))
    }

    pub fn multiplicity(&self, u: f64) -> usize {
        knot::multiplicity(&self.knots, u)
    }

    pub fn find_span_mult(&self, u: f64) -> Result<(usize, usize)> {
        self.ensure_not_empty("search")?;
        Ok(knot::find_span_mult(self.degree, &self.knots, self.last_index(), u))
    }

    /// Span index and non-zero basis values at `u`.
    pub fn basis_functions(&self, u: f64) -> Result<(usize, Vec<f64>)> {
        let span = self.find_span(u)?;
        Ok((span, knot::basis_functions(self.degree, &self.knots, span, u)))
    }

    /// Span index and basis derivative rows `0..=order` at `u`.
    pub fn basis_derivatives(&self, u: f64, order: usize) -> Result<(usize, Vec<Vec<f64>>)> {
        let span = self.find_span(u)?;
        Ok((span, knot::basis_functions_derivs(self.degree, &self.knots, span, u, order)))
    }

    /// Derivative of any order at `u`; zero above the degree.
    pub fn derivative_of_order(&self, order: usize, u: f64) -> P {
        if self.points.is_empty() {
            return P::ZERO;
        }
        deboor::curve_derivative(self.degree, &self.knots, &self.points, self.domain.clamp(u), order)
    }

    /// Insert the knot `u` once (Boehm's algorithm).
    ///
    /// Knots that already have multiplicity `degree` are left alone, so the
    /// curve stays at least continuous.
    pub fn insert_knot(&mut self, u: f64) -> Result<()> {
        self.ensure_not_empty("insert a knot into")?;
        if !self.domain.contains(u) {
            return Err(CurveError::OutOfRange(format!(
                "knot {u} outside [{}, {}]",
                self.domain.start(),
                self.domain.end()
            )));
        }
        let u = self.snap(self.domain.clamp(u));
        let p = self.degree;
        let s = self.multiplicity(u);
        if s >= p {
            return Ok(());
        }

        let k = self.knots.partition_point(|&x| x <= u) - 1;
        let n = self.last_index();
        let mut points = Vec::new();
        points.try_reserve_exact(n + 2)?;
        for i in 0..=n + 1 {
            let q = if i + p <= k {
                self.points[i]
            } else if i + s > k {
                self.points[i - 1]
            } else {
                let a = (u - self.knots[i]) / (self.knots[i + p] - self.knots[i]);
                self.points[i] * a + self.points[i - 1] * (1.0 - a)
            };
            points.push(q);
        }

        self.knots.insert(k + 1, u);
        self.points = points;
        if s == 0 {
            self.uniform = false;
        }
        Ok(())
    }

    /// Remove the interior knot `u` up to `times` times, keeping the shape.
    ///
    /// Returns how many copies were removed.
    pub fn remove_knot(&mut self, u: f64, times: usize) -> Result<usize> {
        self.ensure_not_empty("remove a knot from")?;
        if !self.domain.contains(u) || self.domain.is_start(u) || self.domain.is_end(u) {
            return Err(CurveError::OutOfRange(format!("{u} is not an interior knot")));
        }
        let u = self.snap(u);
        let tolerance = self.removal_tolerance();
        let removed = removal::remove_knot(
            self.degree,
            &mut self.knots,
            &mut self.points,
            u,
            times,
            tolerance,
        );
        if removed > 0 {
            self.uniform = false;
        }
        Ok(removed)
    }

    fn removal_tolerance(&self) -> f64 {
        let scale = self.points.iter().map(|p| p.norm()).fold(0.0, f64::max);
        EPSILON * (1.0 + scale)
    }

    /// `knots == points + degree + 1`, required before any degree change.
    fn check_count_relation(&self) -> Result<()> {
        let expected = self.points.len() + self.degree + 1;
        if self.knots.len() != expected {
            return Err(CurveError::OutOfRange(format!(
                "{} knots do not fit {} points of degree {}",
                self.knots.len(),
                self.points.len(),
                self.degree
            )));
        }
        Ok(())
    }

    /// Control points of the Bezier pieces between consecutive distinct knots.
    pub fn bezier_segments(&self) -> Result<Vec<Vec<P>>> {
        self.ensure_not_empty("decompose")?;
        if !self.opened {
            return Err(CurveError::MissingFeature(
                "Bezier decomposition of an unclamped B-spline".to_string(),
            ));
        }
        let p = self.degree;
        let mut work = self.clone();
        for (value, mult) in knot::interior_knots(&self.knots, p) {
            for _ in mult..p {
                work.insert_knot(value)?;
            }
        }
        Ok(work
            .points
            .windows(p + 1)
            .step_by(p)
            .map(|w| w.to_vec())
            .collect())
    }

    /// Raise the degree by `steps` without changing the shape.
    pub fn higher_degree(&mut self, steps: usize) -> Result<()> {
        self.ensure_not_empty("elevate")?;
        if steps == 0 {
            return Ok(());
        }
        self.check_count_relation()?;
        let p = self.degree;
        let q = p + steps;
        let interior = knot::interior_knots(&self.knots, p);
        let segments: Vec<Vec<P>> = self
            .bezier_segments()?
            .iter()
            .map(|seg| elevate_points(seg, steps))
            .collect();

        let mut points = merge_segments(&segments);
        let mut knots = Vec::with_capacity(points.len() + q + 1);
        knots.extend(std::iter::repeat(self.domain.start()).take(q + 1));
        for &(value, _) in &interior {
            knots.extend(std::iter::repeat(value).take(q));
        }
        knots.extend(std::iter::repeat(self.domain.end()).take(q + 1));

        // Elevation keeps the continuity C^(p-s), which needs s + steps copies
        let tolerance = self.removal_tolerance();
        for &(value, s) in &interior {
            removal::remove_knot(q, &mut knots, &mut points, value, p - s, tolerance);
        }

        log::debug!(
            "elevated B-spline from degree {p} to {q}: {} -> {} points",
            self.points.len(),
            points.len()
        );
        let uniform = self.uniform && interior.is_empty();
        self.commit(q, knots, points);
        self.uniform = uniform;
        Ok(())
    }

    /// Lower the degree by one, approximately.
    ///
    /// Exact when the curve came from [`BSplineCurve::higher_degree`].
    pub fn lower_degree(&mut self) -> Result<()> {
        self.ensure_not_empty("reduce")?;
        let p = self.degree;
        if p <= 1 {
            return Err(CurveError::OutOfRange(format!("cannot lower degree {p}")));
        }
        self.check_count_relation()?;
        let q = p - 1;
        let interior = knot::interior_knots(&self.knots, p);
        let segments = self
            .bezier_segments()?
            .iter()
            .map(|seg| reduce_points(seg))
            .collect::<Result<Vec<_>>>()?;

        let mut points = merge_segments(&segments);
        let mut knots = Vec::with_capacity(points.len() + q + 1);
        knots.extend(std::iter::repeat(self.domain.start()).take(q + 1));
        for &(value, _) in &interior {
            knots.extend(std::iter::repeat(value).take(q));
        }
        knots.extend(std::iter::repeat(self.domain.end()).take(q + 1));

        let tolerance = self.removal_tolerance();
        for &(value, s) in &interior {
            let target = s.saturating_sub(1).max(1);
            if q > target {
                removal::remove_knot(q, &mut knots, &mut points, value, q - target, tolerance);
            }
        }

        log::debug!(
            "reduced B-spline from degree {p} to {q}: {} -> {} points",
            self.points.len(),
            points.len()
        );
        self.commit(q, knots, points);
        self.uniform = false;
        Ok(())
    }

    pub fn lower_degree_by(&mut self, steps: usize) -> Result<()> {
        if steps >= self.degree.max(1) {
            return Err(CurveError::OutOfRange(format!(
                "cannot lower degree {} by {steps}",
                self.degree
            )));
        }
        let mut work = self.clone();
        for _ in 0..steps {
            work.lower_degree()?;
        }
        *self = work;
        Ok(())
    }

    /// Interpolate `data` with a clamped spline of `degree`.
    pub fn global_fit(&mut self, data: &[P], degree: usize, domain: Domain) -> Result<()> {
        self.fit(data, degree, domain, EndCondition::Free)
    }

    /// Interpolate `data` with vanishing second derivatives at both ends.
    pub fn global_natural_fit(&mut self, data: &[P], degree: usize, domain: Domain) -> Result<()> {
        self.fit(data, degree, domain, EndCondition::Natural)
    }

    /// Interpolate `data` with prescribed end derivatives.
    pub fn global_fit_with_derivatives(
        &mut self,
        data: &[P],
        degree: usize,
        start: P,
        end: P,
        domain: Domain,
    ) -> Result<()> {
        self.fit(data, degree, domain, EndCondition::Derivatives { start, end })
    }

    fn fit(&mut self, data: &[P], degree: usize, domain: Domain, ends: EndCondition<P>) -> Result<()> {
        let fit = nurbs::interpolate(data, degree, domain, ends)?;
        self.commit(degree, fit.knots, fit.points);
        self.uniform = false;
        Ok(())
    }
}

/// Join Bezier pieces that share their end points.
fn merge_segments<P: ControlPoint>(segments: &[Vec<P>]) -> Vec<P> {
    let mut points: Vec<P> = Vec::new();
    for seg in segments {
        match points.last_mut() {
            Some(joint) => {
                *joint = joint.lerp(seg[0], 0.5);
                points.extend_from_slice(&seg[1..]);
            }
            None => points.extend_from_slice(seg),
        }
    }
    points
}

fn check_degree(degree: usize, count: usize) -> Result<()> {
    if degree == 0 || degree >= count {
        return Err(CurveError::InvalidParameter(format!(
            "degree {degree} is invalid for {count} control points"
        )));
    }
    Ok(())
}

fn check_knots(degree: usize, knots: &[f64], count: usize) -> Result<()> {
    check_degree(degree, count)?;
    if knots.len() != count + degree + 1 {
        return Err(CurveError::InvalidParameter(format!(
            "expected {} knots for {count} points of degree {degree}, got {}",
            count + degree + 1,
            knots.len()
        )));
    }
    if knots.windows(2).any(|w| !(w[0] <= w[1])) {
        return Err(CurveError::InvalidParameter("knots must be non-decreasing".to_string()));
    }
    if knots[count] - knots[degree] <= EPSILON {
        return Err(CurveError::InvalidParameter("knot domain is degenerate".to_string()));
    }

    let runs = knot_runs(knots);
    let last = runs.len() - 1;
    for (i, &run) in runs.iter().enumerate() {
        let limit = if i == 0 || i == last { degree + 1 } else { degree };
        if run > limit {
            return Err(CurveError::InvalidParameter(format!(
                "knot multiplicity {run} exceeds {limit}"
            )));
        }
    }
    Ok(())
}

/// Lengths of runs of equal knots.
fn knot_runs(knots: &[f64]) -> Vec<usize> {
    let mut runs: Vec<usize> = Vec::new();
    for (i, &k) in knots.iter().enumerate() {
        match runs.last_mut() {
            Some(run) if (k - knots[i - 1]).abs() <= EPSILON => *run += 1,
            _ => runs.push(1),
        }
    }
    runs
}

fn is_clamped(degree: usize, knots: &[f64]) -> bool {
    let runs = knot_runs(knots);
    runs.len() >= 2 && runs[0] == degree + 1 && runs[runs.len() - 1] == degree + 1
}

impl<P: ControlPoint> Validate for BSplineCurve<P> {
    fn validate(&self) -> Result<()> {
        if self.points.is_empty() {
            return Ok(());
        }
        check_knots(self.degree, &self.knots, self.points.len())
    }
}

impl<P: ControlPoint> Curve<P> for BSplineCurve<P> {
    fn kind(&self) -> CurveKind {
        CurveKind::BSpline
    }

    fn domain(&self) -> Domain {
        self.domain
    }

    fn set_domain(&mut self, domain: Domain) -> Result<()> {
        if self.points.is_empty() {
            self.domain = domain;
            return Ok(());
        }
        if domain.is_degenerate() {
            return Err(CurveError::InvalidParameter(
                "B-spline domain must not be degenerate".to_string(),
            ));
        }
        let map = self.domain.remap_to(&domain)?;
        for k in &mut self.knots {
            *k = map(*k);
        }
        self.domain = domain;
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
        Ok(())
    }

    fn evaluate(&self, u: f64) -> P {
        if self.points.is_empty() {
            return P::ZERO;
        }
        let mut scratch = BasisScratch::new(self.degree);
        deboor::curve_point(&mut scratch, &self.knots, &self.points, self.domain.clamp(u))
    }

    fn derivative(&self, order: DerivativeOrder, u: f64) -> P {
        self.derivative_of_order(order.as_usize(), u)
    }

    fn clear(&mut self) {
        *self = Self::default();
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

        let p = self.degree;
        let mut work = self.clone();
        let u = work.snap(u);
        while work.multiplicity(u) < p {
            work.insert_knot(u)?;
        }
        let k = work.knots.partition_point(|&x| x <= u) - 1;

        let mut left_knots = work.knots[..=k].to_vec();
        left_knots.push(u);
        let mut right_knots = vec![u];
        right_knots.extend_from_slice(&work.knots[k + 1 - p..]);

        let mut lhs = Self::default();
        lhs.commit(p, left_knots, work.points[..=k - p].to_vec());
        lhs.uniform = false;
        let mut rhs = Self::default();
        rhs.commit(p, right_knots, work.points[k - p..].to_vec());
        rhs.uniform = false;

        *left = lhs;
        *right = rhs;
        Ok(())
    }

    fn flatten_breaks(&self) -> Vec<f64> {
        let mut breaks: Vec<f64> = Vec::new();
        for &k in &self.knots {
            if !self.domain.contains(k) {
                continue;
            }
            let k = self.domain.clamp(k);
            if breaks.last().map_or(true, |&last| k - last > EPSILON) {
                breaks.push(k);
            }
        }
        if breaks.is_empty() {
            breaks.push(self.domain.start());
        }
        breaks
    }
}
