//! Adaptive flattening of curves into point sequences.

use curvekit_core::EPSILON;
use curvekit_math::ControlPoint;

use crate::curve::Curve;

/// Maximum recursion depth for adaptive subdivision.
const MAX_DEPTH: u32 = 12;

/// Convert a curve to a polyline using adaptive subdivision.
///
/// Every parameter from [`Curve::flatten_breaks`] is kept; between two breaks
/// the interval is split while a sample at one or two thirds of it lies
/// further than `max_deviation` from the chord.
pub fn flatten<P, C>(curve: &C, max_deviation: f64) -> Vec<P>
where
    P: ControlPoint,
    C: Curve<P> + ?Sized,
{
    if curve.points_count() == 0 {
        return Vec::new();
    }
    let tolerance = max_deviation.max(EPSILON);
    let breaks = curve.flatten_breaks();
    let mut points = vec![curve.evaluate(breaks[0])];
    for w in breaks.windows(2) {
        if w[1] <= w[0] {
            continue;
        }
        let p0 = points[points.len() - 1];
        let p1 = curve.evaluate(w[1]);
        subdivide_curve(curve, w[0], w[1], p0, p1, tolerance, &mut points, 0);
    }
    points
}

#[allow(clippy::too_many_arguments)]
fn subdivide_curve<P, C>(
    curve: &C,
    t0: f64,
    t1: f64,
    p0: P,
    p1: P,
    tolerance: f64,
    points: &mut Vec<P>,
    depth: u32,
) where
    P: ControlPoint,
    C: Curve<P> + ?Sized,
{
    if depth >= MAX_DEPTH {
        points.push(p1);
        return;
    }

    let step = (t1 - t0) / 3.0;
    let deviation = curve
        .evaluate(t0 + step)
        .distance_to_segment(p0, p1)
        .max(curve.evaluate(t1 - step).distance_to_segment(p0, p1));

    if deviation > tolerance {
        let t_mid = 0.5 * (t0 + t1);
        let p_mid = curve.evaluate(t_mid);
        subdivide_curve(curve, t0, t_mid, p0, p_mid, tolerance, points, depth + 1);
        subdivide_curve(curve, t_mid, t1, p_mid, p1, tolerance, points, depth + 1);
    } else {
        points.push(p1);
    }
}
