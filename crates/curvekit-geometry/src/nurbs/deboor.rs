//! De Boor style evaluation of non-rational B-spline curves.

use curvekit_math::ControlPoint;

use super::knot::{basis_functions_derivs, basis_functions_into, find_span, BasisScratch};

/// Evaluate a B-spline curve point at parameter `t`.
pub fn curve_point<P: ControlPoint>(
    scratch: &mut BasisScratch,
    knots: &[f64],
    control_points: &[P],
    t: f64,
) -> P {
    let degree = scratch.degree();
    let n = control_points.len() - 1;
    let span = find_span(degree, knots, n, t);
    let basis = basis_functions_into(scratch, knots, span, t);

    let mut point = P::ZERO;
    for (i, &b) in basis.iter().enumerate() {
        point += control_points[span - degree + i] * b;
    }

    point
}

/// Evaluate the `order`-th derivative of a B-spline curve at parameter `t`.
pub fn curve_derivative<P: ControlPoint>(
    degree: usize,
    knots: &[f64],
    control_points: &[P],
    t: f64,
    order: usize,
) -> P {
    if order > degree {
        return P::ZERO;
    }
    let n = control_points.len() - 1;
    let span = find_span(degree, knots, n, t);
    let ders = basis_functions_derivs(degree, knots, span, t, order);

    let mut derivative = P::ZERO;
    for (i, &d) in ders[order].iter().enumerate() {
        derivative += control_points[span - degree + i] * d;
    }

    derivative
}

#[cfg(test)]
mod tests {
    use super::*;
    use curvekit_math::{dvec2, DVec2};

    #[test]
    fn test_curve_point_linear() {
        let knots = vec![0.0, 0.0, 1.0, 2.0, 2.0];
        let cps = vec![dvec2(0.0, 0.0), dvec2(1.0, 0.0), dvec2(1.0, 1.0)];
        let mut scratch = BasisScratch::new(1);

        let p = curve_point(&mut scratch, &knots, &cps, 0.5);
        assert!((p.x - 0.5).abs() < 1e-10);
        assert!(p.y.abs() < 1e-10);

        let p = curve_point(&mut scratch, &knots, &cps, 1.5);
        assert!((p.x - 1.0).abs() < 1e-10);
        assert!((p.y - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_curve_point_quadratic() {
        let knots = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let cps = vec![dvec2(0.0, 0.0), dvec2(0.5, 1.0), dvec2(1.0, 0.0)];
        let mut scratch = BasisScratch::new(2);

        let p = curve_point(&mut scratch, &knots, &cps, 0.0);
        assert!((p.x - 0.0).abs() < 1e-10);

        let p = curve_point(&mut scratch, &knots, &cps, 1.0);
        assert!((p.x - 1.0).abs() < 1e-10);

        let p = curve_point(&mut scratch, &knots, &cps, 0.5);
        assert!((p.x - 0.5).abs() < 1e-10);
        assert!((p.y - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_derivatives_quadratic() {
        let knots = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let cps = vec![dvec2(0.0, 0.0), dvec2(0.5, 1.0), dvec2(1.0, 0.0)];

        // C'(t) = 2(1-t)(P1-P0) + 2t(P2-P1)
        let d = curve_derivative(2, &knots, &cps, 0.0, 1);
        assert!((d - dvec2(1.0, 2.0)).length() < 1e-10);

        // C'' = 2(P2 - 2P1 + P0)
        let dd = curve_derivative(2, &knots, &cps, 0.3, 2);
        assert!((dd - dvec2(0.0, -4.0)).length() < 1e-10);

        assert_eq!(curve_derivative(2, &knots, &cps, 0.3, 3), DVec2::ZERO);
    }
}
