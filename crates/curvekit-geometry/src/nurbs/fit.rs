//! Global interpolation of data points by a clamped B-spline.
//!
//! The basis matrix of an interpolation problem only has `degree + 1`
//! non-zeros per row, all close to the diagonal, so it is assembled and
//! factorized as a [`BandedMatrix`].

use curvekit_core::{CurveError, Result};
use curvekit_math::{BandedMatrix, ControlPoint, Domain};

use super::knot::{averaged_knots, basis_functions, basis_functions_derivs, chord_parameters, find_span};

/// Extra conditions imposed at both ends of the interpolant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EndCondition<P> {
    /// Only the data points are interpolated.
    Free,
    /// First derivatives at start and end are prescribed.
    Derivatives { start: P, end: P },
    /// Second derivatives vanish at both ends.
    Natural,
}

/// Knots and control points of an interpolating spline.
#[derive(Debug, Clone)]
pub struct Interpolant<P> {
    pub knots: Vec<f64>,
    pub points: Vec<P>,
}

/// One sparse matrix row: first non-zero column and its values.
struct BasisRow {
    first: usize,
    values: Vec<f64>,
}

/// Interpolate `data` with a clamped spline of `degree` over `domain`.
///
/// Parameter sites are chord-length spaced, knots are averaged from them.
/// End conditions add two unknowns and two rows next to the end rows.
pub fn interpolate<P: ControlPoint>(
    data: &[P],
    degree: usize,
    domain: Domain,
    ends: EndCondition<P>,
) -> Result<Interpolant<P>> {
    let constrained = !matches!(ends, EndCondition::Free);
    if degree == 0 {
        return Err(CurveError::InvalidParameter("degree must be at least 1".to_string()));
    }
    if data.len() < 2 {
        return Err(CurveError::InvalidParameter(format!(
            "at least 2 points are needed, got {}",
            data.len()
        )));
    }
    if constrained {
        if degree < 2 {
            return Err(CurveError::InvalidParameter(
                "end conditions need a degree of at least 2".to_string(),
            ));
        }
        if data.len() < degree {
            return Err(CurveError::InvalidParameter(format!(
                "{} points are too few for degree {degree} with end conditions",
                data.len()
            )));
        }
    } else if data.len() <= degree {
        return Err(CurveError::InvalidParameter(format!(
            "{} points are too few for degree {degree}",
            data.len()
        )));
    }
    if domain.is_degenerate() {
        return Err(CurveError::InvalidParameter("fit domain is degenerate".to_string()));
    }

    let count = data.len() + if constrained { 2 } else { 0 };
    let params = chord_parameters(data, 1.0, domain);
    let knots = averaged_knots(&params, degree, count);
    let last = count - 1;

    let value_row = |u: f64| {
        let span = find_span(degree, &knots, last, u);
        BasisRow {
            first: span - degree,
            values: basis_functions(degree, &knots, span, u),
        }
    };
    let derivative_row = |u: f64, order: usize| {
        let span = find_span(degree, &knots, last, u);
        let mut ders = basis_functions_derivs(degree, &knots, span, u, order);
        BasisRow {
            first: span - degree,
            values: ders.swap_remove(order),
        }
    };

    let mut rows = Vec::with_capacity(count);
    let mut rhs = Vec::with_capacity(count);
    match ends {
        EndCondition::Free => {
            for (&u, &q) in params.iter().zip(data) {
                rows.push(value_row(u));
                rhs.push(q);
            }
        }
        EndCondition::Derivatives { .. } | EndCondition::Natural => {
            let (order, d_start, d_end) = match ends {
                EndCondition::Derivatives { start, end } => (1, start, end),
                _ => (2, P::ZERO, P::ZERO),
            };
            let (start, end) = (domain.start(), domain.end());

            rows.push(value_row(start));
            rhs.push(data[0]);
            rows.push(derivative_row(start, order));
            rhs.push(d_start);
            for k in 1..data.len() - 1 {
                rows.push(value_row(params[k]));
                rhs.push(data[k]);
            }
            rows.push(derivative_row(end, order));
            rhs.push(d_end);
            rows.push(value_row(end));
            rhs.push(data[data.len() - 1]);
        }
    }
    debug_assert_eq!(rows.len(), count);

    let mut lower = 0;
    let mut upper = 0;
    for (i, row) in rows.iter().enumerate() {
        lower = lower.max(i.saturating_sub(row.first));
        upper = upper.max((row.first + row.values.len() - 1).saturating_sub(i));
    }
    log::debug!(
        "interpolating {} points with degree {degree}: {count}x{count} system, band -{lower}/+{upper}",
        data.len()
    );

    let mut matrix = BandedMatrix::new(count, lower, upper);
    for (i, row) in rows.iter().enumerate() {
        for (j, &v) in row.values.iter().enumerate() {
            matrix.set(i, row.first + j, v)?;
        }
    }

    let lu = matrix.decompose().map_err(|err| {
        log::warn!("interpolation system is singular: {err}");
        err
    })?;
    lu.solve_in_place(&mut rhs)?;

    Ok(Interpolant { knots, points: rhs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nurbs::deboor::curve_point;
    use crate::nurbs::knot::BasisScratch;
    use curvekit_math::dvec2;

    #[test]
    fn test_interpolates_data() {
        let data = vec![
            dvec2(0.0, 0.0),
            dvec2(1.0, 2.0),
            dvec2(3.0, 3.0),
            dvec2(4.0, 1.0),
            dvec2(6.0, 0.0),
        ];
        let domain = Domain::unit();
        let fit = interpolate(&data, 3, domain, EndCondition::Free).unwrap();
        assert_eq!(fit.points.len(), data.len());
        assert_eq!(fit.knots.len(), data.len() + 4);

        let params = chord_parameters(&data, 1.0, domain);
        let mut scratch = BasisScratch::new(3);
        for (&u, &q) in params.iter().zip(&data) {
            let p = curve_point(&mut scratch, &fit.knots, &fit.points, u);
            assert!((p - q).length() < 1e-9, "{p:?} != {q:?} at {u}");
        }
    }

    #[test]
    fn test_too_few_points() {
        let data = [0.0, 1.0, 2.0];
        assert!(interpolate(&data, 3, Domain::unit(), EndCondition::Free).is_err());
        assert!(interpolate(&data, 0, Domain::unit(), EndCondition::Free).is_err());
        assert!(interpolate(&data, 1, Domain::unit(), EndCondition::Natural).is_err());
    }
}
