//! Knot vector utilities for B-spline evaluation and construction.

use curvekit_core::EPSILON;
use curvekit_math::{ControlPoint, Domain};

/// Find the knot span index for parameter `t` in the knot vector.
///
/// Returns the index `i` such that `knots[i] <= t < knots[i+1]`,
/// with special handling for the upper boundary.
///
/// # Arguments
/// * `degree` - Degree of the B-spline
/// * `knots` - The knot vector
/// * `n` - Number of control points minus 1
/// * `t` - Parameter value
pub fn find_span(degree: usize, knots: &[f64], n: usize, t: f64) -> usize {
    // Special case: t at upper boundary
    if t >= knots[n + 1] {
        return n;
    }
    if t <= knots[degree] {
        // Skip repeated knots so the span is never empty
        let mut span = degree;
        while span < n && knots[span + 1] <= t {
            span += 1;
        }
        return span;
    }

    // Binary search
    let mut low = degree;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;

    while t < knots[mid] || t >= knots[mid + 1] {
        if t < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }

    mid
}

/// Number of knots equal to `u` within `EPSILON`.
pub fn multiplicity(knots: &[f64], u: f64) -> usize {
    knots.iter().filter(|&&k| (k - u).abs() <= EPSILON).count()
}

/// Span and multiplicity of `u` in a single call.
pub fn find_span_mult(degree: usize, knots: &[f64], n: usize, u: f64) -> (usize, usize) {
    (find_span(degree, knots, n, u), multiplicity(knots, u))
}

/// Reusable scratch for [`basis_functions_into`]: `3(p+1)` reals holding
/// the `left`, `right` and output rows.
#[derive(Debug, Clone)]
pub struct BasisScratch {
    degree: usize,
    buffer: Vec<f64>,
}

impl BasisScratch {
    pub fn new(degree: usize) -> Self {
        Self {
            degree,
            buffer: vec![0.0; 3 * (degree + 1)],
        }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }
}

/// Compute the non-vanishing basis functions at parameter `t`.
///
/// Returns `degree + 1` basis function values N_{span-degree,degree}(t)
/// through N_{span,degree}(t), borrowed from the scratch buffer.
pub fn basis_functions_into<'a>(
    scratch: &'a mut BasisScratch,
    knots: &[f64],
    span: usize,
    t: f64,
) -> &'a [f64] {
    let degree = scratch.degree;
    let width = degree + 1;
    let (left, rest) = scratch.buffer.split_at_mut(width);
    let (right, n) = rest.split_at_mut(width);

    n[0] = 1.0;

    for j in 1..=degree {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;

        for r in 0..j {
            let temp = n[r] / (right[r + 1] + left[j - r]);
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }

        n[j] = saved;
    }

    n
}

/// Allocating form of [`basis_functions_into`].
pub fn basis_functions(degree: usize, knots: &[f64], span: usize, t: f64) -> Vec<f64> {
    let mut scratch = BasisScratch::new(degree);
    basis_functions_into(&mut scratch, knots, span, t).to_vec()
}

/// Compute basis functions and their derivatives up to `order` at `t`.
///
/// Row `k` of the result holds the `k`-th derivatives of the `degree + 1`
/// non-vanishing functions. Rows beyond `degree` are zero.
pub fn basis_functions_derivs(
    degree: usize,
    knots: &[f64],
    span: usize,
    t: f64,
    order: usize,
) -> Vec<Vec<f64>> {
    let p = degree;
    let mut ders = vec![vec![0.0; p + 1]; order + 1];

    let mut ndu = vec![vec![0.0; p + 1]; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];

    ndu[0][0] = 1.0;

    for j in 1..=p {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;

        for r in 0..j {
            // Lower triangle
            ndu[j][r] = right[r + 1] + left[j - r];
            let temp = ndu[r][j - 1] / ndu[j][r];

            // Upper triangle
            ndu[r][j] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        ndu[j][j] = saved;
    }

    for j in 0..=p {
        ders[0][j] = ndu[j][p];
    }

    let top = order.min(p);
    let mut a = vec![vec![0.0; p + 1]; 2];

    for r in 0..=p {
        let mut s1 = 0usize;
        let mut s2 = 1usize;
        a[0][0] = 1.0;

        for k in 1..=top {
            let mut d = 0.0;
            let rk = r as isize - k as isize;
            let pk = p as isize - k as isize;

            if rk >= 0 {
                a[s2][0] = a[s1][0] / ndu[(pk + 1) as usize][rk as usize];
                d = a[s2][0] * ndu[rk as usize][pk as usize];
            }

            let j1 = if rk >= -1 { 1 } else { (-rk) as usize };
            let j2 = if r as isize - 1 <= pk { k - 1 } else { p - r };

            for j in j1..=j2 {
                let col = (rk + j as isize) as usize;
                a[s2][j] = (a[s1][j] - a[s1][j - 1]) / ndu[(pk + 1) as usize][col];
                d += a[s2][j] * ndu[col][pk as usize];
            }

            if r as isize <= pk {
                a[s2][k] = -a[s1][k - 1] / ndu[(pk + 1) as usize][r];
                d += a[s2][k] * ndu[r][pk as usize];
            }

            ders[k][r] = d;
            std::mem::swap(&mut s1, &mut s2);
        }
    }

    // Multiply through by the falling factorial p!/(p-k)!
    let mut factor = p as f64;
    for k in 1..=top {
        for val in &mut ders[k] {
            *val *= factor;
        }
        factor *= (p - k) as f64;
    }

    ders
}

/// Uniform knot vector for `count` control points over `domain`.
///
/// Clamped vectors repeat each end `degree + 1` times and spread the interior
/// knots evenly. Unclamped ones are evenly spaced with `knots[degree]` and
/// `knots[count]` on the domain ends.
pub fn uniform_knots(count: usize, degree: usize, clamped: bool, domain: Domain) -> Vec<f64> {
    let m = count + degree;
    let mut knots = Vec::with_capacity(m + 1);
    if clamped {
        let spans = (count - degree) as f64;
        knots.extend(std::iter::repeat(domain.start()).take(degree + 1));
        for j in 1..count - degree {
            knots.push(domain.from_local(j as f64 / spans));
        }
        knots.extend(std::iter::repeat(domain.end()).take(degree + 1));
    } else {
        let step = domain.length() / (count - degree) as f64;
        for i in 0..=m {
            knots.push(domain.start() + (i as f64 - degree as f64) * step);
        }
    }
    knots
}

/// Parameter sites for `points` over `domain`.
///
/// `exponent` 1.0 gives chord-length spacing, 0.5 the centripetal one.
/// Coincident points fall back to uniform spacing.
pub fn chord_parameters<P: ControlPoint>(points: &[P], exponent: f64, domain: Domain) -> Vec<f64> {
    let count = points.len();
    if count < 2 {
        return vec![domain.start(); count];
    }
    let steps: Vec<f64> = points
        .windows(2)
        .map(|w| w[0].distance(w[1]).powf(exponent))
        .collect();
    let total: f64 = steps.iter().sum();

    let mut params = Vec::with_capacity(count);
    params.push(domain.start());
    if total <= EPSILON {
        for i in 1..count - 1 {
            params.push(domain.from_local(i as f64 / (count - 1) as f64));
        }
    } else {
        let mut acc = 0.0;
        for step in &steps[..count - 2] {
            acc += step;
            params.push(domain.from_local(acc / total));
        }
    }
    params.push(domain.end());
    params
}

/// Clamped knot vector for `count` control points by averaging `degree`
/// consecutive parameter sites.
///
/// With `count == params.len()` this is the classic interpolation averaging.
/// With `count == params.len() + 2` (two end constraints) every window is
/// shifted by one so that the two extra knots sit next to the ends.
pub fn averaged_knots(params: &[f64], degree: usize, count: usize) -> Vec<f64> {
    let first = params[0];
    let last = params[params.len() - 1];
    let interior = count - degree - 1;
    // Window start offset: 1 for plain interpolation, 0 when end rows are added
    let offset = usize::from(count == params.len());

    let mut knots = Vec::with_capacity(count + degree + 1);
    knots.extend(std::iter::repeat(first).take(degree + 1));
    for j in 0..interior {
        let window = &params[j + offset..j + offset + degree];
        knots.push(window.iter().sum::<f64>() / degree as f64);
    }
    knots.extend(std::iter::repeat(last).take(degree + 1));
    knots
}

/// Distinct knot values strictly inside `(knots[degree], knots[len-degree-1])`
/// together with their multiplicities.
pub fn interior_knots(knots: &[f64], degree: usize) -> Vec<(f64, usize)> {
    let lo = knots[degree];
    let hi = knots[knots.len() - degree - 1];
    let mut out: Vec<(f64, usize)> = Vec::new();
    for &k in &knots[degree + 1..knots.len() - degree - 1] {
        if k - lo <= EPSILON || hi - k <= EPSILON {
            continue;
        }
        match out.last_mut() {
            Some((value, mult)) if (k - *value).abs() <= EPSILON => *mult += 1,
            _ => out.push((k, 1)),
        }
    }
    out
}
