//! Knot removal for non-rational B-splines.

use curvekit_math::ControlPoint;

use super::knot::{find_span, multiplicity};

/// Remove the interior knot `u` up to `times` times.
///
/// Each removal is only committed if the curve stays within `tolerance` of
/// the original, so the result may remove fewer copies than requested.
/// Returns the number of copies actually removed; `knots` and `points` are
/// shortened accordingly.
pub fn remove_knot<P: ControlPoint>(
    degree: usize,
    knots: &mut Vec<f64>,
    points: &mut Vec<P>,
    u: f64,
    times: usize,
    tolerance: f64,
) -> usize {
    if points.is_empty() || times == 0 {
        return 0;
    }
    let p = degree as isize;
    let n = points.len() as isize - 1;
    let m = n + p + 1;
    let ord = p + 1;
    let r = find_span(degree, knots, n as usize, u) as isize;
    let s = multiplicity(knots, u) as isize;
    if s == 0 {
        return 0;
    }
    let num = (times as isize).min(s);

    let fout = (2 * r - s - p) / 2;
    let mut first = r - p;
    let mut last = r - s;
    let mut temp = vec![P::ZERO; (2 * p + 4) as usize];

    let kn = |i: isize| knots[i as usize];
    let mut t = 0isize;
    while t < num {
        let off = first - 1;
        if off < 0 || last + 1 > n {
            break;
        }
        temp[0] = points[off as usize];
        temp[(last + 1 - off) as usize] = points[(last + 1) as usize];

        let (mut i, mut j) = (first, last);
        let (mut ii, mut jj) = (1isize, last - off);
        while j - i > t {
            let alfi = (u - kn(i)) / (kn(i + ord + t) - kn(i));
            let alfj = (u - kn(j - t)) / (kn(j + ord) - kn(j - t));
            temp[ii as usize] =
                (points[i as usize] - temp[(ii - 1) as usize] * (1.0 - alfi)) / alfi;
            temp[jj as usize] = (points[j as usize] - temp[(jj + 1) as usize] * alfj) / (1.0 - alfj);
            i += 1;
            ii += 1;
            j -= 1;
            jj -= 1;
        }

        let removable = if j - i < t {
            temp[(ii - 1) as usize].distance(temp[(jj + 1) as usize]) <= tolerance
        } else {
            let alfi = (u - kn(i)) / (kn(i + ord + t) - kn(i));
            let blended =
                temp[(ii + t + 1) as usize] * alfi + temp[(ii - 1) as usize] * (1.0 - alfi);
            points[i as usize].distance(blended) <= tolerance
        };
        if !removable {
            break;
        }

        let (mut i, mut j) = (first, last);
        while j - i > t {
            points[i as usize] = temp[(i - off) as usize];
            points[j as usize] = temp[(j - off) as usize];
            i += 1;
            j -= 1;
        }
        first -= 1;
        last += 1;
        t += 1;
    }

    if t == 0 {
        return 0;
    }

    for k in r + 1..=m {
        knots[(k - t) as usize] = knots[k as usize];
    }
    let mut j = fout;
    let mut i = j;
    for k in 1..t {
        if k % 2 == 1 {
            i += 1;
        } else {
            j -= 1;
        }
    }
    for k in i + 1..=n {
        points[j as usize] = points[k as usize];
        j += 1;
    }

    knots.truncate((m + 1 - t) as usize);
    points.truncate((n + 1 - t) as usize);
    t as usize
}
