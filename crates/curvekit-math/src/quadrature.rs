//! Adaptive Romberg integration, used for arc lengths.

/// Richardson levels tried before an interval is split in two.
const MAX_LEVELS: usize = 10;

/// Levels always computed, so that a symmetric integrand cannot fake convergence.
const MIN_LEVELS: usize = 4;

/// Maximum bisection depth of the adaptive driver.
const MAX_DEPTH: u32 = 12;

/// Integrate `f` over `[a, b]` to an absolute error of about `max_error`.
///
/// Each interval is first attacked with Romberg extrapolation; intervals that
/// do not converge within `MAX_LEVELS` are halved and retried with half the
/// error budget.
pub fn integrate<F>(f: F, a: f64, b: f64, max_error: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    if b == a {
        return 0.0;
    }
    let max_error = max_error.abs().max(f64::EPSILON);
    adaptive(&f, a, b, max_error, 0)
}

fn adaptive<F>(f: &F, a: f64, b: f64, max_error: f64, depth: u32) -> f64
where
    F: Fn(f64) -> f64,
{
    match romberg(f, a, b, max_error) {
        (value, true) => value,
        (value, false) if depth >= MAX_DEPTH => value,
        _ => {
            let mid = 0.5 * (a + b);
            adaptive(f, a, mid, 0.5 * max_error, depth + 1)
                + adaptive(f, mid, b, 0.5 * max_error, depth + 1)
        }
    }
}

/// Plain Romberg over `[a, b]`; returns the estimate and whether it converged.
pub fn romberg<F>(f: &F, a: f64, b: f64, max_error: f64) -> (f64, bool)
where
    F: Fn(f64) -> f64,
{
    let mut prev = [0.0; MAX_LEVELS];
    let mut curr = [0.0; MAX_LEVELS];

    let mut h = b - a;
    prev[0] = 0.5 * h * (f(a) + f(b));

    for level in 1..MAX_LEVELS {
        h *= 0.5;
        let count = 1usize << (level - 1);
        let sum: f64 = (0..count).map(|k| f(a + (2 * k + 1) as f64 * h)).sum();
        curr[0] = 0.5 * prev[0] + h * sum;

        let mut factor = 1.0;
        for j in 1..=level {
            factor *= 4.0;
            curr[j] = curr[j - 1] + (curr[j - 1] - prev[j - 1]) / (factor - 1.0);
        }

        let estimate = curr[level];
        if level >= MIN_LEVELS && (estimate - prev[level - 1]).abs() <= max_error {
            return (estimate, true);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (prev[MAX_LEVELS - 1], false)
}
