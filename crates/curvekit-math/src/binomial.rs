//! Binomial coefficients for Bernstein-basis algebra.

/// Row `n` of Pascal's triangle as reals.
///
/// Only the first half of the row is computed with the multiplicative
/// recurrence; the second half is mirrored, since `C(n, k) == C(n, n - k)`.
pub fn binomial_row(n: usize) -> Vec<f64> {
    let mut row = vec![1.0; n + 1];
    let half = n / 2;
    for k in 1..=half {
        row[k] = row[k - 1] * (n - k + 1) as f64 / k as f64;
    }
    for k in half + 1..=n {
        row[k] = row[n - k];
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows() {
        assert_eq!(binomial_row(0), vec![1.0]);
        assert_eq!(binomial_row(4), vec![1.0, 4.0, 6.0, 4.0, 1.0]);
        assert_eq!(binomial_row(5), vec![1.0, 5.0, 10.0, 10.0, 5.0, 1.0]);
    }
}
