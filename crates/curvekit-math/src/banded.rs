//! Band-compacted square matrices and their LU factorization.
//!
//! A row `i` only stores columns `i - lower ..= i + upper`, which keeps both
//! memory and the elimination at `O(bandwidth * n)`. Partial pivoting is done
//! inside the band, so the factor keeps up to `lower` extra fill-in columns.

use curvekit_core::{CurveError, Result};

use crate::ControlPoint;

/// Square matrix with `lower` sub-diagonals and `upper` super-diagonals.
#[derive(Debug, Clone)]
pub struct BandedMatrix {
    n: usize,
    lower: usize,
    upper: usize,
    /// Row-major, `width()` entries per row; diagonal at column `lower`.
    data: Vec<f64>,
}

impl BandedMatrix {
    pub fn new(n: usize, lower: usize, upper: usize) -> Self {
        let width = lower + upper + 1;
        Self {
            n,
            lower,
            upper,
            data: vec![0.0; n * width],
        }
    }

    pub fn size(&self) -> usize {
        self.n
    }

    pub fn lower(&self) -> usize {
        self.lower
    }

    pub fn upper(&self) -> usize {
        self.upper
    }

    fn width(&self) -> usize {
        self.lower + self.upper + 1
    }

    fn band_index(&self, row: usize, col: usize) -> Option<usize> {
        if row >= self.n || col >= self.n {
            return None;
        }
        let offset = self.lower as isize + col as isize - row as isize;
        if offset < 0 || offset >= self.width() as isize {
            return None;
        }
        Some(row * self.width() + offset as usize)
    }

    /// Entry `(row, col)`; zero outside the band.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.band_index(row, col).map_or(0.0, |i| self.data[i])
    }

    /// Store `(row, col)`. Fails if the entry lies outside the band.
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        let i = self.band_index(row, col).ok_or_else(|| {
            CurveError::OutOfRange(format!(
                "entry ({row}, {col}) outside band [-{}, +{}] of a {}x{} matrix",
                self.lower, self.upper, self.n, self.n
            ))
        })?;
        self.data[i] = value;
        Ok(())
    }

    /// Factorize with partial pivoting inside the band.
    pub fn decompose(self) -> Result<BandedLu> {
        let n = self.n;
        let m1 = self.lower;
        let mm = self.width();
        let mut a = StridedRows::new(self.data, mm);
        let mut al = StridedRows::new(vec![0.0; n * m1], m1);
        let mut pivots = vec![0usize; n];

        // Left-align the first rows, whose band starts before column 0
        let mut l = m1;
        for i in 0..m1.min(n) {
            for j in (m1 - i)..mm {
                let v = a.get(i, j);
                a.set(i, j - l, v);
            }
            l -= 1;
            for j in (mm - l - 1)..mm {
                a.set(i, j, 0.0);
            }
        }

        let mut l = m1;
        for k in 0..n {
            let mut pivot = a.get(k, 0);
            let mut pivot_row = k;
            if l < n {
                l += 1;
            }
            for j in k + 1..l {
                if a.get(j, 0).abs() > pivot.abs() {
                    pivot = a.get(j, 0);
                    pivot_row = j;
                }
            }
            pivots[k] = pivot_row;
            if pivot == 0.0 {
                return Err(CurveError::InvalidOperation(format!(
                    "singular banded system at row {k}"
                )));
            }
            if pivot_row != k {
                a.swap_rows(k, pivot_row);
            }
            for i in k + 1..l {
                let factor = a.get(i, 0) / a.get(k, 0);
                al.set(k, i - k - 1, factor);
                for j in 1..mm {
                    let v = a.get(i, j) - factor * a.get(k, j);
                    a.set(i, j - 1, v);
                }
                a.set(i, mm - 1, 0.0);
            }
        }

        Ok(BandedLu {
            n,
            lower: m1,
            width: mm,
            upper_factor: a,
            lower_factor: al,
            pivots,
        })
    }
}

/// Strided 2D view over a flat buffer.
#[derive(Debug, Clone)]
struct StridedRows {
    data: Vec<f64>,
    stride: usize,
}

impl StridedRows {
    fn new(data: Vec<f64>, stride: usize) -> Self {
        Self { data, stride }
    }

    fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.stride + col]
    }

    fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.stride + col] = value;
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        for j in 0..self.stride {
            self.data.swap(a * self.stride + j, b * self.stride + j);
        }
    }
}

/// LU factors of a [`BandedMatrix`], ready for repeated solves.
#[derive(Debug, Clone)]
pub struct BandedLu {
    n: usize,
    lower: usize,
    width: usize,
    upper_factor: StridedRows,
    lower_factor: StridedRows,
    pivots: Vec<usize>,
}

impl BandedLu {
    /// Solve `A x = b` in place. Works for any vector-valued right-hand side.
    pub fn solve_in_place<P: ControlPoint>(&self, b: &mut [P]) -> Result<()> {
        let n = self.n;
        if b.len() != n {
            return Err(CurveError::InvalidParameter(format!(
                "right-hand side has {} rows, expected {n}",
                b.len()
            )));
        }

        // Forward substitution with the stored row interchanges
        let mut l = self.lower;
        for k in 0..n {
            let i = self.pivots[k];
            if i != k {
                b.swap(k, i);
            }
            if l < n {
                l += 1;
            }
            let bk = b[k];
            for i in k + 1..l {
                b[i] -= bk * self.lower_factor.get(k, i - k - 1);
            }
        }

        // Back substitution
        let mut l = 1;
        for i in (0..n).rev() {
            let mut acc = b[i];
            for k in 1..l {
                acc -= b[k + i] * self.upper_factor.get(i, k);
            }
            b[i] = acc / self.upper_factor.get(i, 0);
            if l < self.width {
                l += 1;
            }
        }
        Ok(())
    }
}
