//! Dense linear system solving by Doolittle LU decomposition.
//!
//! Rows are scaled by the reciprocal of their largest entry before the
//! pivot search, so the pivot is chosen relative to row magnitude rather
//! than absolute size. `L` carries an implied unit diagonal; `L` and `U`
//! share one matrix.

use nalgebra::DMatrix;
use tracing::debug;

use crate::{MathError, Result, SMALL_FASTF};

/// Combined LU factors of a square matrix plus the row permutation
/// applied while pivoting.
#[derive(Debug, Clone)]
pub struct LuFactors {
    lu: DMatrix<f64>,
    /// `perm[i]` is the original index of the row now stored at `i`.
    perm: Vec<usize>,
}

impl LuFactors {
    /// Factor `a` in place. The matrix is consumed.
    pub fn decompose(mut a: DMatrix<f64>) -> Result<Self> {
        let n = a.nrows();
        if n == 0 || n != a.ncols() {
            return Err(MathError::DimensionMismatch(format!(
                "expected a non-empty square matrix, got {}x{}",
                a.nrows(),
                a.ncols()
            )));
        }

        let mut scale = Vec::with_capacity(n);
        for i in 0..n {
            let big = a.row(i).iter().fold(0.0_f64, |m, v| m.max(v.abs()));
            if big == 0.0 {
                debug!(row = i, "zero row in coefficient matrix");
                return Err(MathError::SingularMatrix {
                    column: 0,
                    pivot: 0.0,
                });
            }
            scale.push(1.0 / big);
        }

        let mut perm: Vec<usize> = (0..n).collect();
        let mut s = vec![0.0; n];

        for k in 0..n {
            for i in k..n {
                let mut sum = 0.0;
                for j in 0..k {
                    sum += a[(i, j)] * a[(j, k)];
                }
                s[i] = a[(i, k)] - sum;
            }

            let mut max_pivot = k;
            let mut best = s[k].abs() * scale[k];
            for i in (k + 1)..n {
                let candidate = s[i].abs() * scale[i];
                if candidate > best {
                    best = candidate;
                    max_pivot = i;
                }
            }

            if max_pivot != k {
                a.swap_rows(k, max_pivot);
                s.swap(k, max_pivot);
                scale.swap(k, max_pivot);
                perm.swap(k, max_pivot);
            }

            let pivot = s[k];
            if pivot.abs() * scale[k] <= SMALL_FASTF {
                debug!(column = k, pivot, "vanishing pivot");
                return Err(MathError::SingularMatrix { column: k, pivot });
            }
            a[(k, k)] = pivot;

            // lower
            for i in (k + 1)..n {
                a[(i, k)] = s[i] / pivot;
            }

            // upper
            for j in (k + 1)..n {
                let mut sum = 0.0;
                for i in 0..k {
                    sum += a[(k, i)] * a[(i, j)];
                }
                a[(k, j)] -= sum;
            }
        }

        Ok(Self { lu: a, perm })
    }

    /// Dimension of the factored matrix.
    pub fn dim(&self) -> usize {
        self.lu.nrows()
    }

    /// Solve `A x = b` for every column of `b`.
    ///
    /// `b` has one row per unknown and one column per right-hand side
    /// (e.g. three columns for x, y, z coordinates).
    pub fn solve(&self, b: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let n = self.dim();
        if b.nrows() != n {
            return Err(MathError::DimensionMismatch(format!(
                "right-hand side has {} rows, matrix is {}x{}",
                b.nrows(),
                n,
                n
            )));
        }

        let mut x = DMatrix::zeros(n, b.ncols());
        let mut rhs = vec![0.0; n];
        let mut y = vec![0.0; n];
        let mut col = vec![0.0; n];

        for c in 0..b.ncols() {
            for (i, r) in rhs.iter_mut().enumerate() {
                *r = b[(self.perm[i], c)];
            }
            self.forward_solve(&rhs, &mut y);
            self.back_solve(&y, &mut col);
            for (i, v) in col.iter().enumerate() {
                x[(i, c)] = *v;
            }
        }
        Ok(x)
    }

    /// Solve `L y = b` (unit diagonal).
    fn forward_solve(&self, b: &[f64], y: &mut [f64]) {
        for i in 0..b.len() {
            let mut sum = 0.0;
            for j in 0..i {
                sum += self.lu[(i, j)] * y[j];
            }
            y[i] = b[i] - sum;
        }
    }

    /// Solve `U x = y`.
    fn back_solve(&self, y: &[f64], x: &mut [f64]) {
        let n = y.len();
        for i in (0..n).rev() {
            let mut sum = 0.0;
            for j in (i + 1)..n {
                sum += self.lu[(i, j)] * x[j];
            }
            x[i] = (y[i] - sum) / self.lu[(i, i)];
        }
    }
}

/// Solve `A x = b`, consuming both the coefficient matrix and the
/// right-hand sides. Returns one solution column per column of `b`.
pub fn solve(a: DMatrix<f64>, b: DMatrix<f64>) -> Result<DMatrix<f64>> {
    LuFactors::decompose(a)?.solve(&b)
}
