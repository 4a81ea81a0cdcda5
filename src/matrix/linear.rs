//! Linear solves: A x = b via LU with partial pivoting.

use crate::real::Real;

use super::base::Matrix;

/// LU factorization `P A = L U` of a square matrix, stored row-major with the
/// unit lower factor below the diagonal.
#[derive(Clone, Debug)]
pub struct Lu<T: Real> {
    n: usize,
    a: Vec<T>,
    perm: Vec<usize>,
}

impl<T: Real> Matrix<T> {
    /// Factorize the matrix. Returns `None` if a zero or non-finite pivot is met.
    pub fn lu(&self) -> Option<Lu<T>> {
        let n = self.n;
        assert_eq!(n, self.m, "LU needs a square matrix, got {}x{}", n, self.m);

        // Densify A into row-major Vec<T>
        let mut a = vec![T::zero(); n * n];
        for i in 0..n {
            for j in 0..n {
                a[i * n + j] = self[(i, j)];
            }
        }
        let mut perm: Vec<usize> = (0..n).collect();

        for k in 0..n {
            // pivot
            let mut pivot_row = k;
            let mut pivot_val = a[k * n + k].abs();
            for i in (k + 1)..n {
                let val = a[i * n + k].abs();
                if val > pivot_val {
                    pivot_val = val;
                    pivot_row = i;
                }
            }
            if pivot_val == T::zero() || !pivot_val.is_finite() {
                return None;
            }
            if pivot_row != k {
                for j in 0..n {
                    a.swap(k * n + j, pivot_row * n + j);
                }
                perm.swap(k, pivot_row);
            }
            // Eliminate below the pivot
            let akk = a[k * n + k];
            for i in (k + 1)..n {
                let factor = a[i * n + k] / akk;
                a[i * n + k] = factor;
                for j in (k + 1)..n {
                    a[i * n + j] = a[i * n + j] - factor * a[k * n + j];
                }
            }
        }

        Some(Lu { n, a, perm })
    }

    /// Solve A x = b, returning x. `None` if A is singular.
    pub fn lin_solve(&self, b: &[T]) -> Option<Vec<T>> {
        let lu = self.lu()?;
        let mut x = b.to_vec();
        lu.solve_mut(&mut x);
        Some(x)
    }
}

impl<T: Real> Lu<T> {
    /// In-place solve: overwrites `b` with `x`.
    pub fn solve_mut(&self, b: &mut [T]) {
        let n = self.n;
        assert_eq!(
            b.len(),
            n,
            "dimension mismatch in solve: A is {}x{}, b has length {}",
            n,
            n,
            b.len()
        );
        let a = &self.a;

        // Apply the row permutation
        let pb: Vec<T> = self.perm.iter().map(|&p| b[p]).collect();
        b.copy_from_slice(&pb);

        // Forward solve Ly = Pb
        for i in 0..n {
            let mut sum = b[i];
            for k in 0..i {
                sum -= a[i * n + k] * b[k];
            }
            b[i] = sum;
        }
        // Backward solve Ux = y
        for i in (0..n).rev() {
            let mut sum = b[i];
            for k in (i + 1)..n {
                sum -= a[i * n + k] * b[k];
            }
            b[i] = sum / a[i * n + i];
        }
    }
}
