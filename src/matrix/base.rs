//! Matrix storage and element access.

use std::ops::{Index, IndexMut};

use crate::real::Real;

/// Storage layout of a [`Matrix`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatrixStorage {
    /// Dense row-major `n x m`.
    Full,
    /// Band storage with `ml` sub-diagonals and `mu` super-diagonals,
    /// `(ml + mu + 1) x m` entries, diagonal `k = i - j` in row `k + mu`.
    Banded { ml: usize, mu: usize },
}

/// A small dense or banded matrix.
#[derive(Clone, Debug)]
pub struct Matrix<T: Real> {
    pub(crate) n: usize,
    pub(crate) m: usize,
    pub(crate) data: Vec<T>,
    pub(crate) storage: MatrixStorage,
    zero: T,
}

impl<T: Real> Matrix<T> {
    /// Dense `n x m` matrix of zeros.
    pub fn full(n: usize, m: usize) -> Self {
        Self {
            n,
            m,
            data: vec![T::zero(); n * m],
            storage: MatrixStorage::Full,
            zero: T::zero(),
        }
    }

    /// Square `n x n` banded matrix of zeros.
    pub fn banded(n: usize, ml: usize, mu: usize) -> Self {
        Self {
            n,
            m: n,
            data: vec![T::zero(); (ml + mu + 1) * n],
            storage: MatrixStorage::Banded { ml, mu },
            zero: T::zero(),
        }
    }

    pub fn nrows(&self) -> usize {
        self.n
    }

    pub fn ncols(&self) -> usize {
        self.m
    }

    pub fn storage(&self) -> MatrixStorage {
        self.storage
    }

    /// Reset every stored entry to zero.
    pub fn fill_zero(&mut self) {
        self.data.iter_mut().for_each(|v| *v = T::zero());
    }

    /// Dense copy of `fac * I - self`, the iteration matrix of implicit methods.
    pub fn shifted_identity(&self, fac: T) -> Matrix<T> {
        let n = self.n;
        let mut e = Matrix::full(n, n);
        for i in 0..n {
            for j in 0..n {
                e.data[i * n + j] = -self[(i, j)];
            }
            e.data[i * n + i] += fac;
        }
        e
    }

    /// Position of `(i, j)` in `data`, `None` outside the band.
    fn offset(&self, i: usize, j: usize) -> Option<usize> {
        assert!(
            i < self.n && j < self.m,
            "index ({}, {}) out of bounds for {}x{} matrix",
            i,
            j,
            self.n,
            self.m
        );
        match self.storage {
            MatrixStorage::Full => Some(i * self.m + j),
            MatrixStorage::Banded { ml, mu } => {
                let k = i as isize - j as isize;
                if k > ml as isize || -k > mu as isize {
                    None
                } else {
                    Some((k + mu as isize) as usize * self.m + j)
                }
            }
        }
    }
}

impl<T: Real> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    fn index(&self, (i, j): (usize, usize)) -> &T {
        match self.offset(i, j) {
            Some(k) => &self.data[k],
            None => &self.zero,
        }
    }
}

impl<T: Real> IndexMut<(usize, usize)> for Matrix<T> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        match self.offset(i, j) {
            Some(k) => &mut self.data[k],
            None => panic!("write to ({}, {}) outside the band of {:?}", i, j, self.storage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banded_lower_bidiagonal() {
        let mut a: Matrix<f64> = Matrix::banded(3, 1, 0);
        a[(0, 0)] = -1.0;
        a[(1, 0)] = 1.0;
        a[(1, 1)] = -2.0;
        a[(2, 1)] = 2.0;
        a[(2, 2)] = -3.0;
        assert_eq!(a[(0, 1)], 0.0);
        assert_eq!(a[(2, 0)], 0.0);
        assert_eq!(a[(2, 1)], 2.0);

        let e = a.shifted_identity(10.0);
        assert_eq!(e.storage(), MatrixStorage::Full);
        assert_eq!(e[(0, 0)], 11.0);
        assert_eq!(e[(1, 0)], -1.0);
        assert_eq!(e[(2, 2)], 13.0);
        assert_eq!(e[(0, 2)], 0.0);
    }

    #[test]
    #[should_panic]
    fn banded_write_outside_band_panics() {
        let mut a: Matrix<f64> = Matrix::banded(3, 1, 0);
        a[(0, 2)] = 1.0;
    }
}
