//! Column-major banded storage with room for LU fill-in.
//!
//! An `n × n` matrix with upper half-bandwidth `mu` and lower half-bandwidth `ml` is stored
//! column by column. Each column holds `ldim = smu + ml + 1` entries, where the storage upper
//! bandwidth `smu >= mu` leaves room for the fill-in produced by partial pivoting
//! (`smu = min(n - 1, mu + ml)` is sufficient). Entry `(i, j)` lives at
//! `data[j * ldim + (i + smu - j)]` whenever `j - smu <= i <= j + ml`.

use crate::core::traits::MatVec;
use crate::error::BbdError;
use faer::Mat;

/// Banded square matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct BandMatrix {
    n: usize,
    mu: usize,
    ml: usize,
    smu: usize,
    ldim: usize,
    data: Vec<f64>,
}

impl BandMatrix {
    /// Allocate a zeroed band matrix, reporting allocation failure instead of aborting.
    pub fn try_new(n: usize, mu: usize, ml: usize, smu: usize) -> Result<Self, BbdError> {
        let ldim = smu + ml + 1;
        let words = n
            .checked_mul(ldim)
            .ok_or(BbdError::AllocationFailure { words: usize::MAX })?;
        let data = try_zeroed(words)?;
        Ok(Self { n, mu, ml, smu, ldim, data })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Logical upper half-bandwidth.
    pub fn upper(&self) -> usize {
        self.mu
    }

    /// Logical lower half-bandwidth.
    pub fn lower(&self) -> usize {
        self.ml
    }

    /// Storage upper half-bandwidth (`>= upper()`).
    pub fn storage_upper(&self) -> usize {
        self.smu
    }

    /// Stored entries per column.
    pub fn ldim(&self) -> usize {
        self.ldim
    }

    /// Number of real words held by this matrix.
    pub fn words(&self) -> usize {
        self.data.len()
    }

    pub fn set_zero(&mut self) {
        self.data.iter_mut().for_each(|v| *v = 0.0);
    }

    /// True when `(i, j)` lies inside the logical band.
    pub fn in_band(&self, i: usize, j: usize) -> bool {
        i < self.n && j < self.n && i + self.mu >= j && j + self.ml >= i
    }

    /// Offset of `(i, j)` within column `j`, if it is representable in storage.
    #[inline]
    pub fn offset(&self, i: usize, j: usize) -> Option<usize> {
        if i >= self.n || j >= self.n || i + self.smu < j || i > j + self.ml {
            return None;
        }
        Some(i + self.smu - j)
    }

    /// Stored value at `(i, j)`; structurally zero entries outside the storage band read as 0.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        match self.offset(i, j) {
            Some(k) => self.data[j * self.ldim + k],
            None => 0.0,
        }
    }

    /// Write `(i, j)`. Returns `false` (and writes nothing) outside the logical band.
    pub fn set(&mut self, i: usize, j: usize, v: f64) -> bool {
        if !self.in_band(i, j) {
            return false;
        }
        let k = i + self.smu - j;
        self.data[j * self.ldim + k] = v;
        true
    }

    /// Storage of column `j`; element `(i, j)` is at index `i + smu - j`.
    pub fn col(&self, j: usize) -> &[f64] {
        &self.data[j * self.ldim..(j + 1) * self.ldim]
    }

    pub fn col_mut(&mut self, j: usize) -> &mut [f64] {
        let ld = self.ldim;
        &mut self.data[j * ld..(j + 1) * ld]
    }

    /// First `(row, col)` of the storage band holding a NaN or infinity, scanning by column.
    pub fn first_non_finite(&self) -> Option<(usize, usize)> {
        (0..self.n).find_map(|j| {
            let first = j.saturating_sub(self.smu);
            let last = (j + self.ml).min(self.n - 1);
            let col = self.col(j);
            (first..=last)
                .find(|&i| !col[i + self.smu - j].is_finite())
                .map(|i| (i, j))
        })
    }

    pub(crate) fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Expand into a dense Faer matrix (storage band, including any fill-in).
    pub fn to_dense(&self) -> Mat<f64> {
        Mat::from_fn(self.n, self.n, |i, j| self.get(i, j))
    }
}

impl MatVec<[f64]> for BandMatrix {
    fn matvec(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(self.n, x.len(), "Input vector x has incorrect length");
        assert_eq!(self.n, y.len(), "Output vector y has incorrect length");
        y.iter_mut().for_each(|v| *v = 0.0);
        for j in 0..self.n {
            let col = self.col(j);
            let first = j.saturating_sub(self.smu);
            let last = (j + self.ml).min(self.n - 1);
            for i in first..=last {
                y[i] += col[i + self.smu - j] * x[j];
            }
        }
    }
}

/// Fallible zeroed allocation of `words` reals.
pub(crate) fn try_zeroed(words: usize) -> Result<Vec<f64>, BbdError> {
    let mut v = Vec::new();
    v.try_reserve_exact(words)
        .map_err(|_| BbdError::AllocationFailure { words })?;
    v.resize(words, 0.0);
    Ok(v)
}
