//! Banded LU factorization with partial pivoting.
//!
//! Row interchanges push entries above the logical upper band; the storage upper bandwidth
//! of the matrix must therefore be at least `min(n - 1, mu + ml)`. Subdiagonal entries of
//! column `k` are overwritten with the negated multipliers of step `k`, so the forward
//! substitution adds instead of subtracting.
//!
//! # References
//! - Golub & Van Loan, Matrix Computations, §4.3 (band Gaussian elimination)

use crate::error::KernelError;
use crate::matrix::BandMatrix;
use crate::solver::BandFactorization;

/// Default band kernel: partial-pivoting LU in the band's own storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct BandLu;

impl BandLu {
    pub fn new() -> Self {
        BandLu
    }
}

impl BandFactorization for BandLu {
    fn factor(&self, a: &mut BandMatrix, pivots: &mut [usize]) -> Result<(), KernelError> {
        let n = a.n();
        if pivots.len() != n {
            return Err(KernelError::DimensionMismatch { expected: n, got: pivots.len() });
        }
        let (ml, smu) = (a.lower(), a.storage_upper());
        let needed = (a.upper() + ml).min(n.saturating_sub(1));
        if smu < needed {
            return Err(KernelError::InsufficientFill { smu, needed });
        }
        if let Some((row, col)) = a.first_non_finite() {
            return Err(KernelError::NonFinite { row, col });
        }
        let ld = a.ldim();
        let data = a.data_mut();

        for k in 0..n.saturating_sub(1) {
            let kcol = k * ld;
            let diag = kcol + smu;
            let last_row = (k + ml).min(n - 1);

            // pivot search over the subdiagonal of column k
            let mut l = k;
            let mut max = data[diag].abs();
            for i in k + 1..=last_row {
                let v = data[diag + i - k].abs();
                if v > max {
                    l = i;
                    max = v;
                }
            }
            pivots[k] = l;
            // overflow during elimination shows up as an infinite pivot
            if max == 0.0 || !max.is_finite() {
                return Err(KernelError::ZeroPivot(k));
            }
            if l != k {
                data.swap(diag + l - k, diag);
            }

            let mult = -1.0 / data[diag];
            for i in k + 1..=last_row {
                data[diag + i - k] *= mult;
            }

            let last_col = (k + smu).min(n - 1);
            for j in k + 1..=last_col {
                let jcol = j * ld;
                let kj = jcol + smu + k - j;
                let lj = jcol + smu + l - j;
                let a_kj = data[lj];
                if l != k {
                    data.swap(lj, kj);
                }
                if a_kj != 0.0 {
                    for i in k + 1..=last_row {
                        data[jcol + smu + i - j] += a_kj * data[diag + i - k];
                    }
                }
            }
        }

        if n > 0 {
            pivots[n - 1] = n - 1;
            let last = data[(n - 1) * ld + smu];
            if last == 0.0 || !last.is_finite() {
                return Err(KernelError::ZeroPivot(n - 1));
            }
        }
        Ok(())
    }

    fn solve(&self, a: &BandMatrix, pivots: &[usize], b: &mut [f64]) -> Result<(), KernelError> {
        let n = a.n();
        if b.len() != n {
            return Err(KernelError::DimensionMismatch { expected: n, got: b.len() });
        }
        if pivots.len() != n {
            return Err(KernelError::DimensionMismatch { expected: n, got: pivots.len() });
        }
        let (ml, smu) = (a.lower(), a.storage_upper());

        // L y = P b
        for k in 0..n.saturating_sub(1) {
            let l = pivots[k];
            let mult = b[l];
            if l != k {
                b[l] = b[k];
                b[k] = mult;
            }
            let col = a.col(k);
            let last_row = (k + ml).min(n - 1);
            for i in k + 1..=last_row {
                b[i] += mult * col[smu + i - k];
            }
        }

        // U x = y
        for k in (0..n).rev() {
            let col = a.col(k);
            b[k] /= col[smu];
            let mult = -b[k];
            let first_row = k.saturating_sub(smu);
            for i in first_row..k {
                b[i] += mult * col[i + smu - k];
            }
        }
        Ok(())
    }
}
