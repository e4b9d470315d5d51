//! Banded factorization/solve kernels.

use crate::error::KernelError;
use crate::matrix::BandMatrix;

/// A kernel that LU-factors a band matrix in place and solves against the factors.
///
/// `factor` overwrites `a` with its factors and fills `pivots`; `solve` overwrites `b`
/// with `A⁻¹ b` using the output of a successful `factor`.
pub trait BandFactorization {
    fn factor(&self, a: &mut BandMatrix, pivots: &mut [usize]) -> Result<(), KernelError>;
    fn solve(&self, a: &BandMatrix, pivots: &[usize], b: &mut [f64]) -> Result<(), KernelError>;
}

pub mod band_lu;
pub use band_lu::BandLu;
