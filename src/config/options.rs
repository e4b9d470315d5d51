//! Partition options for the band-block-diagonal preconditioner.
//!
//! This module provides the `PartitionConfig` struct describing one partition of the
//! distributed state vector: its local length, the half-bandwidths used while evaluating
//! difference quotients, the (possibly narrower) half-bandwidths kept in the stored band,
//! and the relative perturbation factor.

use crate::error::BbdError;

/// Per-partition configuration.
///
/// Invariant (checked by [`PartitionConfig::validate`]):
/// `mu_keep <= mu_dq <= n_local - 1` and `ml_keep <= ml_dq <= n_local - 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartitionConfig {
    /// Length of the locally owned part of `y`.
    pub n_local: usize,
    /// Upper half-bandwidth used by the difference-quotient sweep.
    pub mu_dq: usize,
    /// Lower half-bandwidth used by the difference-quotient sweep.
    pub ml_dq: usize,
    /// Upper half-bandwidth of the stored block.
    pub mu_keep: usize,
    /// Lower half-bandwidth of the stored block.
    pub ml_keep: usize,
    /// Relative increment for difference quotients; `<= 0` selects `sqrt(f64::EPSILON)`.
    pub rel_perturbation: f64,
}

impl PartitionConfig {
    /// Diagonal-only configuration for a partition of length `n_local`.
    pub fn new(n_local: usize) -> Self {
        Self {
            n_local,
            mu_dq: 0,
            ml_dq: 0,
            mu_keep: 0,
            ml_keep: 0,
            rel_perturbation: 0.0,
        }
    }

    /// Set the evaluation half-bandwidths.
    pub fn eval_bandwidths(mut self, mu: usize, ml: usize) -> Self {
        self.mu_dq = mu;
        self.ml_dq = ml;
        self
    }

    /// Set the stored half-bandwidths.
    pub fn keep_bandwidths(mut self, mu: usize, ml: usize) -> Self {
        self.mu_keep = mu;
        self.ml_keep = ml;
        self
    }

    pub fn rel_perturbation(mut self, rel: f64) -> Self {
        self.rel_perturbation = rel;
        self
    }

    /// Check the bandwidth invariant and the perturbation factor.
    pub fn validate(&self) -> Result<(), BbdError> {
        if self.n_local == 0 {
            return Err(BbdError::IllegalInput("local length must be positive".into()));
        }
        check_eval_bandwidths(self.n_local, self.mu_dq, self.ml_dq, self.mu_keep, self.ml_keep)?;
        check_rel(self.rel_perturbation)
    }

    /// Relative increment actually used by the difference-quotient sweep.
    pub fn effective_rel_perturbation(&self) -> f64 {
        resolve_rel(self.rel_perturbation)
    }

    /// Width of the evaluation band, `mu_dq + ml_dq + 1`.
    pub fn dq_width(&self) -> usize {
        self.mu_dq + self.ml_dq + 1
    }

    /// Number of perturbation groups in one difference-quotient sweep.
    pub fn group_count(&self) -> usize {
        crate::utils::grouping::group_count(self.n_local, self.dq_width())
    }

    /// Upper storage width of the kept band including LU fill-in.
    pub fn storage_upper(&self) -> usize {
        (self.mu_keep + self.ml_keep).min(self.n_local.saturating_sub(1))
    }
}

pub(crate) fn check_eval_bandwidths(
    n: usize,
    mu_dq: usize,
    ml_dq: usize,
    mu_keep: usize,
    ml_keep: usize,
) -> Result<(), BbdError> {
    let max_bw = n - 1;
    if mu_dq > max_bw || ml_dq > max_bw {
        return Err(BbdError::IllegalInput(format!(
            "evaluation bandwidths ({mu_dq}, {ml_dq}) exceed local length - 1 = {max_bw}"
        )));
    }
    if mu_keep > mu_dq || ml_keep > ml_dq {
        return Err(BbdError::IllegalInput(format!(
            "kept bandwidths ({mu_keep}, {ml_keep}) exceed evaluation bandwidths ({mu_dq}, {ml_dq})"
        )));
    }
    Ok(())
}

pub(crate) fn check_rel(rel: f64) -> Result<(), BbdError> {
    if rel.is_finite() {
        Ok(())
    } else {
        Err(BbdError::IllegalInput(format!("relative perturbation {rel} is not finite")))
    }
}

pub(crate) fn resolve_rel(rel: f64) -> f64 {
    if rel > 0.0 { rel } else { f64::EPSILON.sqrt() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_validate() {
        let cfg = PartitionConfig::new(10).eval_bandwidths(2, 2).keep_bandwidths(1, 1);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.dq_width(), 5);
        assert_eq!(cfg.storage_upper(), 2);
    }

    #[test]
    fn zero_rel_uses_sqrt_roundoff() {
        let cfg = PartitionConfig::new(4);
        assert_eq!(cfg.effective_rel_perturbation(), f64::EPSILON.sqrt());
        let cfg = cfg.rel_perturbation(1e-6);
        assert_eq!(cfg.effective_rel_perturbation(), 1e-6);
    }

    #[test]
    fn keep_wider_than_eval_is_rejected() {
        let cfg = PartitionConfig::new(10).eval_bandwidths(1, 2).keep_bandwidths(2, 1);
        assert!(matches!(cfg.validate(), Err(BbdError::IllegalInput(_))));
    }

    #[test]
    fn eval_wider_than_partition_is_rejected() {
        let cfg = PartitionConfig::new(3).eval_bandwidths(3, 0);
        assert!(cfg.validate().is_err());
        assert!(PartitionConfig::new(0).validate().is_err());
        assert!(PartitionConfig::new(3).rel_perturbation(f64::NAN).validate().is_err());
    }
}
