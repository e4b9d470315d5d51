//! Band-block-diagonal (BBD) preconditioner.
//!
//! Each partition of the distributed state vector owns one banded block of the
//! preconditioner. The block is a difference-quotient Jacobian of the local model `G`,
//! evaluated with half-bandwidths `(mu_dq, ml_dq)` but stored and factored with the
//! narrower `(mu_keep, ml_keep)`. The resulting block-diagonal matrix needs no
//! communication to apply.
//!
//! A setup builds and factors into a staging band and swaps it with the committed
//! factorization only on success, so a failed setup leaves the last good preconditioner
//! usable.
//!
//! # Lifecycle
//! `new` (init) → `reinit`* → `setup` ⇄ `apply` → drop.
//!
//! # References
//! - Brown & Hindmarsh (1989), Reduced storage matrix methods in stiff ODE systems
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems. SIAM. §12

use crate::config::options::{PartitionConfig, check_eval_bandwidths, check_rel, resolve_rel};
use crate::error::{BbdError, KernelError, SetupError, SetupFailure, SolveError};
use crate::matrix::BandMatrix;
use crate::preconditioner::dq_jacobian::{DqBand, DqScratch, dq_band_jacobian};
use crate::preconditioner::local::LocalModel;
use crate::preconditioner::{DaePreconditioner, SetupInput};
use crate::solver::{BandFactorization, BandLu};
use log::{debug, error, warn};

/// Cumulative counters of a BBD preconditioner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BbdStats {
    /// Calls of `LocalModel::evaluate_local`.
    pub local_evals: usize,
    /// Calls of `LocalModel::exchange_halo`.
    pub comm_calls: usize,
    /// Setup requests.
    pub setups: usize,
    /// Successful factorizations.
    pub factorizations: usize,
    /// Preconditioner solves.
    pub solves: usize,
}

/// A factored band block with its pivots.
struct BandFactor {
    lu: BandMatrix,
    pivots: Vec<usize>,
}

impl BandFactor {
    fn try_new(cfg: &PartitionConfig) -> Result<Self, BbdError> {
        let n = cfg.n_local;
        let lu = BandMatrix::try_new(n, cfg.mu_keep, cfg.ml_keep, cfg.storage_upper())?;
        let mut pivots = Vec::new();
        pivots
            .try_reserve_exact(n)
            .map_err(|_| BbdError::AllocationFailure { words: n })?;
        pivots.resize(n, 0);
        Ok(Self { lu, pivots })
    }
}

/// Band-block-diagonal preconditioner state for one partition.
pub struct BandBlockPrec {
    config: PartitionConfig,
    rel: f64,
    model: Box<dyn LocalModel>,
    kernel: Box<dyn BandFactorization>,
    committed: BandFactor,
    staging: BandFactor,
    factored: bool,
    scratch: DqScratch,
    stats: BbdStats,
}

impl BandBlockPrec {
    /// Validate `config` and allocate the preconditioner with the default [`BandLu`] kernel.
    ///
    /// Nothing is allocated when validation fails.
    pub fn new(config: PartitionConfig, model: Box<dyn LocalModel>) -> Result<Self, BbdError> {
        Self::with_kernel(config, model, Box::new(BandLu::new()))
    }

    /// Same as [`BandBlockPrec::new`] with a caller-supplied band kernel.
    pub fn with_kernel(
        config: PartitionConfig,
        model: Box<dyn LocalModel>,
        kernel: Box<dyn BandFactorization>,
    ) -> Result<Self, BbdError> {
        config.validate()?;
        let committed = BandFactor::try_new(&config)?;
        let staging = BandFactor::try_new(&config)?;
        let scratch = DqScratch::try_new(config.n_local)?;
        let rel = config.effective_rel_perturbation();
        debug!(
            "bbd init: n_local={} dq=({}, {}) keep=({}, {}) rel={:e}",
            config.n_local, config.mu_dq, config.ml_dq, config.mu_keep, config.ml_keep, rel
        );
        Ok(Self {
            config,
            rel,
            model,
            kernel,
            committed,
            staging,
            factored: false,
            scratch,
            stats: BbdStats::default(),
        })
    }

    /// Change the evaluation half-bandwidths and the relative increment.
    ///
    /// The stored band shape is fixed, so no storage is touched and an existing
    /// factorization stays usable.
    pub fn reinit(
        &mut self,
        mu_dq: usize,
        ml_dq: usize,
        rel_perturbation: f64,
    ) -> Result<(), BbdError> {
        let c = &self.config;
        check_eval_bandwidths(c.n_local, mu_dq, ml_dq, c.mu_keep, c.ml_keep)?;
        check_rel(rel_perturbation)?;
        self.config.mu_dq = mu_dq;
        self.config.ml_dq = ml_dq;
        self.config.rel_perturbation = rel_perturbation;
        self.rel = resolve_rel(rel_perturbation);
        debug!("bbd reinit: dq=({mu_dq}, {ml_dq}) rel={:e}", self.rel);
        Ok(())
    }

    pub fn config(&self) -> &PartitionConfig {
        &self.config
    }

    /// Relative increment in use (never zero).
    pub fn rel_perturbation(&self) -> f64 {
        self.rel
    }

    /// Real and integer words held by this preconditioner.
    pub fn work_space(&self) -> (usize, usize) {
        let real = self.committed.lu.words() + self.staging.lu.words() + self.scratch.words();
        let int = self.committed.pivots.len() + self.staging.pivots.len();
        (real, int)
    }

    /// Cumulative number of local model evaluations.
    pub fn num_local_evals(&self) -> usize {
        self.stats.local_evals
    }

    pub fn stats(&self) -> BbdStats {
        self.stats
    }

    /// True once a setup has succeeded.
    pub fn is_factored(&self) -> bool {
        self.factored
    }

    /// Committed LU factors and pivots, if any setup has succeeded.
    pub fn factors(&self) -> Option<(&BandMatrix, &[usize])> {
        self.factored
            .then(|| (&self.committed.lu, self.committed.pivots.as_slice()))
    }

    fn check_input(&self, input: &SetupInput<'_>) -> Result<(), SetupFailure> {
        let expected = self.config.n_local;
        let lens = [
            ("y", input.y.len()),
            ("yp", input.yp.len()),
            ("ewt", input.ewt.len()),
            ("constraints", input.constraints.map_or(expected, <[f64]>::len)),
        ];
        match lens.into_iter().find(|&(_, got)| got != expected) {
            Some((name, got)) => Err(SetupFailure::InputLength { name, expected, got }),
            None => Ok(()),
        }
    }
}

impl DaePreconditioner for BandBlockPrec {
    fn setup(&mut self, input: &SetupInput<'_>) -> Result<(), SetupError> {
        self.check_input(input).map_err(SetupError::Unrecoverable)?;
        self.stats.setups += 1;

        if !input.skip_exchange {
            self.stats.comm_calls += 1;
            self.model
                .exchange_halo(input.t, input.y, input.yp)
                .map_err(|e| SetupError::from_callback(e, SetupFailure::Exchange))
                .inspect_err(log_setup_failure)?;
        }

        let band = DqBand {
            mu_dq: self.config.mu_dq,
            ml_dq: self.config.ml_dq,
            mu_keep: self.config.mu_keep,
            ml_keep: self.config.ml_keep,
            rel: self.rel,
        };
        let evals_before = self.stats.local_evals;
        let ngroups = dq_band_jacobian(
            self.model.as_mut(),
            input,
            band,
            &mut self.scratch,
            &mut self.staging.lu,
            &mut self.stats.local_evals,
        )
        .map_err(|e| SetupError::from_callback(e, SetupFailure::LocalEval))
        .inspect_err(log_setup_failure)?;

        if let Some((row, col)) = self.staging.lu.first_non_finite() {
            let e = SetupError::Recoverable(KernelError::NonFinite { row, col }.into());
            log_setup_failure(&e);
            return Err(e);
        }
        self.kernel
            .factor(&mut self.staging.lu, &mut self.staging.pivots)
            .map_err(|e: KernelError| SetupError::Recoverable(e.into()))
            .inspect_err(log_setup_failure)?;

        std::mem::swap(&mut self.committed, &mut self.staging);
        self.factored = true;
        self.stats.factorizations += 1;
        debug!(
            "bbd setup at t={}: {} groups, {} local evals",
            input.t,
            ngroups,
            self.stats.local_evals - evals_before
        );
        Ok(())
    }

    fn apply(&mut self, r: &[f64], z: &mut [f64]) -> Result<(), SolveError> {
        if !self.factored {
            return Err(SolveError::NotFactored);
        }
        let n = self.config.n_local;
        for got in [r.len(), z.len()] {
            if got != n {
                return Err(KernelError::DimensionMismatch { expected: n, got }.into());
            }
        }
        z.copy_from_slice(r);
        self.kernel
            .solve(&self.committed.lu, &self.committed.pivots, z)?;
        self.stats.solves += 1;
        Ok(())
    }
}

fn log_setup_failure(e: &SetupError) {
    if e.is_recoverable() {
        warn!("bbd setup: {e}");
    } else {
        error!("bbd setup: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallbackError;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Tridiagonal linear model; fails on demand.
    struct Tridiag {
        fail: Rc<Cell<Option<CallbackError>>>,
        exchanges: Rc<Cell<usize>>,
    }

    impl LocalModel for Tridiag {
        fn evaluate_local(
            &mut self,
            _t: f64,
            y: &[f64],
            yp: &[f64],
            g: &mut [f64],
        ) -> Result<(), CallbackError> {
            if let Some(e) = self.fail.get() {
                return Err(e);
            }
            let n = y.len();
            for i in 0..n {
                let left = if i > 0 { y[i - 1] } else { 0.0 };
                let right = if i + 1 < n { y[i + 1] } else { 0.0 };
                g[i] = yp[i] + 3.0 * y[i] - left - right;
            }
            Ok(())
        }

        fn exchange_halo(&mut self, _t: f64, _y: &[f64], _yp: &[f64]) -> Result<(), CallbackError> {
            self.exchanges.set(self.exchanges.get() + 1);
            Ok(())
        }
    }

    fn model() -> (Box<Tridiag>, Rc<Cell<Option<CallbackError>>>, Rc<Cell<usize>>) {
        let fail = Rc::new(Cell::new(None));
        let exchanges = Rc::new(Cell::new(0));
        let m = Box::new(Tridiag { fail: fail.clone(), exchanges: exchanges.clone() });
        (m, fail, exchanges)
    }

    #[test]
    fn work_space_counts_both_bands() {
        let (m, _, _) = model();
        let cfg = PartitionConfig::new(10).eval_bandwidths(2, 2).keep_bandwidths(1, 1);
        let pc = BandBlockPrec::new(cfg, m).unwrap();
        // ldim = smu + ml + 1 = 2 + 1 + 1
        assert_eq!(pc.work_space(), (2 * 10 * 4 + 4 * 10, 2 * 10));
        assert_eq!(pc.rel_perturbation(), f64::EPSILON.sqrt());
    }

    #[test]
    fn skip_exchange_suppresses_comm_call() {
        let (m, _, exchanges) = model();
        let cfg = PartitionConfig::new(5).eval_bandwidths(1, 1).keep_bandwidths(1, 1);
        let mut pc = BandBlockPrec::new(cfg, m).unwrap();
        let y = vec![1.0; 5];
        let yp = vec![0.0; 5];
        let ewt = vec![1.0; 5];
        let input = SetupInput::new(0.0, &y, &yp, 1.0, &ewt);
        pc.setup(&input).unwrap();
        pc.setup(&input.skip_exchange(true)).unwrap();
        assert_eq!(exchanges.get(), 1);
        assert_eq!(pc.stats().comm_calls, 1);
        assert_eq!(pc.stats().setups, 2);
    }

    #[test]
    fn unrecoverable_eval_failure_is_fatal() {
        let (m, fail, _) = model();
        let cfg = PartitionConfig::new(4).eval_bandwidths(1, 1).keep_bandwidths(1, 1);
        let mut pc = BandBlockPrec::new(cfg, m).unwrap();
        let y = vec![1.0; 4];
        let ewt = vec![1.0; 4];
        fail.set(Some(CallbackError::Unrecoverable));
        let err = pc.setup(&SetupInput::new(0.0, &y, &y, 1.0, &ewt)).unwrap_err();
        assert_eq!(err, SetupError::Unrecoverable(SetupFailure::LocalEval));
        assert!(!pc.is_factored());
        let mut z = vec![0.0; 4];
        assert_eq!(pc.apply(&y, &mut z), Err(SolveError::NotFactored));
    }

    #[test]
    fn wrong_vector_length_is_rejected() {
        let (m, _, _) = model();
        let mut pc = BandBlockPrec::new(PartitionConfig::new(4), m).unwrap();
        let y = vec![1.0; 4];
        let short = vec![1.0; 3];
        let err = pc.setup(&SetupInput::new(0.0, &y, &y, 1.0, &short)).unwrap_err();
        assert_eq!(
            err,
            SetupError::Unrecoverable(SetupFailure::InputLength {
                name: "ewt",
                expected: 4,
                got: 3
            })
        );
        assert_eq!(pc.num_local_evals(), 0);
    }

    #[test]
    fn singular_block_is_recoverable() {
        let cfg = PartitionConfig::new(3);
        let zero = |_t: f64, _y: &[f64], _yp: &[f64], g: &mut [f64]| -> Result<(), CallbackError> {
            g.iter_mut().for_each(|v| *v = 0.0);
            Ok(())
        };
        let mut pc = BandBlockPrec::new(cfg, Box::new(zero)).unwrap();
        let y = vec![1.0; 3];
        let ewt = vec![1.0; 3];
        let err = pc.setup(&SetupInput::new(0.0, &y, &y, 1.0, &ewt)).unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(err, SetupError::Recoverable(SetupFailure::Factor(KernelError::ZeroPivot(0))));
        assert_eq!(pc.stats().factorizations, 0);
    }
}
