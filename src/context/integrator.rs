//! Integrator-side context.
//!
//! `IntegratorContext` stands for the memory of the DAE integrator: the local length of the
//! state vector, the current step data (`t`, `h`, `cj`, error weights, constraints) and the
//! attached Krylov linear solver. The band-block preconditioner is created, reconfigured and
//! queried through it.
//!
//! # Example
//! ```rust
//! use bbdprec::{CallbackError, IntegratorContext, PartitionConfig};
//!
//! let mut ida = IntegratorContext::new(8);
//! ida.attach_krylov(0).unwrap();
//! let g = |_t: f64, y: &[f64], yp: &[f64], g: &mut [f64]| -> Result<(), CallbackError> {
//!     for i in 0..y.len() {
//!         g[i] = yp[i] + 2.0 * y[i];
//!     }
//!     Ok(())
//! };
//! let cfg = PartitionConfig::new(8).eval_bandwidths(1, 1).keep_bandwidths(1, 1);
//! ida.bbd_prec_init(cfg, g).unwrap();
//! assert_eq!(ida.bbd_num_local_evals().unwrap(), 0);
//! ```

use crate::config::PartitionConfig;
use crate::context::linear_solver::LinearSolverContext;
use crate::error::{BbdError, SetupError, SetupFailure, SolveError};
use crate::preconditioner::{BandBlockPrec, BbdStats, LocalModel, SetupInput};
use crate::solver::BandFactorization;
use log::debug;

/// Step data the integrator hands to preconditioner setups.
#[derive(Debug, Clone, PartialEq)]
pub struct StepState {
    pub t: f64,
    /// Current step size.
    pub hh: f64,
    /// Coefficient of `y'` in the iteration matrix.
    pub cj: f64,
    pub ewt: Vec<f64>,
    pub constraints: Option<Vec<f64>>,
}

impl StepState {
    fn new(n: usize) -> Self {
        Self { t: 0.0, hh: 0.0, cj: 1.0, ewt: vec![1.0; n], constraints: None }
    }
}

struct IntegratorMem {
    n_local: usize,
    step: StepState,
    lsolver: Option<LinearSolverContext>,
}

/// Owner of the linear-solver and preconditioner contexts.
pub struct IntegratorContext {
    mem: Option<IntegratorMem>,
}

impl IntegratorContext {
    pub fn new(n_local: usize) -> Self {
        Self {
            mem: Some(IntegratorMem { n_local, step: StepState::new(n_local), lsolver: None }),
        }
    }

    /// Tear down the integrator together with its linear solver and preconditioner.
    pub fn free(&mut self) {
        self.mem = None;
    }

    pub fn is_live(&self) -> bool {
        self.mem.is_some()
    }

    fn mem(&self) -> Result<&IntegratorMem, BbdError> {
        self.mem.as_ref().ok_or(BbdError::MissingContext)
    }

    fn mem_mut(&mut self) -> Result<&mut IntegratorMem, BbdError> {
        self.mem.as_mut().ok_or(BbdError::MissingContext)
    }

    pub fn n_local(&self) -> Result<usize, BbdError> {
        Ok(self.mem()?.n_local)
    }

    /// Attach a Krylov linear solver (replacing any previous one and its preconditioner).
    pub fn attach_krylov(&mut self, max_krylov_dim: usize) -> Result<(), BbdError> {
        self.mem_mut()?.lsolver = Some(LinearSolverContext::new(max_krylov_dim));
        Ok(())
    }

    pub fn linear_solver(&self) -> Result<&LinearSolverContext, BbdError> {
        self.mem()?.lsolver.as_ref().ok_or(BbdError::MissingLinearSolver)
    }

    fn linear_solver_mut(&mut self) -> Result<&mut LinearSolverContext, BbdError> {
        self.mem_mut()?.lsolver.as_mut().ok_or(BbdError::MissingLinearSolver)
    }

    pub fn step(&self) -> Result<&StepState, BbdError> {
        Ok(&self.mem()?.step)
    }

    pub fn set_step(&mut self, t: f64, hh: f64, cj: f64) -> Result<(), BbdError> {
        let step = &mut self.mem_mut()?.step;
        step.t = t;
        step.hh = hh;
        step.cj = cj;
        Ok(())
    }

    /// Error weights must be positive and match the local length.
    pub fn set_error_weights(&mut self, ewt: Vec<f64>) -> Result<(), BbdError> {
        let mem = self.mem_mut()?;
        if ewt.len() != mem.n_local {
            return Err(BbdError::IllegalInput(format!(
                "error weights have length {}, expected {}",
                ewt.len(),
                mem.n_local
            )));
        }
        if ewt.iter().any(|&w| !(w > 0.0)) {
            return Err(BbdError::IllegalInput("error weights must be positive".into()));
        }
        mem.step.ewt = ewt;
        Ok(())
    }

    /// Constraint codes per component: 0, ±1 or ±2.
    pub fn set_constraints(&mut self, constraints: Option<Vec<f64>>) -> Result<(), BbdError> {
        let mem = self.mem_mut()?;
        if let Some(c) = &constraints {
            if c.len() != mem.n_local {
                return Err(BbdError::IllegalInput(format!(
                    "constraints have length {}, expected {}",
                    c.len(),
                    mem.n_local
                )));
            }
            if c.iter().any(|&v| ![0.0, 1.0, 2.0].contains(&v.abs())) {
                return Err(BbdError::IllegalInput("constraint codes must be 0, ±1 or ±2".into()));
            }
        }
        mem.step.constraints = constraints;
        Ok(())
    }

    /// Create the band-block preconditioner with the default band LU kernel and attach it
    /// to the linear solver.
    pub fn bbd_prec_init<M>(&mut self, config: PartitionConfig, model: M) -> Result<(), BbdError>
    where
        M: LocalModel + 'static,
    {
        self.bbd_prec_init_with(config, Box::new(model), None)
    }

    /// Same as [`IntegratorContext::bbd_prec_init`] with a caller-supplied band kernel.
    pub fn bbd_prec_init_with_kernel<M, K>(
        &mut self,
        config: PartitionConfig,
        model: M,
        kernel: K,
    ) -> Result<(), BbdError>
    where
        M: LocalModel + 'static,
        K: BandFactorization + 'static,
    {
        self.bbd_prec_init_with(config, Box::new(model), Some(Box::new(kernel)))
    }

    fn bbd_prec_init_with(
        &mut self,
        config: PartitionConfig,
        model: Box<dyn LocalModel>,
        kernel: Option<Box<dyn BandFactorization>>,
    ) -> Result<(), BbdError> {
        let n_local = self.mem()?.n_local;
        let lsolver = self.linear_solver_mut()?;
        if config.n_local != n_local {
            return Err(BbdError::IllegalInput(format!(
                "partition length {} differs from integrator local length {}",
                config.n_local, n_local
            )));
        }
        let pc = match kernel {
            Some(k) => BandBlockPrec::with_kernel(config, model, k)?,
            None => BandBlockPrec::new(config, model)?,
        };
        if lsolver.attach(pc).is_some() {
            debug!("bbd init replaced an existing preconditioner");
        }
        Ok(())
    }

    /// Change evaluation half-bandwidths and relative increment of the attached preconditioner.
    pub fn bbd_prec_reinit(
        &mut self,
        mu_dq: usize,
        ml_dq: usize,
        rel_perturbation: f64,
    ) -> Result<(), BbdError> {
        self.linear_solver_mut()?.bbd_mut()?.reinit(mu_dq, ml_dq, rel_perturbation)
    }

    /// Real and integer work-space words of the preconditioner.
    pub fn bbd_work_space(&self) -> Result<(usize, usize), BbdError> {
        Ok(self.linear_solver()?.bbd()?.work_space())
    }

    pub fn bbd_num_local_evals(&self) -> Result<usize, BbdError> {
        Ok(self.linear_solver()?.bbd()?.num_local_evals())
    }

    pub fn bbd_stats(&self) -> Result<BbdStats, BbdError> {
        Ok(self.linear_solver()?.bbd()?.stats())
    }

    /// Preconditioner setup at the current step state, as requested by the linear solver.
    pub fn prec_setup(
        &mut self,
        y: &[f64],
        yp: &[f64],
        skip_exchange: bool,
    ) -> Result<(), SetupError> {
        let missing = |e: BbdError| SetupError::Unrecoverable(SetupFailure::Context(e));
        let mem = self.mem.as_mut().ok_or(missing(BbdError::MissingContext))?;
        let lsolver = mem
            .lsolver
            .as_mut()
            .ok_or(missing(BbdError::MissingLinearSolver))?;
        let step = &mem.step;
        let mut input = SetupInput::new(step.t, y, yp, step.cj, &step.ewt)
            .with_step(step.hh)
            .skip_exchange(skip_exchange);
        if let Some(c) = &step.constraints {
            input = input.with_constraints(c);
        }
        lsolver.psetup(&input)
    }

    /// Preconditioner solve `z = P⁻¹ r`, as requested by the linear solver.
    pub fn prec_solve(&mut self, r: &[f64], z: &mut [f64]) -> Result<(), SolveError> {
        self.linear_solver_mut()?.psolve(r, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CallbackError, Status};

    fn diag_model(_t: f64, y: &[f64], yp: &[f64], g: &mut [f64]) -> Result<(), CallbackError> {
        for i in 0..y.len() {
            g[i] = yp[i] + y[i];
        }
        Ok(())
    }

    #[test]
    fn init_requires_linear_solver() {
        let mut ida = IntegratorContext::new(4);
        let r = ida.bbd_prec_init(PartitionConfig::new(4), diag_model);
        assert_eq!(r, Err(BbdError::MissingLinearSolver));
        assert_eq!(Status::from(&r), Status::MissingLinearSolverContext);
    }

    #[test]
    fn freed_context_reports_missing_context() {
        let mut ida = IntegratorContext::new(4);
        ida.attach_krylov(10).unwrap();
        ida.bbd_prec_init(PartitionConfig::new(4), diag_model).unwrap();
        ida.free();
        assert!(!ida.is_live());
        assert_eq!(ida.bbd_num_local_evals(), Err(BbdError::MissingContext));
        assert_eq!(ida.bbd_prec_reinit(0, 0, 0.0), Err(BbdError::MissingContext));
        let r = ida.prec_setup(&[1.0; 4], &[0.0; 4], false);
        let missing = SetupError::Unrecoverable(SetupFailure::Context(BbdError::MissingContext));
        assert_eq!(r, Err(missing));
    }

    #[test]
    fn partition_length_must_match_integrator() {
        let mut ida = IntegratorContext::new(4);
        ida.attach_krylov(0).unwrap();
        let r = ida.bbd_prec_init(PartitionConfig::new(5), diag_model);
        assert!(matches!(r, Err(BbdError::IllegalInput(_))));
        assert_eq!(ida.linear_solver().unwrap().max_krylov_dim(), 5);
    }

    #[test]
    fn step_state_validation() {
        let mut ida = IntegratorContext::new(3);
        assert!(ida.set_error_weights(vec![1.0, 0.0, 1.0]).is_err());
        assert!(ida.set_error_weights(vec![1.0; 2]).is_err());
        assert!(ida.set_constraints(Some(vec![0.0, 3.0, 1.0])).is_err());
        ida.set_constraints(Some(vec![0.0, -2.0, 1.0])).unwrap();
        ida.set_step(1.5, 0.01, 100.0).unwrap();
        let step = ida.step().unwrap();
        assert_eq!((step.t, step.hh, step.cj), (1.5, 0.01, 100.0));
    }

    #[test]
    fn setup_and_solve_through_contexts() {
        let mut ida = IntegratorContext::new(4);
        ida.attach_krylov(0).unwrap();
        ida.bbd_prec_init(PartitionConfig::new(4), diag_model).unwrap();
        ida.set_step(0.0, 0.1, 10.0).unwrap();
        ida.prec_setup(&[1.0; 4], &[0.0; 4], false).unwrap();
        let mut z = [0.0; 4];
        ida.prec_solve(&[11.0; 4], &mut z).unwrap();
        for zi in z {
            assert!((zi - 1.0).abs() < 1e-6);
        }
        let ls = ida.linear_solver().unwrap();
        assert_eq!((ls.num_prec_evals(), ls.num_prec_solves()), (1, 1));
    }
}
