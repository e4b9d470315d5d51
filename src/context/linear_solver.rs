//! Krylov linear-solver context.
//!
//! Holds the Krylov parameters the integrator configured and the preconditioner attached to
//! them. The Krylov iteration itself lives outside this crate; it calls
//! [`LinearSolverContext::psetup`] and [`LinearSolverContext::psolve`] whenever it needs a
//! fresh or applied preconditioner.

use crate::error::{BbdError, SetupError, SetupFailure, SolveError};
use crate::preconditioner::{BandBlockPrec, DaePreconditioner, SetupInput};

/// Default maximum Krylov subspace dimension.
pub const DEFAULT_MAX_KRYLOV_DIM: usize = 5;

/// Linear-solver context owning the preconditioner.
pub struct LinearSolverContext {
    max_krylov_dim: usize,
    pub(crate) precond: Option<BandBlockPrec>,
    /// Preconditioner setups requested.
    npe: usize,
    /// Preconditioner solves requested.
    nps: usize,
}

impl LinearSolverContext {
    /// `max_krylov_dim == 0` selects [`DEFAULT_MAX_KRYLOV_DIM`].
    pub fn new(max_krylov_dim: usize) -> Self {
        let max_krylov_dim = if max_krylov_dim == 0 {
            DEFAULT_MAX_KRYLOV_DIM
        } else {
            max_krylov_dim
        };
        Self { max_krylov_dim, precond: None, npe: 0, nps: 0 }
    }

    pub fn max_krylov_dim(&self) -> usize {
        self.max_krylov_dim
    }

    pub fn has_preconditioner(&self) -> bool {
        self.precond.is_some()
    }

    pub fn num_prec_evals(&self) -> usize {
        self.npe
    }

    pub fn num_prec_solves(&self) -> usize {
        self.nps
    }

    /// Attach a preconditioner, returning the one it replaces.
    pub fn attach(&mut self, pc: BandBlockPrec) -> Option<BandBlockPrec> {
        self.precond.replace(pc)
    }

    pub fn bbd(&self) -> Result<&BandBlockPrec, BbdError> {
        self.precond.as_ref().ok_or(BbdError::MissingPreconditioner)
    }

    pub fn bbd_mut(&mut self) -> Result<&mut BandBlockPrec, BbdError> {
        self.precond.as_mut().ok_or(BbdError::MissingPreconditioner)
    }

    /// Preconditioner setup as requested by the Krylov iteration.
    pub fn psetup(&mut self, input: &SetupInput<'_>) -> Result<(), SetupError> {
        let missing = SetupFailure::Context(BbdError::MissingPreconditioner);
        let pc = self
            .precond
            .as_mut()
            .ok_or(SetupError::Unrecoverable(missing))?;
        self.npe += 1;
        pc.setup(input)
    }

    /// Preconditioner solve `z = P⁻¹ r` as requested by the Krylov iteration.
    pub fn psolve(&mut self, r: &[f64], z: &mut [f64]) -> Result<(), SolveError> {
        let pc = self.precond.as_mut().ok_or(BbdError::MissingPreconditioner)?;
        self.nps += 1;
        pc.apply(r, z)
    }
}

impl Default for LinearSolverContext {
    fn default() -> Self {
        Self::new(0)
    }
}
