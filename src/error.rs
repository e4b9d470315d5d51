use thiserror::Error;

// Unified error types for bbdprec

/// Configuration and lifecycle errors reported by init/reinit and the optional-output accessors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BbdError {
    #[error("integrator context is missing (freed)")]
    MissingContext,
    #[error("no Krylov linear solver is attached to the integrator")]
    MissingLinearSolver,
    #[error("band-block preconditioner has not been initialized")]
    MissingPreconditioner,
    #[error("illegal input: {0}")]
    IllegalInput(String),
    #[error("failed to allocate {words} words of preconditioner storage")]
    AllocationFailure { words: usize },
}

/// Status codes of the status-returning interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    MissingContext,
    MissingLinearSolverContext,
    IllegalInput,
    AllocationFailure,
    MissingPreconditionerState,
}

impl Status {
    /// Integer code as seen by integrator bookkeeping.
    pub fn code(self) -> i32 {
        match self {
            Status::Success => 0,
            Status::MissingContext => -1,
            Status::MissingLinearSolverContext => -2,
            Status::IllegalInput => -3,
            Status::AllocationFailure => -4,
            Status::MissingPreconditionerState => -5,
        }
    }
}

impl From<&BbdError> for Status {
    fn from(e: &BbdError) -> Self {
        match e {
            BbdError::MissingContext => Status::MissingContext,
            BbdError::MissingLinearSolver => Status::MissingLinearSolverContext,
            BbdError::MissingPreconditioner => Status::MissingPreconditionerState,
            BbdError::IllegalInput(_) => Status::IllegalInput,
            BbdError::AllocationFailure { .. } => Status::AllocationFailure,
        }
    }
}

impl<T> From<&Result<T, BbdError>> for Status {
    fn from(r: &Result<T, BbdError>) -> Self {
        match r {
            Ok(_) => Status::Success,
            Err(e) => e.into(),
        }
    }
}

/// Failure signalled by a user-supplied local model callback.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackError {
    /// The integrator may retry (smaller step, fresh Jacobian).
    #[error("recoverable callback failure")]
    Recoverable,
    #[error("unrecoverable callback failure")]
    Unrecoverable,
}

/// Errors raised by a banded factorization kernel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("zero pivot in column {0}")]
    ZeroPivot(usize),
    #[error("non-finite entry at ({row}, {col})")]
    NonFinite { row: usize, col: usize },
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("band storage has no room for LU fill-in (storage upper width {smu} < {needed})")]
    InsufficientFill { smu: usize, needed: usize },
}

/// Which stage of a preconditioner setup failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupFailure {
    #[error("halo exchange failed")]
    Exchange,
    #[error("local residual evaluation failed")]
    LocalEval,
    #[error("factorization failed: {0}")]
    Factor(#[from] KernelError),
    #[error("input vector {name} has length {got}, expected {expected}")]
    InputLength { name: &'static str, expected: usize, got: usize },
    #[error(transparent)]
    Context(#[from] BbdError),
}

/// Result of a failed preconditioner setup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    #[error("recoverable setup failure: {0}")]
    Recoverable(SetupFailure),
    #[error("unrecoverable setup failure: {0}")]
    Unrecoverable(SetupFailure),
}

impl SetupError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SetupError::Recoverable(_))
    }

    /// Classify a callback failure at the given setup stage.
    pub(crate) fn from_callback(e: CallbackError, stage: SetupFailure) -> Self {
        match e {
            CallbackError::Recoverable => SetupError::Recoverable(stage),
            CallbackError::Unrecoverable => SetupError::Unrecoverable(stage),
        }
    }
}

/// Errors raised while applying the preconditioner.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    #[error("preconditioner applied before any successful setup")]
    NotFactored,
    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),
    #[error(transparent)]
    Context(#[from] BbdError),
}
