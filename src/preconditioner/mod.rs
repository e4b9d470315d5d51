//! Preconditioners for Krylov solves inside implicit DAE integrators.
//!
//! This module defines the setup/solve contract the owning linear solver drives, and the
//! band-block-diagonal preconditioner built on difference quotients of a local model.

use crate::error::{SetupError, SolveError};

/// A preconditioner P ≈ dF/dy + cj · dF/dy', rebuilt on request of the linear solver.
pub trait DaePreconditioner {
    /// Rebuild and factor P at the given integrator state.
    fn setup(&mut self, input: &SetupInput<'_>) -> Result<(), SetupError>;
    /// Apply P⁻¹ to r, writing z = P⁻¹ r
    fn apply(&mut self, r: &[f64], z: &mut [f64]) -> Result<(), SolveError>;
}

/// Integrator state handed to a preconditioner setup.
#[derive(Debug, Clone, Copy)]
pub struct SetupInput<'a> {
    pub t: f64,
    pub y: &'a [f64],
    pub yp: &'a [f64],
    /// Coefficient of `y'` in the iteration matrix.
    pub cj: f64,
    /// Current step size.
    pub hh: f64,
    /// Error weights; `1/ewt_j` is the absolute floor of the increment of `y_j`.
    pub ewt: &'a [f64],
    /// Optional inequality constraints per component: 0, ±1 (≥0/≤0), ±2 (>0/<0).
    pub constraints: Option<&'a [f64]>,
    /// Set when the residual evaluation already did the communication for these vectors.
    pub skip_exchange: bool,
}

impl<'a> SetupInput<'a> {
    pub fn new(t: f64, y: &'a [f64], yp: &'a [f64], cj: f64, ewt: &'a [f64]) -> Self {
        Self {
            t,
            y,
            yp,
            cj,
            hh: 0.0,
            ewt,
            constraints: None,
            skip_exchange: false,
        }
    }

    pub fn with_step(mut self, hh: f64) -> Self {
        self.hh = hh;
        self
    }

    pub fn with_constraints(mut self, constraints: &'a [f64]) -> Self {
        self.constraints = Some(constraints);
        self
    }

    pub fn skip_exchange(mut self, skip: bool) -> Self {
        self.skip_exchange = skip;
        self
    }
}

pub mod bbd;
pub(crate) mod dq_jacobian;
pub mod local;

pub use bbd::{BandBlockPrec, BbdStats};
pub use local::LocalModel;
