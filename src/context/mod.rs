//! Context module for bbdprec.
//!
//! The integrator owns a chain of contexts: the integrator context holds the step state and
//! an optional Krylov linear-solver context, which in turn holds the optional band-block
//! preconditioner. Every preconditioner operation goes through this chain, so a missing
//! link is reported as a typed error rather than dereferenced.
//!
//! Modules:
//! - [`integrator`]: `IntegratorContext`, step state and the preconditioner entry points.
//! - [`linear_solver`]: `LinearSolverContext`, the setup/solve dispatch of the Krylov layer.

pub mod integrator;
pub use integrator::{IntegratorContext, StepState};
pub mod linear_solver;
pub use linear_solver::LinearSolverContext;
