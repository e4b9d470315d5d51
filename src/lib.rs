//! bbdprec: band-block-diagonal preconditioning for implicit DAE Krylov solves
//!
//! This crate builds, factors and applies a block-diagonal preconditioner with banded blocks,
//! one block per partition of a distributed state vector. Each block is a difference-quotient
//! Jacobian of a user-supplied local approximation `G(t, y, y')` of the DAE residual.

pub mod parallel;

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod matrix;
pub mod preconditioner;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use config::*;
pub use context::*;
pub use self::core::*;
pub use error::*;
pub use matrix::*;
pub use preconditioner::*;
pub use solver::*;
pub use utils::*;
