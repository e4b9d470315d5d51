//! Matrix module: banded storage for preconditioner blocks.

pub mod band;
pub use band::BandMatrix;
