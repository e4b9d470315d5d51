//! Configuration of the band-block-diagonal preconditioner.

pub mod options;
pub use options::PartitionConfig;
