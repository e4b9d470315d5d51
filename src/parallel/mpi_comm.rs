//! MPI-based parallel communication module.
//!
//! This module provides an implementation of the `Comm` trait using the MPI (Message Passing
//! Interface) backend for distributed-memory parallelism. It is only available when the `mpi`
//! feature is enabled.
//!
//! # Usage
//!
//! - The `MpiComm` struct keeps the MPI universe alive and wraps the world communicator.
//! - Halo exchanges inside a `LocalModel` can be written against `Comm` and run on `MpiComm`
//!   in production and on `SerialComm` for single-partition runs.
//!
//! # References
//! - [MPI Standard](https://www.mpi-forum.org/)
//!
//! # Example
//! ```no_run
//! #[cfg(feature = "mpi")]
//! {
//!     use bbdprec::parallel::{Comm, MpiComm};
//!     let comm = MpiComm::new().expect("MPI already initialized");
//!     println!("Rank: {} / {}", comm.rank(), comm.size());
//! }
//! ```

#[cfg(feature = "mpi")]
use mpi::environment::Universe;
#[cfg(feature = "mpi")]
use mpi::topology::SimpleCommunicator;
#[cfg(feature = "mpi")]
use mpi::traits::*;

/// MPI communicator wrapper for distributed parallelism.
///
/// Holds the MPI universe (finalized on drop), the world communicator, the rank of the current
/// process, and the total number of processes.
#[cfg(feature = "mpi")]
pub struct MpiComm {
    _universe: Universe,
    /// The MPI world communicator (all processes in the job).
    pub world: SimpleCommunicator,
    /// The rank (ID) of this process within the communicator.
    pub rank: usize,
    /// The total number of processes in the communicator.
    pub size: usize,
}

#[cfg(feature = "mpi")]
impl MpiComm {
    /// Initializes MPI and constructs a new `MpiComm` instance.
    ///
    /// Returns `None` if MPI was already initialized.
    pub fn new() -> Option<Self> {
        let universe = mpi::initialize()?;
        let world = universe.world();
        let rank = world.rank() as usize;
        let size = world.size() as usize;
        Some(MpiComm { _universe: universe, world, rank, size })
    }
}

#[cfg(feature = "mpi")]
impl super::Comm for MpiComm {
    /// Returns the rank (ID) of this process.
    fn rank(&self) -> usize { self.rank }
    /// Returns the total number of processes in the communicator.
    fn size(&self) -> usize { self.size }

    /// Blocking standard-mode send to `dest`.
    fn send(&self, buf: &[f64], dest: usize) {
        self.world.process_at_rank(dest as i32).send(buf);
    }

    /// Blocking receive from `source` into `buf`.
    fn recv(&self, buf: &mut [f64], source: usize) {
        let _status = self.world.process_at_rank(source as i32).receive_into(buf);
    }
}
