//! Inter-partition communication.
//!
//! The preconditioner itself never communicates: all exchange happens inside the
//! application's `LocalModel::exchange_halo`. This module provides the pieces an application
//! typically needs there: a point-to-point communicator abstraction and a 1-D halo exchanger.

/// Blocking point-to-point communicator over the ranks of a distributed run.
pub trait Comm {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    /// Send `buf` to rank `dest`.
    fn send(&self, buf: &[f64], dest: usize);
    /// Receive exactly `buf.len()` values from rank `source`.
    fn recv(&self, buf: &mut [f64], source: usize);
}

/// Single-partition communicator: rank 0 of 1, so there is never a peer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialComm;

impl Comm for SerialComm {
    fn rank(&self) -> usize { 0 }
    fn size(&self) -> usize { 1 }
    fn send(&self, _buf: &[f64], dest: usize) {
        debug_assert!(false, "SerialComm has no rank {dest} to send to");
    }
    fn recv(&self, _buf: &mut [f64], source: usize) {
        debug_assert!(false, "SerialComm has no rank {source} to receive from");
    }
}

#[cfg(feature="mpi")]
pub mod mpi_comm;
#[cfg(feature="mpi")]
pub use mpi_comm::MpiComm;

pub mod halo;
pub use halo::HaloExchange;
