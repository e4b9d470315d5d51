//! Ghost-layer exchange for a 1-D block decomposition.
//!
//! Rank `r` owns a contiguous slice of the global vector and needs the last `width` entries
//! of rank `r - 1` (its lower ghosts) and the first `width` entries of rank `r + 1` (its
//! upper ghosts). Even ranks send before receiving and odd ranks receive before sending, so
//! blocking point-to-point calls cannot deadlock.

use super::Comm;

/// Ghost buffers of one partition.
#[derive(Debug, Clone)]
pub struct HaloExchange {
    width: usize,
    lower: Vec<f64>,
    upper: Vec<f64>,
    has_lower: bool,
    has_upper: bool,
}

impl HaloExchange {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            lower: vec![0.0; width],
            upper: vec![0.0; width],
            has_lower: false,
            has_upper: false,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Swap boundary entries of `local` with the neighbouring ranks.
    ///
    /// # Panics
    /// Panics if `local` is shorter than the ghost width.
    pub fn exchange<C: Comm + ?Sized>(&mut self, comm: &C, local: &[f64]) {
        let w = self.width;
        assert!(local.len() >= w, "partition shorter than ghost width");
        let (rank, size) = (comm.rank(), comm.size());
        self.has_lower = rank > 0 && w > 0;
        self.has_upper = rank + 1 < size && w > 0;
        if w == 0 {
            return;
        }
        let n = local.len();
        let even = rank % 2 == 0;

        // upward: my last entries become the lower ghosts of rank + 1
        let up_send = |s: &Self| {
            if s.has_upper {
                comm.send(&local[n - w..], rank + 1);
            }
        };
        if even {
            up_send(self);
        }
        if self.has_lower {
            comm.recv(&mut self.lower, rank - 1);
        }
        if !even {
            up_send(self);
        }

        // downward: my first entries become the upper ghosts of rank - 1
        let down_send = |s: &Self| {
            if s.has_lower {
                comm.send(&local[..w], rank - 1);
            }
        };
        if even {
            down_send(self);
        }
        if self.has_upper {
            comm.recv(&mut self.upper, rank + 1);
        }
        if !even {
            down_send(self);
        }
    }

    /// Last entries of rank - 1, if that rank exists.
    pub fn lower(&self) -> Option<&[f64]> {
        self.has_lower.then_some(self.lower.as_slice())
    }

    /// First entries of rank + 1, if that rank exists.
    pub fn upper(&self) -> Option<&[f64]> {
        self.has_upper.then_some(self.upper.as_slice())
    }
}
