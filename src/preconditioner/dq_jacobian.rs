//! Difference-quotient approximation of a banded block of `dG/dy + cj · dG/dy'`.
//!
//! Columns are perturbed in groups `g, g + w, g + 2w, …` with `w = mu_dq + ml_dq + 1`,
//! so one sweep costs one baseline evaluation of `G` plus one evaluation per group.
//! Each difference column is computed over the evaluation band but only rows within
//! `[j - mu_keep, j + ml_keep]` are written to the stored band.

use crate::error::{BbdError, CallbackError};
use crate::matrix::BandMatrix;
use crate::matrix::band::try_zeroed;
use crate::preconditioner::SetupInput;
use crate::preconditioner::local::LocalModel;
use crate::utils::grouping::{group_count, group_members};
use log::trace;

/// Bandwidths and relative increment of one sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DqBand {
    pub mu_dq: usize,
    pub ml_dq: usize,
    pub mu_keep: usize,
    pub ml_keep: usize,
    pub rel: f64,
}

impl DqBand {
    fn width(&self) -> usize {
        self.mu_dq + self.ml_dq + 1
    }
}

/// Work vectors of the sweep: perturbed `y`, `y'` and the baseline/perturbed `G` values.
#[derive(Debug)]
pub(crate) struct DqScratch {
    y: Vec<f64>,
    yp: Vec<f64>,
    g_ref: Vec<f64>,
    g: Vec<f64>,
}

impl DqScratch {
    pub fn try_new(n: usize) -> Result<Self, BbdError> {
        Ok(Self {
            y: try_zeroed(n)?,
            yp: try_zeroed(n)?,
            g_ref: try_zeroed(n)?,
            g: try_zeroed(n)?,
        })
    }

    pub fn words(&self) -> usize {
        self.y.len() + self.yp.len() + self.g_ref.len() + self.g.len()
    }
}

/// Increment applied to component `j`.
///
/// `rel · max(|y_j|, |h y'_j|, 1/ewt_j)`, signed like `h y'_j`, rounded to a representable
/// difference and flipped if the perturbed value would leave its constraint region.
pub(crate) fn increment(input: &SetupInput<'_>, rel: f64, j: usize) -> f64 {
    let yj = input.y[j];
    let hyp = input.hh * input.yp[j];
    let mut inc = rel * yj.abs().max(hyp.abs()).max(1.0 / input.ewt[j]);
    if hyp < 0.0 {
        inc = -inc;
    }
    // a step below the spacing of y_j rounds to zero; keep the unrounded value instead
    let rounded = (yj + inc) - yj;
    if rounded != 0.0 {
        inc = rounded;
    }
    if let Some(c) = input.constraints {
        let cj = c[j];
        let flip = match cj.abs() {
            a if a == 1.0 => (yj + inc) * cj < 0.0,
            a if a == 2.0 => (yj + inc) * cj <= 0.0,
            _ => false,
        };
        if flip {
            inc = -inc;
        }
    }
    inc
}

/// Fill `jac` (zeroed first) with the kept band of the difference-quotient Jacobian.
///
/// Every call of the model, successful or not, is added to `nevals`. Returns the number
/// of perturbation groups swept.
pub(crate) fn dq_band_jacobian(
    model: &mut dyn LocalModel,
    input: &SetupInput<'_>,
    band: DqBand,
    work: &mut DqScratch,
    jac: &mut BandMatrix,
    nevals: &mut usize,
) -> Result<usize, CallbackError> {
    let n = jac.n();
    let res = model.evaluate_local(input.t, input.y, input.yp, &mut work.g_ref);
    *nevals += 1;
    res?;

    work.y.copy_from_slice(input.y);
    work.yp.copy_from_slice(input.yp);
    jac.set_zero();

    let width = band.width();
    let ngroups = group_count(n, width);
    for g in 0..ngroups {
        for j in group_members(n, width, g) {
            let inc = increment(input, band.rel, j);
            work.y[j] += inc;
            work.yp[j] += input.cj * inc;
        }

        let res = model.evaluate_local(input.t, &work.y, &work.yp, &mut work.g);
        *nevals += 1;
        res?;

        for j in group_members(n, width, g) {
            work.y[j] = input.y[j];
            work.yp[j] = input.yp[j];
        }
        load_group(jac, g, band, &work.g_ref, &work.g, |j| increment(input, band.rel, j));
        trace!("dq group {}/{} loaded", g + 1, ngroups);
    }
    Ok(ngroups)
}

/// Write the kept rows of the difference columns of group `g` into `jac`.
fn load_group<F>(
    jac: &mut BandMatrix,
    g: usize,
    band: DqBand,
    g_ref: &[f64],
    g_pert: &[f64],
    inc_of: F,
) where
    F: Fn(usize) -> f64 + Sync,
{
    let n = jac.n();
    let smu = jac.storage_upper();
    let ld = jac.ldim();
    let width = band.width();
    let fill = |j: usize, col: &mut [f64]| {
        let inc_inv = 1.0 / inc_of(j);
        let i1 = j.saturating_sub(band.mu_keep);
        let i2 = (j + band.ml_keep).min(n - 1);
        for i in i1..=i2 {
            col[i + smu - j] = inc_inv * (g_pert[i] - g_ref[i]);
        }
    };
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        jac.data_mut()
            .par_chunks_mut(ld)
            .enumerate()
            .skip(g)
            .step_by(width)
            .for_each(|(j, col)| fill(j, col));
    }
    #[cfg(not(feature = "rayon"))]
    {
        jac.data_mut()
            .chunks_mut(ld)
            .enumerate()
            .skip(g)
            .step_by(width)
            .for_each(|(j, col)| fill(j, col));
    }
}
