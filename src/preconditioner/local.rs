//! Local model callbacks supplied by the application.

use crate::error::CallbackError;

/// Capability interface of the application side of the preconditioner.
///
/// `evaluate_local` computes `G(t, y, y')`, a local approximation of the DAE residual on this
/// partition, using only locally held data plus whatever `exchange_halo` stored. Implementors
/// keep ghost data in their own fields.
pub trait LocalModel {
    /// Compute the local part of `G(t, y, y')` into `g`.
    fn evaluate_local(
        &mut self,
        t: f64,
        y: &[f64],
        yp: &[f64],
        g: &mut [f64],
    ) -> Result<(), CallbackError>;

    /// Exchange inter-partition data needed by `evaluate_local`.
    ///
    /// Called once per setup, before any local evaluation. The default does nothing, for
    /// models whose residual evaluation already performed all required communication.
    fn exchange_halo(&mut self, _t: f64, _y: &[f64], _yp: &[f64]) -> Result<(), CallbackError> {
        Ok(())
    }
}

/// Plain closures serve as models without communication.
impl<F> LocalModel for F
where
    F: FnMut(f64, &[f64], &[f64], &mut [f64]) -> Result<(), CallbackError>,
{
    fn evaluate_local(
        &mut self,
        t: f64,
        y: &[f64],
        yp: &[f64],
        g: &mut [f64],
    ) -> Result<(), CallbackError> {
        self(t, y, yp, g)
    }
}
