//! Arps/Fetkovich decline: the rate model, its bounded least-squares fit and
//! the reservoir properties implied by the fitted parameters.

pub mod arps;
pub mod fitter;
pub mod properties;

use self::{arps::ArpsParameters, properties::ReservoirEstimate};
use serde::Serialize;

/// A fitted decline together with the reservoir it implies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeclineFitResult {
    pub parameters: ArpsParameters,
    /// Root-mean-square residual relative to the peak rate.
    pub relative_rmse: f64,
    pub iterations: u64,
    pub points: usize,
    /// Flowing pressure used for the reservoir estimate, Pa.
    pub flowing_pressure: f64,
    pub reservoir: ReservoirEstimate,
}
