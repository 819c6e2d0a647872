use crate::{
    constants::PA_PER_MPA,
    decline::{
        arps::{ArpsParameters, EurLimits},
        fitter::FitOptions,
    },
    series::NormalizationOptions,
};
use serde::{Deserialize, Serialize};

/// Abandonment pressure for the material-balance EUR, Pa.
pub const DEFAULT_ABANDONMENT_PRESSURE: f64 = 1.0 * PA_PER_MPA;
pub const DEFAULT_LATE_TIME_FRACTION: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    pub normalization: NormalizationOptions,
    pub fit: FitOptions,
    /// Starting points tried in order; empty means the default seed.
    pub seeds: Vec<ArpsParameters>,
    pub eur_limits: EurLimits,
    /// Share of the valid points, counted from the end, used for the
    /// Blasingame and NPI straight lines.
    pub late_time_fraction: f64,
    pub abandonment_pressure: f64,
    /// Representative flowing pressure for the Fetkovich properties, Pa.
    /// Defaults to the mean bottomhole pressure of the record.
    pub flowing_pressure: Option<f64>,
    /// Recompute the dimensionless series with the fitted drainage radius.
    pub refine_geometry: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            normalization: NormalizationOptions::default(),
            fit: FitOptions::default(),
            seeds: Vec::new(),
            eur_limits: EurLimits::default(),
            late_time_fraction: DEFAULT_LATE_TIME_FRACTION,
            abandonment_pressure: DEFAULT_ABANDONMENT_PRESSURE,
            flowing_pressure: None,
            refine_geometry: true,
        }
    }
}
