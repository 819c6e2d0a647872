use crate::{
    constants::DEFAULT_QUADRATURE_POINTS,
    error::EurError,
    normalization::PseudopressureEngine,
    production::ProductionRecord,
    pseudo_time::{BisectionOptions, PseudoTimeEngine},
    pvt::PvtTable,
    transform,
};
use eurforge_schemas::reservoir::ReservoirParameters;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Per-observation diagnostics carried alongside every derived series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointFlags {
    pub root_not_bracketed: bool,
    pub division_singularity: bool,
    pub zero_rate_substituted: bool,
    pub pvt_extrapolated: bool,
}

impl PointFlags {
    /// A point is usable unless its pressure could not be resolved or its
    /// normalization divides by zero.
    pub fn is_valid(&self) -> bool {
        !(self.root_not_bracketed || self.division_singularity)
    }

    pub fn merge(&mut self, other: PointFlags) {
        self.root_not_bracketed |= other.root_not_bracketed;
        self.division_singularity |= other.division_singularity;
        self.zero_rate_substituted |= other.zero_rate_substituted;
        self.pvt_extrapolated |= other.pvt_extrapolated;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationOptions {
    pub quadrature_points: usize,
    pub bisection: BisectionOptions,
}

impl Default for NormalizationOptions {
    fn default() -> Self {
        Self {
            quadrature_points: DEFAULT_QUADRATURE_POINTS,
            bisection: BisectionOptions::default(),
        }
    }
}

/// Pressure-normalized production history of one well, parallel to its
/// production record. Invalid points hold `NaN` in every derived column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedSeries {
    pub well: String,
    pub time: Vec<f64>,
    pub gas_rate: Vec<f64>,
    /// `Ψ(pi) − Ψ(pwf)`.
    pub drawdown: Vec<f64>,
    /// `q / (Ψ(pi) − Ψ(pwf))`.
    pub normalized_rate: Vec<f64>,
    /// Material-balance average reservoir pressure.
    pub average_pressure: Vec<f64>,
    pub tca: Vec<f64>,
    pub rate_integral: Vec<f64>,
    pub rate_integral_derivative: Vec<f64>,
    pub flags: Vec<PointFlags>,
}

impl NormalizedSeries {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn is_valid(&self, index: usize) -> bool {
        self.flags[index].is_valid()
            && self.tca[index].is_finite()
            && self.normalized_rate[index].is_finite()
    }

    pub fn valid_indices(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.is_valid(i)).collect()
    }
}

/// Runs pseudopressure normalization, material-balance pseudo-time and the
/// integral/derivative transform over one production record.
pub fn normalize_record(
    record: &ProductionRecord,
    pvt: &PvtTable,
    params: &ReservoirParameters,
    options: &NormalizationOptions,
) -> Result<NormalizedSeries, EurError> {
    let pseudopressure =
        PseudopressureEngine::with_quadrature_points(pvt, params, options.quadrature_points)?;
    if pseudopressure.extrapolates(params.p_i) {
        warn!(p_i = params.p_i, "initial pressure lies outside the PVT table; Ψ(pi) is extrapolated");
    }

    let time = record.times();
    let gas_rate = record.gas_rates();
    let n = time.len();

    let mut flags = vec![PointFlags::default(); n];
    let mut drawdown = vec![f64::NAN; n];
    let mut normalized_rate = vec![f64::NAN; n];
    let mut singular = 0usize;

    for (i, observation) in record.observations().iter().enumerate() {
        let p_wf = observation.bottomhole_pressure;
        flags[i].pvt_extrapolated = pseudopressure.extrapolates(p_wf);
        match pseudopressure.drawdown(p_wf) {
            Ok(value) => {
                drawdown[i] = value;
                normalized_rate[i] = observation.gas_rate / value;
            }
            Err(EurError::DivisionSingularity { .. }) => {
                flags[i].division_singularity = true;
                singular += 1;
            }
            Err(err) => return Err(err),
        }
    }
    if singular > 0 {
        warn!(points = singular, "zero pseudopressure drawdown; normalized rate undefined at those points");
    }

    let pseudo_time = PseudoTimeEngine::new(pvt, params)
        .with_bisection(options.bisection)
        .compute(&time, &gas_rate, &record.cumulative_gas())?;
    for (flag, other) in flags.iter_mut().zip(&pseudo_time.flags) {
        flag.merge(*other);
    }

    let extrapolated = flags.iter().filter(|f| f.pvt_extrapolated).count();
    if extrapolated > 0 {
        warn!(points = extrapolated, "PVT properties extrapolated beyond the table range");
    }

    let valid: Vec<bool> = (0..n)
        .map(|i| flags[i].is_valid() && pseudo_time.tca[i].is_finite() && normalized_rate[i].is_finite())
        .collect();
    let transformed =
        transform::integral_derivative_masked(&pseudo_time.tca, &normalized_rate, &valid)?;
    let repeated_origin = (0..n)
        .filter(|&i| valid[i] && transformed.integral[i].is_nan())
        .count();
    if repeated_origin > 0 {
        warn!(points = repeated_origin, "points share tca = 0 with an earlier observation; integral left undefined");
    }

    Ok(NormalizedSeries {
        well: record.well().to_string(),
        time,
        gas_rate,
        drawdown,
        normalized_rate,
        average_pressure: pseudo_time.average_pressure,
        tca: pseudo_time.tca,
        rate_integral: transformed.integral,
        rate_integral_derivative: transformed.derivative,
        flags,
    })
}
