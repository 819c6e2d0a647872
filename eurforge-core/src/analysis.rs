//! Gas-in-place from the boundary-dominated straight line.
//!
//! Once the well sees its drainage boundary the inverse normalized rate is
//! linear in material-balance pseudo-time:
//!
//! ```text
//! Δp_p / q = b_pss + tca / (G·c_ti)
//! ```
//!
//! Blasingame regresses `Δp_p/q` directly; the normalized pressure integral
//! (NPI) regresses its running average, which halves the slope and smooths
//! out scatter.

use crate::{error::EurError, pvt::PvtTable, series::NormalizedSeries, transform};
use eurforge_schemas::{method::DeclineMethod, reservoir::ReservoirParameters};
use serde::Serialize;
use tracing::debug;

const MIN_REGRESSION_POINTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub points: usize,
}

/// Ordinary least-squares line through `(x, y)`.
pub fn least_squares(x: &[f64], y: &[f64]) -> Result<LinearFit, EurError> {
    if x.len() != y.len() {
        return Err(EurError::LengthMismatch(x.len(), y.len()));
    }
    let n = x.len();
    if n < MIN_REGRESSION_POINTS {
        return Err(EurError::InvalidDomain(format!(
            "a straight-line fit needs at least {} points, got {}",
            MIN_REGRESSION_POINTS, n
        )));
    }
    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;
    let (sxy, sxx) = x.iter().zip(y).fold((0.0, 0.0), |(sxy, sxx), (&xi, &yi)| {
        let dx = xi - mean_x;
        (sxy + dx * (yi - mean_y), sxx + dx * dx)
    });
    if sxx == 0.0 {
        return Err(EurError::InvalidDomain(
            "straight-line fit over a single abscissa".to_string(),
        ));
    }
    let slope = sxy / sxx;
    Ok(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
        points: n,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MaterialBalanceFit {
    pub method: DeclineMethod,
    pub gas_in_place: f64,
    pub line: LinearFit,
}

/// Blasingame: `G = 1 / (slope·c_ti)` from `Δp_p/q` against `tca`.
pub fn blasingame_gas_in_place(
    series: &NormalizedSeries,
    ct_i: f64,
    late_time_fraction: f64,
) -> Result<MaterialBalanceFit, EurError> {
    let (tca, inverse_rate) = valid_inverse_rate(series);
    let window = late_time_window(tca.len(), late_time_fraction);
    let line = least_squares(&tca[window.clone()], &inverse_rate[window])?;
    gas_in_place_from_line(DeclineMethod::Blasingame, line, ct_i, 1.0)
}

/// NPI: `G = 1 / (2·slope·c_ti)` from the running average of `Δp_p/q`.
pub fn npi_gas_in_place(
    series: &NormalizedSeries,
    ct_i: f64,
    late_time_fraction: f64,
) -> Result<MaterialBalanceFit, EurError> {
    let (tca, inverse_rate) = valid_inverse_rate(series);
    let integral = transform::running_integral(&tca, &inverse_rate)?;
    let window = late_time_window(tca.len(), late_time_fraction);
    let line = least_squares(&tca[window.clone()], &integral[window])?;
    gas_in_place_from_line(DeclineMethod::Npi, line, ct_i, 2.0)
}

/// Recoverable gas down to the abandonment pressure, from the `p/Z`
/// material balance: `EUR = G·(1 − (p_ab/Z_ab)/(pi/Zi))`.
pub fn recoverable_from_gas_in_place(
    gas_in_place: f64,
    pvt: &PvtTable,
    params: &ReservoirParameters,
    abandonment_pressure: f64,
) -> Result<f64, EurError> {
    if !(abandonment_pressure >= 0.0 && abandonment_pressure < params.p_i) {
        return Err(EurError::InvalidDomain(format!(
            "abandonment pressure {} must lie in [0, pi = {})",
            abandonment_pressure, params.p_i
        )));
    }
    let p_over_z_ab = if abandonment_pressure == 0.0 {
        0.0
    } else {
        abandonment_pressure / pvt.z_factor(abandonment_pressure)
    };
    let recovery_factor = 1.0 - p_over_z_ab / (params.p_i / params.z_i);
    Ok(gas_in_place * recovery_factor)
}

fn gas_in_place_from_line(
    method: DeclineMethod,
    line: LinearFit,
    ct_i: f64,
    slope_multiplier: f64,
) -> Result<MaterialBalanceFit, EurError> {
    if !(line.slope > 0.0 && line.slope.is_finite()) {
        return Err(EurError::InvalidDomain(format!(
            "{} straight line has non-positive slope {:.4e}",
            method, line.slope
        )));
    }
    let gas_in_place = 1.0 / (slope_multiplier * line.slope * ct_i);
    debug!(%method, slope = line.slope, points = line.points, gas_in_place, "material-balance line");
    Ok(MaterialBalanceFit {
        method,
        gas_in_place,
        line,
    })
}

/// `(tca, Δp_p/q)` at the valid points, ordered by `tca`.
fn valid_inverse_rate(series: &NormalizedSeries) -> (Vec<f64>, Vec<f64>) {
    let mut points: Vec<(f64, f64)> = series
        .valid_indices()
        .into_iter()
        .map(|i| (series.tca[i], 1.0 / series.normalized_rate[i]))
        .filter(|(_, y)| y.is_finite())
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    points.into_iter().unzip()
}

/// The last `fraction` of `n` ordered points, never fewer than two.
fn late_time_window(n: usize, fraction: f64) -> std::ops::Range<usize> {
    let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 1.0 };
    let take = ((n as f64 * fraction).ceil() as usize).max(MIN_REGRESSION_POINTS).min(n);
    n - take..n
}
