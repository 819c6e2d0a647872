//! Material-balance pseudo-time.
//!
//! For every observation the average reservoir pressure is recovered from the
//! gas material balance `p/Z = (pi/Zi)·(1 − Gp/G)`, the gas properties at
//! that pressure feed the integrand `q / (μg·Cg)`, and
//!
//! ```text
//! tca = (μgi·Cti / q) · ∫₀ᵗ q / (μg·Cg) dτ
//! ```

use crate::{
    constants::{
        DEFAULT_BISECTION_MAX_ITERATIONS, DEFAULT_BISECTION_TOLERANCE_PA, PER_MPA_TO_PER_PA,
        ZERO_RATE_EPSILON,
    },
    error::EurError,
    pvt::PvtTable,
    series::PointFlags,
};
use eurforge_schemas::reservoir::ReservoirParameters;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BisectionOptions {
    pub max_iterations: usize,
    /// Absolute tolerance on the bracketing interval, Pa.
    pub tolerance: f64,
}

impl Default for BisectionOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_BISECTION_MAX_ITERATIONS,
            tolerance: DEFAULT_BISECTION_TOLERANCE_PA,
        }
    }
}

/// Solves `p / Z(p) = target` by bisection over the table's pressure range.
///
/// # Errors
///
/// `RootNotBracketed` when `p/Z` at the two ends of the table does not
/// straddle `target`.
pub fn invert_p_over_z(
    pvt: &PvtTable,
    target: f64,
    options: &BisectionOptions,
) -> Result<f64, EurError> {
    let residual = |p: f64| p / pvt.z_factor(p) - target;
    let (mut lo, mut hi) = pvt.pressure_range();
    let mut f_lo = residual(lo);
    let f_hi = residual(hi);

    if f_lo == 0.0 {
        return Ok(lo);
    }
    if f_hi == 0.0 {
        return Ok(hi);
    }
    if !(f_lo.is_finite() && f_hi.is_finite()) || f_lo.signum() == f_hi.signum() {
        return Err(EurError::RootNotBracketed {
            target,
            min: f_lo + target,
            max: f_hi + target,
        });
    }

    for _ in 0..options.max_iterations {
        let mid = 0.5 * (lo + hi);
        let f_mid = residual(mid);
        if f_mid == 0.0 || 0.5 * (hi - lo) < options.tolerance {
            return Ok(mid);
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    Ok(0.5 * (lo + hi))
}

/// Pseudo-time and the material-balance pressure behind it, per observation.
#[derive(Debug, Clone, PartialEq)]
pub struct PseudoTimeSeries {
    pub average_pressure: Vec<f64>,
    pub tca: Vec<f64>,
    pub flags: Vec<PointFlags>,
}

pub struct PseudoTimeEngine<'a> {
    pvt: &'a PvtTable,
    params: &'a ReservoirParameters,
    bisection: BisectionOptions,
}

impl<'a> PseudoTimeEngine<'a> {
    pub fn new(pvt: &'a PvtTable, params: &'a ReservoirParameters) -> Self {
        Self {
            pvt,
            params,
            bisection: BisectionOptions::default(),
        }
    }

    pub fn with_bisection(mut self, bisection: BisectionOptions) -> Self {
        self.bisection = bisection;
        self
    }

    /// Computes `tca` for parallel `time`, `rate` and `cumulative` slices.
    ///
    /// Points whose material-balance pressure cannot be bracketed get `NaN`
    /// and are flagged; the running integral bridges them by connecting the
    /// neighbouring valid points.
    pub fn compute(
        &self,
        time: &[f64],
        rate: &[f64],
        cumulative: &[f64],
    ) -> Result<PseudoTimeSeries, EurError> {
        let n = time.len();
        for len in [rate.len(), cumulative.len()] {
            if len != n {
                return Err(EurError::LengthMismatch(n, len));
            }
        }
        if let Some(row) = (1..n).find(|&i| !(time[i] > time[i - 1])) {
            return Err(EurError::NonMonotonicTime { row });
        }

        let initial_p_over_z = self.params.p_i / self.params.z_i;
        let initial_mu_ct = self.params.mu_gi * self.params.ct_i;

        let mut series = PseudoTimeSeries {
            average_pressure: vec![f64::NAN; n],
            tca: vec![f64::NAN; n],
            flags: vec![PointFlags::default(); n],
        };
        let mut integral = 0.0;
        let mut previous: Option<(f64, f64)> = None;
        let mut unbracketed = 0usize;

        for i in 0..n {
            let target = initial_p_over_z * (1.0 - cumulative[i] / self.params.gas_in_place);
            let pressure = match invert_p_over_z(self.pvt, target, &self.bisection) {
                Ok(pressure) => pressure,
                Err(err @ EurError::RootNotBracketed { .. }) => {
                    debug!(index = i, error = %err, "material-balance pressure not bracketed");
                    series.flags[i].root_not_bracketed = true;
                    unbracketed += 1;
                    continue;
                }
                Err(err) => return Err(err),
            };

            let lookup = self.pvt.lookup(pressure);
            let properties = lookup.properties;
            series.flags[i].pvt_extrapolated = lookup.extrapolated;
            series.average_pressure[i] = pressure;

            let gas_compressibility =
                properties.z_factor / (pressure * properties.compressibility * PER_MPA_TO_PER_PA);
            let integrand = rate[i] / (properties.viscosity * gas_compressibility);

            if let Some((t_prev, f_prev)) = previous {
                integral += 0.5 * (f_prev + integrand) * (time[i] - t_prev);
            }
            previous = Some((time[i], integrand));

            let divisor = if rate[i] == 0.0 {
                warn!(index = i, epsilon = ZERO_RATE_EPSILON, "zero gas rate replaced by epsilon");
                series.flags[i].zero_rate_substituted = true;
                ZERO_RATE_EPSILON
            } else {
                rate[i]
            };
            series.tca[i] = initial_mu_ct / divisor * integral;
        }

        if unbracketed > 0 {
            warn!(
                points = unbracketed,
                "material-balance p/Z outside the PVT table; pseudo-time left undefined at those points"
            );
        }

        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use eurforge_schemas::pvt::PvtRow;

    fn params(p_i: f64, gas_in_place: f64) -> ReservoirParameters {
        ReservoirParameters {
            mu_gi: 1.8e-5,
            z_i: 1.0,
            p_i,
            ct_i: 0.06,
            gas_in_place,
            permeability: 1.0,
            porosity: 0.1,
            temperature: 360.0,
            thickness: 10.0,
            skin: 0.0,
            wellbore_radius: Some(0.1),
            water_saturation: Some(0.3),
        }
    }

    fn flat_table() -> PvtTable {
        PvtTable::new(vec![
            PvtRow { pressure: 0.0, viscosity: 1.8e-5, z_factor: 1.0, compressibility: 0.06 },
            PvtRow { pressure: 20.0e6, viscosity: 1.8e-5, z_factor: 1.0, compressibility: 0.06 },
        ])
        .unwrap()
    }

    #[test]
    fn bisection_recovers_pressure_from_p_over_z() {
        let table = PvtTable::new(
            (0..=40)
                .map(|k| {
                    let p = k as f64 * 0.5e6;
                    PvtRow { pressure: p, viscosity: 1.5e-5, z_factor: 1.0 - 0.004 * (p / 1.0e6), compressibility: 0.1 }
                })
                .collect(),
        )
        .unwrap();

        for &expected in &[1.3e6, 7.77e6, 12.0e6, 19.9e6] {
            let target = expected / table.z_factor(expected);
            let solved = invert_p_over_z(&table, target, &BisectionOptions::default()).unwrap();
            assert_relative_eq!(solved, expected, epsilon = 1.0e-2);
        }
    }

    #[test]
    fn bisection_reports_unbracketed_targets() {
        let table = flat_table();
        let err = invert_p_over_z(&table, 25.0e6, &BisectionOptions::default()).unwrap_err();
        assert!(matches!(err, EurError::RootNotBracketed { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn pseudo_time_starts_at_zero_and_grows_for_flat_properties() {
        let table = flat_table();
        let params = params(20.0e6, 1.0e10);
        let engine = PseudoTimeEngine::new(&table, &params);

        let result = engine
            .compute(&[0.0, 30.0, 60.0], &[1000.0, 900.0, 800.0], &[0.0, 900.0, 1700.0])
            .unwrap();

        assert_eq!(result.tca[0], 0.0);
        assert!(result.tca.iter().all(|t| t.is_finite()));
        assert!(result.tca[2] > result.tca[1]);
        assert!(result.flags.iter().all(|f| f.is_valid()));
        assert_eq!(result.average_pressure[0], 20.0e6);
    }

    #[test]
    fn constant_rate_pseudo_time_is_proportional_to_time() {
        let table = flat_table();
        let params = params(20.0e6, 1.0e12);
        let engine = PseudoTimeEngine::new(&table, &params);

        let result = engine
            .compute(&[0.0, 10.0, 20.0], &[500.0, 500.0, 500.0], &[0.0, 5000.0, 10000.0])
            .unwrap();

        // Depletion is negligible, so tca = Cti·pi·Ct(pi)/Zi · t with Ct in Pa⁻¹.
        let slope = 0.06 * 20.0e6 * 0.06 * 1.0e-6;
        assert_relative_eq!(result.tca[1], slope * 10.0, max_relative = 1e-6);
        assert_relative_eq!(result.tca[2], slope * 20.0, max_relative = 1e-6);
    }

    #[test]
    fn unbracketed_points_are_skipped_and_bridged() {
        let table = flat_table();
        // Gp beyond G drives p/Z negative at the middle point.
        let params = params(20.0e6, 1.0e4);
        let engine = PseudoTimeEngine::new(&table, &params);

        let result = engine
            .compute(&[0.0, 1.0, 2.0, 3.0], &[10.0, 10.0, 10.0, 10.0], &[0.0, 2.0e4, 10.0, 20.0])
            .unwrap();

        assert!(result.tca[1].is_nan());
        assert!(result.flags[1].root_not_bracketed);
        assert!(!result.flags[1].is_valid());
        assert!(result.tca[2] > 0.0);
        assert!(result.tca[3] > result.tca[2]);
    }

    #[test]
    fn zero_rate_is_substituted_and_flagged() {
        let table = flat_table();
        let params = params(20.0e6, 1.0e10);
        let engine = PseudoTimeEngine::new(&table, &params);

        let result = engine
            .compute(&[0.0, 1.0], &[100.0, 0.0], &[0.0, 50.0])
            .unwrap();

        assert!(result.flags[1].zero_rate_substituted);
        assert!(result.tca[1].is_finite());
        assert!(result.tca[1] > 0.0);
    }

    #[test]
    fn rejects_non_increasing_time() {
        let table = flat_table();
        let params = params(20.0e6, 1.0e10);
        let engine = PseudoTimeEngine::new(&table, &params);

        let err = engine
            .compute(&[0.0, 1.0, 1.0], &[1.0, 1.0, 1.0], &[0.0, 1.0, 2.0])
            .unwrap_err();
        assert!(matches!(err, EurError::NonMonotonicTime { row: 2 }));
        assert!(!err.is_recoverable());
    }
}
