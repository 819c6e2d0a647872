//! Reservoir properties implied by a fitted Arps decline.
//!
//! The fitted `qi/di` is the cumulative a boundary-dominated well would
//! produce from a closed drainage volume. Which material-balance form
//! relates that volume to the drawdown depends on the initial pressure:
//! above 25 MPa gas behaves like a slightly compressible liquid, below
//! 13 MPa `μg·Z` is nearly constant and `p²` forms apply, and in between
//! the real-gas pseudopressure is used.

use super::arps::ArpsParameters;
use crate::{
    constants::{
        HIGH_PRESSURE_THRESHOLD_MPA, LOW_PRESSURE_THRESHOLD_MPA, PA_PER_MPA, P_SC_MPA,
        RADIAL_FLOW_FACTOR, T_SC_K,
    },
    dimensionless::{effective_wellbore_radius, gas_formation_volume_factor},
    error::EurError,
    normalization::PseudopressureEngine,
};
use eurforge_schemas::reservoir::ReservoirParameters;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

/// Pressure-squared forms carry twice the radial-flow constant.
const PRESSURE_SQUARED_FLOW_FACTOR: f64 = 2.0 * RADIAL_FLOW_FACTOR;
/// Pore volume is reported in 10⁴ m³.
const PORE_VOLUME_SCALE: f64 = 1.0e4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureRegime {
    High,
    Intermediate,
    Low,
}

impl PressureRegime {
    pub fn classify(p_i_mpa: f64) -> Self {
        if p_i_mpa > HIGH_PRESSURE_THRESHOLD_MPA {
            PressureRegime::High
        } else if p_i_mpa < LOW_PRESSURE_THRESHOLD_MPA {
            PressureRegime::Low
        } else {
            PressureRegime::Intermediate
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReservoirEstimate {
    pub regime: PressureRegime,
    /// Initial gas formation volume factor.
    pub formation_volume_factor: f64,
    pub pore_volume: f64,
    pub drainage_radius: f64,
    pub dimensionless_radius: f64,
    pub permeability: f64,
    pub gas_in_place: f64,
}

/// Derives pore volume, drainage radius, permeability and gas-in-place from
/// a fitted decline at the representative flowing pressure `p_wf` (Pa).
///
/// # Errors
///
/// `MissingParameter` without a wellbore radius or water saturation;
/// `DivisionSingularity` when the drawdown is not positive; `InvalidDomain`
/// when the implied drainage radius leaves `ln(r_eD) − ½` non-positive.
pub fn derive_reservoir_properties(
    arps: &ArpsParameters,
    params: &ReservoirParameters,
    pseudopressure: &PseudopressureEngine,
    p_wf: f64,
) -> Result<ReservoirEstimate, EurError> {
    let wellbore_radius = params.wellbore_radius.ok_or(EurError::MissingParameter("r_w"))?;
    let water_saturation = params
        .water_saturation
        .ok_or(EurError::MissingParameter("S_water"))?;

    let p_i = params.p_i / PA_PER_MPA;
    let p_wf_mpa = p_wf / PA_PER_MPA;
    let regime = PressureRegime::classify(p_i);
    let bgi = gas_formation_volume_factor(params);
    let q_over_d = arps.initial_rate / arps.initial_decline;

    let (p, ct) = (params, params.ct_i);
    let (pore_volume, permeability_per_factor) = match regime {
        PressureRegime::High => {
            let drawdown = positive_drawdown(p_i - p_wf_mpa, p_wf)?;
            (
                bgi * q_over_d / (ct * drawdown),
                RADIAL_FLOW_FACTOR * arps.initial_rate * bgi * p.mu_gi / (p.thickness * drawdown),
            )
        }
        PressureRegime::Low => {
            let drawdown = positive_drawdown(p_i * p_i - p_wf_mpa * p_wf_mpa, p_wf)?;
            (
                2.0 * P_SC_MPA * p.z_i * p.temperature * q_over_d / (ct * T_SC_K * drawdown),
                PRESSURE_SQUARED_FLOW_FACTOR * arps.initial_rate * P_SC_MPA * p.temperature * p.mu_gi * p.z_i
                    / (p.thickness * T_SC_K * drawdown),
            )
        }
        PressureRegime::Intermediate => {
            let normalized = pseudopressure.drawdown(p_wf)? / PA_PER_MPA;
            let drawdown = positive_drawdown(normalized * p_i / (p.mu_gi * p.z_i), p_wf)?;
            (
                2.0 * P_SC_MPA * p.temperature * q_over_d / (ct * T_SC_K * p.mu_gi * drawdown),
                PRESSURE_SQUARED_FLOW_FACTOR * arps.initial_rate * P_SC_MPA * p.temperature
                    / (p.thickness * T_SC_K * drawdown),
            )
        }
    };

    let drainage_radius = (pore_volume * PORE_VOLUME_SCALE / (PI * p.thickness * p.porosity)).sqrt();
    let r_wa = effective_wellbore_radius(wellbore_radius, p.skin);
    let dimensionless_radius = drainage_radius / r_wa;
    let geometric_factor = dimensionless_radius.ln() - 0.5;
    if !(geometric_factor > 0.0 && geometric_factor.is_finite()) {
        return Err(EurError::InvalidDomain(format!(
            "implied drainage radius {:.4e} gives r_eD = {:.4e}; ln(r_eD) - 0.5 must be positive",
            drainage_radius, dimensionless_radius
        )));
    }

    let estimate = ReservoirEstimate {
        regime,
        formation_volume_factor: bgi,
        pore_volume,
        drainage_radius,
        dimensionless_radius,
        permeability: permeability_per_factor * geometric_factor,
        gas_in_place: pore_volume * (1.0 - water_saturation) / (PORE_VOLUME_SCALE * bgi),
    };
    debug!(?regime, r_e = drainage_radius, k = estimate.permeability, g = estimate.gas_in_place, "reservoir estimate");
    Ok(estimate)
}

fn positive_drawdown(drawdown: f64, p_wf: f64) -> Result<f64, EurError> {
    if drawdown > 0.0 && drawdown.is_finite() {
        Ok(drawdown)
    } else {
        Err(EurError::DivisionSingularity { p_wf })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pvt::PvtTable;
    use approx::assert_relative_eq;
    use eurforge_schemas::pvt::PvtRow;

    fn pvt() -> PvtTable {
        PvtTable::new(vec![
            PvtRow { pressure: 0.0, viscosity: 1.8e-5, z_factor: 1.0, compressibility: 0.06 },
            PvtRow { pressure: 40.0e6, viscosity: 1.8e-5, z_factor: 1.0, compressibility: 0.06 },
        ])
        .unwrap()
    }

    fn params(p_i: f64) -> ReservoirParameters {
        ReservoirParameters {
            mu_gi: 1.8e-5,
            z_i: 1.0,
            p_i,
            ct_i: 0.06,
            gas_in_place: 1.0e10,
            permeability: 1.0,
            porosity: 0.1,
            temperature: 350.0,
            thickness: 10.0,
            skin: 0.0,
            wellbore_radius: Some(0.1),
            water_saturation: Some(0.3),
        }
    }

    #[test]
    fn regimes_split_at_thirteen_and_twenty_five_megapascal() {
        assert_eq!(PressureRegime::classify(30.0), PressureRegime::High);
        assert_eq!(PressureRegime::classify(25.0), PressureRegime::Intermediate);
        assert_eq!(PressureRegime::classify(13.0), PressureRegime::Intermediate);
        assert_eq!(PressureRegime::classify(12.9), PressureRegime::Low);
    }

    #[test]
    fn high_pressure_estimate_follows_the_liquid_form() {
        let pvt = pvt();
        let params = params(30.0e6);
        let engine = PseudopressureEngine::new(&pvt, &params).unwrap();
        let arps = ArpsParameters::new(1.0e5, 0.01, 0.5);

        let estimate = derive_reservoir_properties(&arps, &params, &engine, 20.0e6).unwrap();
        let bgi = 0.101325 * 350.0 / (30.0 * 293.15);
        let vp = bgi * 1.0e7 / (0.06 * 10.0);
        assert_eq!(estimate.regime, PressureRegime::High);
        assert_relative_eq!(estimate.pore_volume, vp, max_relative = 1e-12);
        assert_relative_eq!(estimate.gas_in_place, 1.0e-4 * vp * 0.7 / bgi, max_relative = 1e-12);
        let r_e = (vp * 1.0e4 / (PI * 10.0 * 0.1)).sqrt();
        assert_relative_eq!(estimate.drainage_radius, r_e, max_relative = 1e-12);
        assert_relative_eq!(estimate.dimensionless_radius, r_e / 0.1, max_relative = 1e-12);
        assert!(estimate.permeability > 0.0);
    }

    #[test]
    fn ideal_gas_intermediate_and_low_forms_agree() {
        // With μg·Z constant the pseudopressure drawdown equals the p² form.
        let pvt = pvt();
        let arps = ArpsParameters::new(1.0e5, 0.01, 0.5);

        let intermediate = params(20.0e6);
        let engine = PseudopressureEngine::new(&pvt, &intermediate).unwrap();
        let mid = derive_reservoir_properties(&arps, &intermediate, &engine, 10.0e6).unwrap();
        assert_eq!(mid.regime, PressureRegime::Intermediate);

        let low_pressure = 2.0 * 0.101325 * 350.0 * 1.0e7 / (0.06 * 293.15 * (400.0 - 100.0));
        assert_relative_eq!(mid.pore_volume, low_pressure, max_relative = 1e-3);
    }

    #[test]
    fn missing_inputs_and_non_positive_drawdown_are_reported() {
        let pvt = pvt();
        let arps = ArpsParameters::new(1.0e5, 0.01, 0.5);

        let mut no_radius = params(10.0e6);
        no_radius.wellbore_radius = None;
        let engine = PseudopressureEngine::new(&pvt, &no_radius).unwrap();
        assert!(matches!(
            derive_reservoir_properties(&arps, &no_radius, &engine, 5.0e6),
            Err(EurError::MissingParameter("r_w"))
        ));

        let low = params(10.0e6);
        let engine = PseudopressureEngine::new(&pvt, &low).unwrap();
        assert_eq!(PressureRegime::classify(10.0), PressureRegime::Low);
        assert!(matches!(
            derive_reservoir_properties(&arps, &low, &engine, 12.0e6),
            Err(EurError::DivisionSingularity { .. })
        ));
    }
}
