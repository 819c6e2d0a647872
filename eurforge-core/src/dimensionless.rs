//! Blasingame dimensionless decline groups.
//!
//! ```text
//! r_eD  = r_e / r_wa,            r_wa = r_w·e^(−s)
//! tcaDd = 0.0864·K·tca / [Φ·μgi·Cti·r_wa²·(r_eD² − 1)·½(ln r_eD − ½)]
//! qDd   = 1.842e4·q·Bgi·μg(pwf) / (K·h·ΔΨ) · (ln r_eD − ½)
//! ```

use crate::{
    constants::{DIMENSIONLESS_TIME_FACTOR, PA_PER_MPA, P_SC_MPA, RADIAL_FLOW_FACTOR, T_SC_K},
    error::EurError,
    pvt::PvtTable,
    series::{NormalizedSeries, PointFlags},
    transform,
};
use eurforge_schemas::reservoir::ReservoirParameters;
use serde::{Deserialize, Serialize};

/// Drainage geometry of a well in a bounded circular reservoir.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WellGeometry {
    pub drainage_radius: f64,
    pub effective_wellbore_radius: f64,
}

impl WellGeometry {
    /// # Errors
    ///
    /// `InvalidDomain` unless both radii are positive and `ln(r_e/r_wa) > ½`.
    pub fn new(drainage_radius: f64, effective_wellbore_radius: f64) -> Result<Self, EurError> {
        if !(effective_wellbore_radius > 0.0 && effective_wellbore_radius.is_finite()) {
            return Err(EurError::InvalidDomain(format!(
                "effective wellbore radius must be positive, got {}",
                effective_wellbore_radius
            )));
        }
        if !(drainage_radius > 0.0 && drainage_radius.is_finite()) {
            return Err(EurError::InvalidDomain(format!(
                "drainage radius must be positive, got {}",
                drainage_radius
            )));
        }
        let geometry = Self {
            drainage_radius,
            effective_wellbore_radius,
        };
        if geometry.geometric_factor() <= 0.0 {
            return Err(EurError::InvalidDomain(format!(
                "ln(r_eD) - 0.5 must be positive, got r_eD = {}",
                geometry.dimensionless_radius()
            )));
        }
        Ok(geometry)
    }

    pub fn from_skin(drainage_radius: f64, wellbore_radius: f64, skin: f64) -> Result<Self, EurError> {
        Self::new(drainage_radius, effective_wellbore_radius(wellbore_radius, skin))
    }

    pub fn dimensionless_radius(&self) -> f64 {
        self.drainage_radius / self.effective_wellbore_radius
    }

    /// `ln(r_eD) − ½`.
    pub fn geometric_factor(&self) -> f64 {
        self.dimensionless_radius().ln() - 0.5
    }
}

/// `r_wa = r_w·e^(−skin)`; negative skin enlarges the apparent wellbore.
pub fn effective_wellbore_radius(wellbore_radius: f64, skin: f64) -> f64 {
    wellbore_radius * (-skin).exp()
}

/// Initial gas formation volume factor, reservoir volume per standard volume.
pub fn gas_formation_volume_factor(params: &ReservoirParameters) -> f64 {
    params.z_i * P_SC_MPA * params.temperature / (params.p_i / PA_PER_MPA * T_SC_K)
}

pub struct DimensionlessCalculator<'a> {
    params: &'a ReservoirParameters,
    geometry: WellGeometry,
    formation_volume_factor: f64,
}

impl<'a> DimensionlessCalculator<'a> {
    pub fn new(params: &'a ReservoirParameters, geometry: WellGeometry) -> Self {
        Self {
            params,
            geometry,
            formation_volume_factor: gas_formation_volume_factor(params),
        }
    }

    pub fn geometry(&self) -> WellGeometry {
        self.geometry
    }

    pub fn time(&self, tca: f64) -> f64 {
        let p = self.params;
        let r_ed = self.geometry.dimensionless_radius();
        let r_wa = self.geometry.effective_wellbore_radius;
        let denominator = p.porosity * p.mu_gi * p.ct_i * r_wa * r_wa
            * (r_ed * r_ed - 1.0)
            * 0.5
            * self.geometry.geometric_factor();
        DIMENSIONLESS_TIME_FACTOR * p.permeability * tca / denominator
    }

    /// # Errors
    ///
    /// `DivisionSingularity` for a zero or non-finite drawdown.
    pub fn rate(&self, rate: f64, viscosity_at_pwf: f64, drawdown: f64, p_wf: f64) -> Result<f64, EurError> {
        if drawdown == 0.0 || !drawdown.is_finite() {
            return Err(EurError::DivisionSingularity { p_wf });
        }
        let q_d = RADIAL_FLOW_FACTOR * rate * self.formation_volume_factor * viscosity_at_pwf
            / (self.params.permeability * self.params.thickness * drawdown);
        Ok(q_d * self.geometry.geometric_factor())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionlessSeries {
    pub well: String,
    pub geometry: WellGeometry,
    pub tcadd: Vec<f64>,
    pub qdd: Vec<f64>,
    /// Running integral of `qDd` over `tcaDd`.
    pub qddj: Vec<f64>,
    /// Negative log-derivative of `qDdj`.
    pub qddjd: Vec<f64>,
    /// Dimensionless cumulative production, `∫ qDd dtcaDd`.
    pub npdd: Vec<f64>,
    pub flags: Vec<PointFlags>,
}

impl DimensionlessSeries {
    pub fn len(&self) -> usize {
        self.tcadd.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tcadd.is_empty()
    }
}

/// Converts a normalized series into dimensionless groups for `geometry`.
///
/// `bottomhole_pressure` must be parallel to the series. Points that are
/// invalid in the normalized series stay invalid here.
pub fn dimensionless_series(
    normalized: &NormalizedSeries,
    bottomhole_pressure: &[f64],
    pvt: &PvtTable,
    params: &ReservoirParameters,
    geometry: WellGeometry,
) -> Result<DimensionlessSeries, EurError> {
    let n = normalized.len();
    if bottomhole_pressure.len() != n {
        return Err(EurError::LengthMismatch(n, bottomhole_pressure.len()));
    }

    let calculator = DimensionlessCalculator::new(params, geometry);
    let mut flags = normalized.flags.clone();
    let mut tcadd = vec![f64::NAN; n];
    let mut qdd = vec![f64::NAN; n];

    for i in 0..n {
        if !normalized.is_valid(i) {
            continue;
        }
        let p_wf = bottomhole_pressure[i];
        let lookup = pvt.lookup(p_wf);
        flags[i].pvt_extrapolated |= lookup.extrapolated;
        match calculator.rate(normalized.gas_rate[i], lookup.properties.viscosity, normalized.drawdown[i], p_wf) {
            Ok(value) => {
                tcadd[i] = calculator.time(normalized.tca[i]);
                qdd[i] = value;
            }
            Err(EurError::DivisionSingularity { .. }) => flags[i].division_singularity = true,
            Err(err) => return Err(err),
        }
    }

    let valid: Vec<bool> = (0..n)
        .map(|i| flags[i].is_valid() && tcadd[i].is_finite() && qdd[i].is_finite())
        .collect();
    let transformed = transform::integral_derivative_masked(&tcadd, &qdd, &valid)?;

    let kept: Vec<usize> = (0..n).filter(|&i| valid[i]).collect();
    let area = transform::cumulative_trapezoid(
        &kept.iter().map(|&i| tcadd[i]).collect::<Vec<_>>(),
        &kept.iter().map(|&i| qdd[i]).collect::<Vec<_>>(),
    )?;
    let mut npdd = vec![f64::NAN; n];
    for (k, &i) in kept.iter().enumerate() {
        npdd[i] = area[k];
    }

    Ok(DimensionlessSeries {
        well: normalized.well.clone(),
        geometry,
        tcadd,
        qdd,
        qddj: transformed.integral,
        qddjd: transformed.derivative,
        npdd,
        flags,
    })
}
