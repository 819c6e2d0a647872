//! Normalized gas pseudopressure and the pressure-normalized rate.
//!
//! The normalized pseudopressure carries pressure units:
//!
//! ```text
//! Ψ(p) = (μgi·Zi / pi) · ∫₀ᵖ 2p' / (μg(p')·Z(p')) dp'
//! ```
//!
//! so that for an ideal gas with constant viscosity `Ψ(p) = p² / pi`.

use crate::{
    constants::{DEFAULT_QUADRATURE_POINTS, MIN_QUADRATURE_POINTS},
    error::EurError,
    pvt::PvtTable,
};
use eurforge_schemas::reservoir::ReservoirParameters;
use tracing::debug;

pub struct PseudopressureEngine<'a> {
    pvt: &'a PvtTable,
    scale: f64,
    points: usize,
    initial: f64,
}

impl<'a> PseudopressureEngine<'a> {
    pub fn new(pvt: &'a PvtTable, params: &ReservoirParameters) -> Result<Self, EurError> {
        Self::with_quadrature_points(pvt, params, DEFAULT_QUADRATURE_POINTS)
    }

    /// Creates an engine whose quadrature uses `points` samples over `[0, p]`.
    ///
    /// # Errors
    ///
    /// `InvalidDomain` if `points` is below the minimum resolution or the
    /// initial pressure is not a valid pressure.
    pub fn with_quadrature_points(
        pvt: &'a PvtTable,
        params: &ReservoirParameters,
        points: usize,
    ) -> Result<Self, EurError> {
        if points < MIN_QUADRATURE_POINTS {
            return Err(EurError::InvalidDomain(format!(
                "pseudopressure quadrature needs at least {} points, got {}",
                MIN_QUADRATURE_POINTS, points
            )));
        }
        if pvt.pressure_range().0 > 0.0 {
            debug!(
                p_min = pvt.pressure_range().0,
                "PVT table starts above zero; pseudopressure tail uses the first segment"
            );
        }
        let mut engine = Self {
            pvt,
            scale: params.mu_gi * params.z_i / params.p_i,
            points,
            initial: 0.0,
        };
        engine.initial = engine.normalized_pseudopressure(params.p_i)?;
        Ok(engine)
    }

    /// `Ψ(pi)`, computed once when the engine is created.
    pub fn initial_pseudopressure(&self) -> f64 {
        self.initial
    }

    pub fn normalized_pseudopressure(&self, pressure: f64) -> Result<f64, EurError> {
        if !pressure.is_finite() || pressure < 0.0 {
            return Err(EurError::InvalidDomain(format!(
                "pseudopressure is undefined for p = {}",
                pressure
            )));
        }
        if pressure == 0.0 {
            return Ok(0.0);
        }

        let step = pressure / (self.points - 1) as f64;
        let integrand = |p: f64| {
            let properties = self.pvt.lookup(p).properties;
            2.0 * p / (properties.viscosity * properties.z_factor)
        };

        let mut sum = 0.5 * (integrand(0.0) + integrand(pressure));
        for k in 1..self.points - 1 {
            sum += integrand(step * k as f64);
        }
        Ok(self.scale * sum * step)
    }

    /// `Ψ(pi) − Ψ(pwf)`.
    ///
    /// # Errors
    ///
    /// `DivisionSingularity` when the drawdown is zero or not finite.
    pub fn drawdown(&self, p_wf: f64) -> Result<f64, EurError> {
        let drawdown = self.initial - self.normalized_pseudopressure(p_wf)?;
        if drawdown == 0.0 || !drawdown.is_finite() {
            return Err(EurError::DivisionSingularity { p_wf });
        }
        Ok(drawdown)
    }

    pub fn pressure_normalized_rate(&self, rate: f64, p_wf: f64) -> Result<f64, EurError> {
        Ok(rate / self.drawdown(p_wf)?)
    }

    /// Whether `p` lies outside the sampled table. The low-pressure tail
    /// below the first row is always covered by extending the first segment.
    pub fn extrapolates(&self, pressure: f64) -> bool {
        !self.pvt.contains(pressure)
    }
}
