use super::{engine::AnalysisEngine, options::AnalysisOptions};
use crate::{
    dimensionless::WellGeometry, error::EurError, production::ProductionRecord, pvt::PvtTable,
};
use eurforge_schemas::{
    method::{DeclineMethod, MethodWeights},
    reservoir::ReservoirParameters,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Drainage radius assumed before the decline fit supplies one, m.
pub const DEFAULT_DRAINAGE_RADIUS: f64 = 1000.0;

/// A fluent builder for constructing an `AnalysisEngine`.
///
/// The PVT table is shared behind an `Arc` so that several wells can be
/// analysed against the same fluid description.
#[derive(Default)]
pub struct AnalysisBuilder {
    pvt: Option<Arc<PvtTable>>,
    params: Option<ReservoirParameters>,
    record: Option<ProductionRecord>,
    geometry: Option<WellGeometry>,
    weights: Option<MethodWeights>,
    options: AnalysisOptions,
    log_path: Option<PathBuf>,
}

impl AnalysisBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pvt(mut self, pvt: Arc<PvtTable>) -> Self {
        self.pvt = Some(pvt);
        self
    }

    pub fn with_parameters(mut self, params: ReservoirParameters) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_production(mut self, record: ProductionRecord) -> Self {
        self.record = Some(record);
        self
    }

    /// Initial drainage geometry. Without one, a 1000 m drainage radius and
    /// the skin-adjusted wellbore radius are assumed.
    pub fn with_geometry(mut self, geometry: WellGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Method weights for the comprehensive EUR. Defaults to equal weights.
    pub fn with_weights(mut self, weights: MethodWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }

    /// Configures `AnalysisEngine::run_logged` to write the derived series
    /// to the specified CSV file.
    pub fn with_series_logging_to_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Consumes the builder and returns a configured `AnalysisEngine`.
    ///
    /// # Errors
    ///
    /// `NotConfigured` when the PVT table, parameters or production record
    /// are missing, `InvalidParameter` for out-of-range parameters, and
    /// `MissingParameter` when no geometry was given and the parameters
    /// lack a wellbore radius to derive one.
    pub fn build(self) -> Result<AnalysisEngine, EurError> {
        let pvt = self.pvt.ok_or(EurError::NotConfigured("pvt"))?;
        let params = self.params.ok_or(EurError::NotConfigured("parameters"))?;
        let record = self.record.ok_or(EurError::NotConfigured("production"))?;
        validate_parameters(&params)?;

        let geometry = match self.geometry {
            Some(geometry) => geometry,
            None => {
                let r_w = params.wellbore_radius.ok_or(EurError::MissingParameter("r_w"))?;
                WellGeometry::from_skin(DEFAULT_DRAINAGE_RADIUS, r_w, params.skin)?
            }
        };

        let weights = self.weights.unwrap_or_else(|| {
            let share = 1.0 / DeclineMethod::ALL.len() as f64;
            DeclineMethod::ALL.iter().map(|&m| (m, share)).collect()
        });

        Ok(AnalysisEngine {
            pvt,
            params,
            record,
            geometry,
            weights,
            options: self.options,
            log_path: self.log_path,
        })
    }
}

/// Checks that every reservoir parameter is finite and physically valid.
pub fn validate_parameters(params: &ReservoirParameters) -> Result<(), EurError> {
    let positive = [
        ("μgi", params.mu_gi),
        ("Zi", params.z_i),
        ("pi", params.p_i),
        ("Cti", params.ct_i),
        ("G", params.gas_in_place),
        ("K", params.permeability),
        ("Ti", params.temperature),
        ("h", params.thickness),
    ];
    for (name, value) in positive {
        if !(value.is_finite() && value > 0.0) {
            return Err(EurError::InvalidParameter {
                name,
                reason: format!("must be positive and finite, got {}", value),
            });
        }
    }
    if !(params.porosity > 0.0 && params.porosity <= 1.0) {
        return Err(EurError::InvalidParameter {
            name: "Φ",
            reason: format!("must lie in (0, 1], got {}", params.porosity),
        });
    }
    if !params.skin.is_finite() {
        return Err(EurError::InvalidParameter {
            name: "skin",
            reason: "must be finite".to_string(),
        });
    }
    if let Some(r_w) = params.wellbore_radius {
        if !(r_w.is_finite() && r_w > 0.0) {
            return Err(EurError::InvalidParameter {
                name: "r_w",
                reason: format!("must be positive and finite, got {}", r_w),
            });
        }
    }
    if let Some(s_w) = params.water_saturation {
        if !(0.0..1.0).contains(&s_w) {
            return Err(EurError::InvalidParameter {
                name: "S_water",
                reason: format!("must lie in [0, 1), got {}", s_w),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::production::Observation;
    use eurforge_schemas::pvt::PvtRow;

    fn params() -> ReservoirParameters {
        ReservoirParameters {
            mu_gi: 1.8e-5,
            z_i: 1.0,
            p_i: 20.0e6,
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

    fn record() -> ProductionRecord {
        let observations = (0..3)
            .map(|k| Observation {
                time: k as f64,
                gas_rate: 1000.0,
                water_rate: 0.0,
                bottomhole_pressure: 10.0e6,
                cumulative_gas: 1000.0 * k as f64,
            })
            .collect();
        ProductionRecord::new("W1", observations).unwrap()
    }

    fn pvt() -> Arc<PvtTable> {
        Arc::new(
            PvtTable::new(vec![
                PvtRow { pressure: 0.0, viscosity: 1.8e-5, z_factor: 1.0, compressibility: 0.06 },
                PvtRow { pressure: 20.0e6, viscosity: 1.8e-5, z_factor: 1.0, compressibility: 0.06 },
            ])
            .unwrap(),
        )
    }

    #[test]
    fn missing_inputs_are_reported_by_name() {
        let err = AnalysisBuilder::new().with_parameters(params()).build().unwrap_err();
        assert!(matches!(err, EurError::NotConfigured("pvt")));

        let err = AnalysisBuilder::new()
            .with_pvt(pvt())
            .with_parameters(params())
            .build()
            .unwrap_err();
        assert!(matches!(err, EurError::NotConfigured("production")));
    }

    #[test]
    fn default_geometry_and_weights() {
        let engine = AnalysisBuilder::new()
            .with_pvt(pvt())
            .with_parameters(params())
            .with_production(record())
            .build()
            .unwrap();
        assert_eq!(engine.geometry().drainage_radius, DEFAULT_DRAINAGE_RADIUS);
        assert_eq!(engine.geometry().effective_wellbore_radius, 0.1);
        assert_eq!(engine.weights().len(), 3);
        assert!(format!("{:?}", engine).contains("W1"));
    }

    #[test]
    fn parameter_validation() {
        assert!(validate_parameters(&params()).is_ok());

        let mut bad = params();
        bad.porosity = 1.5;
        assert!(matches!(validate_parameters(&bad), Err(EurError::InvalidParameter { name: "Φ", .. })));

        let mut bad = params();
        bad.p_i = f64::NAN;
        assert!(matches!(validate_parameters(&bad), Err(EurError::InvalidParameter { name: "pi", .. })));

        let mut bad = params();
        bad.water_saturation = Some(1.0);
        assert!(matches!(validate_parameters(&bad), Err(EurError::InvalidParameter { name: "S_water", .. })));

        let mut no_radius = params();
        no_radius.wellbore_radius = None;
        let err = AnalysisBuilder::new()
            .with_pvt(pvt())
            .with_parameters(no_radius)
            .with_production(record())
            .build()
            .unwrap_err();
        assert!(matches!(err, EurError::MissingParameter("r_w")));
    }
}
