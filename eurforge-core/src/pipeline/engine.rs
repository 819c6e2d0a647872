use super::{
    options::AnalysisOptions,
    report::{AnalysisReport, MethodFailure},
};
use crate::{
    aggregate::EurEstimate,
    analysis::{self, MaterialBalanceFit},
    decline::{
        fitter::DeclineFitter,
        properties::derive_reservoir_properties,
        DeclineFitResult,
    },
    dimensionless::{dimensionless_series, DimensionlessSeries, WellGeometry},
    error::EurError,
    logger::SeriesLogger,
    normalization::PseudopressureEngine,
    production::ProductionRecord,
    pvt::PvtTable,
    series::{normalize_record, NormalizedSeries},
};
use eurforge_schemas::{
    method::{DeclineMethod, MethodWeights},
    reservoir::ReservoirParameters,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, info_span, warn};

#[derive(Debug)]
pub struct AnalysisEngine {
    pub(super) pvt: Arc<PvtTable>,
    pub(super) params: ReservoirParameters,
    pub(super) record: ProductionRecord,
    pub(super) geometry: WellGeometry,
    pub(super) weights: MethodWeights,
    pub(super) options: AnalysisOptions,
    pub(super) log_path: Option<PathBuf>,
}

impl AnalysisEngine {
    pub fn well(&self) -> &str {
        self.record.well()
    }

    pub fn geometry(&self) -> WellGeometry {
        self.geometry
    }

    pub fn weights(&self) -> &MethodWeights {
        &self.weights
    }

    /// Runs every stage for the well. Holds no state between calls, so
    /// repeated runs give identical reports.
    ///
    /// # Errors
    ///
    /// Only structural failures abort the run. A method that cannot produce
    /// an estimate is listed in `method_failures` instead.
    pub fn run(&self) -> Result<AnalysisReport, EurError> {
        let _span = info_span!("analysis", well = %self.well()).entered();

        let normalized = normalize_record(&self.record, &self.pvt, &self.params, &self.options.normalization)?;
        let bottomhole_pressure = self.record.bottomhole_pressures();
        let dimensionless = dimensionless_series(
            &normalized,
            &bottomhole_pressure,
            &self.pvt,
            &self.params,
            self.geometry,
        )?;

        let mut failures = Vec::new();
        let mut per_method = BTreeMap::new();

        let fetkovich = recover(DeclineMethod::Fetkovich, self.fit_fetkovich(), &mut failures)?;
        if let Some(fit) = &fetkovich {
            let eur = fit.parameters.estimated_ultimate_recovery(&self.options.eur_limits);
            per_method.insert(DeclineMethod::Fetkovich, eur);
        }

        let refined = match &fetkovich {
            Some(fit) if self.options.refine_geometry => self.refine(&normalized, &bottomhole_pressure, fit)?,
            _ => None,
        };

        let blasingame = recover(
            DeclineMethod::Blasingame,
            analysis::blasingame_gas_in_place(&normalized, self.params.ct_i, self.options.late_time_fraction),
            &mut failures,
        )?;
        let npi = recover(
            DeclineMethod::Npi,
            analysis::npi_gas_in_place(&normalized, self.params.ct_i, self.options.late_time_fraction),
            &mut failures,
        )?;
        for fit in blasingame.iter().chain(npi.iter()) {
            if let Some(eur) = recover(fit.method, self.recoverable(fit), &mut failures)? {
                per_method.insert(fit.method, eur);
            }
        }

        let eur = EurEstimate::new(per_method, self.weights.clone());
        info!(
            comprehensive = eur.comprehensive,
            methods = eur.per_method.len(),
            failures = failures.len(),
            "analysis complete"
        );

        Ok(AnalysisReport {
            well: self.well().to_string(),
            normalized,
            dimensionless,
            refined,
            fetkovich,
            blasingame,
            npi,
            eur,
            method_failures: failures,
        })
    }

    /// `run`, then writes the derived series if a log file was configured.
    pub fn run_logged(&self) -> Result<AnalysisReport, EurError> {
        let report = self.run()?;
        if let Some(path) = &self.log_path {
            SeriesLogger::new(path)?.log_report(&report)?;
        }
        Ok(report)
    }

    fn fit_fetkovich(&self) -> Result<DeclineFitResult, EurError> {
        let time = self.record.times();
        let rate = self.record.gas_rates();
        let fitter = DeclineFitter::new(self.options.fit);
        let seeds = if self.options.seeds.is_empty() {
            vec![DeclineFitter::default_seed(&rate)]
        } else {
            self.options.seeds.clone()
        };

        let mut last_error = None;
        let mut outcome = None;
        for seed in seeds {
            match fitter.fit(&time, &rate, seed) {
                Ok(fit) => {
                    outcome = Some(fit);
                    break;
                }
                Err(err) if err.is_recoverable() => {
                    warn!(?seed, error = %err, "decline fit failed from this seed");
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        let outcome = match (outcome, last_error) {
            (Some(outcome), _) => outcome,
            (None, Some(err)) => return Err(err),
            (None, None) => return Err(EurError::FitDidNotConverge("no seeds were tried".to_string())),
        };

        let flowing_pressure = self
            .options
            .flowing_pressure
            .unwrap_or_else(|| self.record.mean_bottomhole_pressure());
        let pseudopressure = PseudopressureEngine::with_quadrature_points(
            &self.pvt,
            &self.params,
            self.options.normalization.quadrature_points,
        )?;
        let reservoir = derive_reservoir_properties(&outcome.parameters, &self.params, &pseudopressure, flowing_pressure)?;

        Ok(DeclineFitResult {
            parameters: outcome.parameters,
            relative_rmse: outcome.relative_rmse,
            iterations: outcome.iterations,
            points: outcome.points,
            flowing_pressure,
            reservoir,
        })
    }

    fn refine(
        &self,
        normalized: &NormalizedSeries,
        bottomhole_pressure: &[f64],
        fit: &DeclineFitResult,
    ) -> Result<Option<DimensionlessSeries>, EurError> {
        let reservoir = &fit.reservoir;
        let geometry = WellGeometry::new(
            reservoir.drainage_radius,
            reservoir.drainage_radius / reservoir.dimensionless_radius,
        );
        let refined = geometry.and_then(|geometry| {
            dimensionless_series(normalized, bottomhole_pressure, &self.pvt, &self.params, geometry)
        });
        match refined {
            Ok(series) => Ok(Some(series)),
            Err(err) if err.is_recoverable() => {
                warn!(error = %err, "refined dimensionless series unavailable");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn recoverable(&self, fit: &MaterialBalanceFit) -> Result<f64, EurError> {
        analysis::recoverable_from_gas_in_place(
            fit.gas_in_place,
            &self.pvt,
            &self.params,
            self.options.abandonment_pressure,
        )
    }
}

/// Records a recoverable per-method failure and passes structural ones on.
fn recover<T>(
    method: DeclineMethod,
    result: Result<T, EurError>,
    failures: &mut Vec<MethodFailure>,
) -> Result<Option<T>, EurError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_recoverable() => {
            warn!(%method, error = %err, "method unavailable");
            failures.push(MethodFailure {
                method,
                reason: err.to_string(),
            });
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
