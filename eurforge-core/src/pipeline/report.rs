use crate::{
    aggregate::EurEstimate, analysis::MaterialBalanceFit, decline::DeclineFitResult,
    dimensionless::DimensionlessSeries, series::NormalizedSeries,
};
use eurforge_schemas::method::DeclineMethod;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodFailure {
    pub method: DeclineMethod,
    pub reason: String,
}

/// Everything one analysis run derives for a well.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub well: String,
    pub normalized: NormalizedSeries,
    /// Dimensionless groups on the initial geometry guess.
    pub dimensionless: DimensionlessSeries,
    /// Dimensionless groups on the drainage radius implied by the decline fit.
    pub refined: Option<DimensionlessSeries>,
    pub fetkovich: Option<DeclineFitResult>,
    pub blasingame: Option<MaterialBalanceFit>,
    pub npi: Option<MaterialBalanceFit>,
    pub eur: EurEstimate,
    pub method_failures: Vec<MethodFailure>,
}

impl AnalysisReport {
    pub fn failure(&self, method: DeclineMethod) -> Option<&str> {
        self.method_failures
            .iter()
            .find(|f| f.method == method)
            .map(|f| f.reason.as_str())
    }
}
