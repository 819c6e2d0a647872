use crate::error::EurError;
use eurforge_schemas::method::{DeclineMethod, MethodWeights};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

const WEIGHT_SUM_TOLERANCE: f64 = 1.0e-6;

/// Per-method EUR estimates and their weighted combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EurEstimate {
    pub per_method: BTreeMap<DeclineMethod, f64>,
    pub weights: MethodWeights,
    pub comprehensive: f64,
    /// Methods that produced an estimate but had no weight; counted as zero.
    pub missing_weights: Vec<DeclineMethod>,
}

impl EurEstimate {
    /// `Σ EUR_m · w_m` over the methods that produced a finite estimate.
    ///
    /// A missing weight is logged as [`EurError::MissingWeight`] and treated
    /// as zero. Weights that do not sum to one are logged, not rescaled.
    pub fn new(per_method: BTreeMap<DeclineMethod, f64>, weights: MethodWeights) -> Self {
        let weight_sum: f64 = weights.values().sum();
        if (weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            warn!(sum = weight_sum, "method weights do not sum to 1");
        }

        let mut comprehensive = 0.0;
        let mut missing_weights = Vec::new();
        for (&method, &eur) in &per_method {
            if !eur.is_finite() {
                warn!(%method, eur, "non-finite EUR left out of the comprehensive estimate");
                continue;
            }
            match weights.get(&method) {
                Some(&weight) => comprehensive += eur * weight,
                None => {
                    warn!(error = %EurError::MissingWeight(method), "weight treated as zero");
                    missing_weights.push(method);
                }
            }
        }

        Self {
            per_method,
            weights,
            comprehensive,
            missing_weights,
        }
    }

    /// Re-aggregates the same per-method estimates under different weights.
    pub fn with_weights(&self, weights: MethodWeights) -> Self {
        Self::new(self.per_method.clone(), weights)
    }

    pub fn get(&self, method: DeclineMethod) -> Option<f64> {
        self.per_method.get(&method).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn estimates() -> BTreeMap<DeclineMethod, f64> {
        BTreeMap::from([
            (DeclineMethod::Blasingame, 1.0e9),
            (DeclineMethod::Fetkovich, 2.0e9),
            (DeclineMethod::Npi, 3.0e9),
        ])
    }

    fn weights() -> MethodWeights {
        BTreeMap::from([
            (DeclineMethod::Blasingame, 0.5),
            (DeclineMethod::Fetkovich, 0.3),
            (DeclineMethod::Npi, 0.2),
        ])
    }

    #[test]
    fn weighted_sum_of_method_estimates() {
        let estimate = EurEstimate::new(estimates(), weights());
        assert_relative_eq!(estimate.comprehensive, 1.7e9, max_relative = 1e-12);
        assert!(estimate.missing_weights.is_empty());
        assert_eq!(estimate.get(DeclineMethod::Npi), Some(3.0e9));
    }

    #[test]
    fn missing_weight_counts_as_zero() {
        let mut weights = weights();
        weights.remove(&DeclineMethod::Npi);
        let estimate = EurEstimate::new(estimates(), weights);
        assert_relative_eq!(estimate.comprehensive, 1.1e9, max_relative = 1e-12);
        assert_eq!(estimate.missing_weights, vec![DeclineMethod::Npi]);
    }

    #[test]
    fn non_finite_estimates_are_skipped() {
        let mut per_method = estimates();
        per_method.insert(DeclineMethod::Fetkovich, f64::INFINITY);
        let estimate = EurEstimate::new(per_method, weights());
        assert_relative_eq!(estimate.comprehensive, 1.1e9, max_relative = 1e-12);
    }

    #[test]
    fn reweighting_keeps_the_estimates() {
        let estimate = EurEstimate::new(estimates(), weights());
        let equal = estimate.with_weights(DeclineMethod::ALL.iter().map(|&m| (m, 1.0 / 3.0)).collect());
        assert_relative_eq!(equal.comprehensive, 2.0e9, max_relative = 1e-12);
        assert_eq!(equal.per_method, estimate.per_method);
    }
}
