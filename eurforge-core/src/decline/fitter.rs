//! Bounded least-squares fit of the Arps decline.
//!
//! The box `qi ∈ (0, 2·max q]`, `di ∈ (0.001, 1]`, `b ∈ (0.001, 0.999]` is
//! mapped onto an unconstrained space with a logistic transform and the
//! relative squared residual is minimized with Nelder–Mead. The simplex is
//! rebuilt around the best point and the search restarted until the cost
//! stops improving.

use super::arps::ArpsParameters;
use crate::error::EurError;
use argmin::core::{CostFunction, Error, Executor, State, TerminationReason, TerminationStatus};
use argmin::solver::neldermead::NelderMead;
use argmin_math::{ArgminAdd, ArgminL2Norm, ArgminSub};
use serde::{Deserialize, Serialize};
use tracing::debug;

const MIN_FIT_POINTS: usize = 3;
const RATE_UPPER_FACTOR: f64 = 2.0;
const DECLINE_BOUNDS: (f64, f64) = (0.001, 1.0);
const EXPONENT_BOUNDS: (f64, f64) = (0.001, 0.999);
/// Keeps encoded seeds off the asymptotes of the logistic map.
const LOGIT_CLAMP: f64 = 1.0e-9;
/// Relative cost improvement below which a restart is considered settled.
const RESTART_IMPROVEMENT: f64 = 1.0e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    pub max_iterations: u64,
    /// Nelder–Mead stops when the standard deviation of the simplex costs
    /// drops below this.
    pub sd_tolerance: f64,
    pub restarts: usize,
    /// Edge length of the initial simplex in transformed coordinates.
    pub simplex_step: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 5_000,
            sd_tolerance: 1.0e-14,
            restarts: 4,
            simplex_step: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitOutcome {
    pub parameters: ArpsParameters,
    pub relative_rmse: f64,
    pub iterations: u64,
    pub points: usize,
}

/// Maps the parameter box onto R³ and back.
#[derive(Debug, Clone, Copy)]
struct ParameterBox {
    lower: [f64; 3],
    upper: [f64; 3],
}

impl ParameterBox {
    fn for_peak_rate(peak_rate: f64) -> Self {
        Self {
            lower: [0.0, DECLINE_BOUNDS.0, EXPONENT_BOUNDS.0],
            upper: [RATE_UPPER_FACTOR * peak_rate, DECLINE_BOUNDS.1, EXPONENT_BOUNDS.1],
        }
    }

    fn decode(&self, theta: &[f64]) -> ArpsParameters {
        let value = |k: usize| self.lower[k] + (self.upper[k] - self.lower[k]) * logistic(theta[k]);
        ArpsParameters::new(value(0), value(1), value(2))
    }

    fn encode(&self, params: &ArpsParameters) -> Vec<f64> {
        [params.initial_rate, params.initial_decline, params.exponent]
            .iter()
            .enumerate()
            .map(|(k, &x)| {
                let u = ((x - self.lower[k]) / (self.upper[k] - self.lower[k]))
                    .clamp(LOGIT_CLAMP, 1.0 - LOGIT_CLAMP);
                (u / (1.0 - u)).ln()
            })
            .collect()
    }
}

fn logistic(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

struct ArpsLeastSquares<'a> {
    time: &'a [f64],
    rate: &'a [f64],
    scale: f64,
    bounds: ParameterBox,
}

impl CostFunction for ArpsLeastSquares<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let model = self.bounds.decode(theta);
        let sum: f64 = self
            .time
            .iter()
            .zip(self.rate)
            .map(|(&t, &q)| {
                let residual = (model.rate(t) - q) / self.scale;
                residual * residual
            })
            .sum();
        Ok(sum / self.time.len() as f64)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeclineFitter {
    options: FitOptions,
}

impl DeclineFitter {
    pub fn new(options: FitOptions) -> Self {
        Self { options }
    }

    /// The conventional starting point: peak rate, 10 %/day decline, `b = ½`.
    pub fn default_seed(rate: &[f64]) -> ArpsParameters {
        let peak = rate.iter().copied().filter(|q| q.is_finite()).fold(0.0, f64::max);
        ArpsParameters::new(peak, 0.1, 0.5)
    }

    /// Fits `q(t)` to the observations with a positive rate.
    ///
    /// # Errors
    ///
    /// `InvalidDomain` for mismatched inputs or fewer than three usable
    /// points; `FitDidNotConverge` when no run of the solver converges to a
    /// finite cost.
    pub fn fit(&self, time: &[f64], rate: &[f64], seed: ArpsParameters) -> Result<FitOutcome, EurError> {
        if time.len() != rate.len() {
            return Err(EurError::LengthMismatch(time.len(), rate.len()));
        }
        let (t, q): (Vec<f64>, Vec<f64>) = time
            .iter()
            .zip(rate)
            .filter(|&(&t, &q)| t.is_finite() && t >= 0.0 && q.is_finite() && q > 0.0)
            .map(|(&t, &q)| (t, q))
            .unzip();
        if t.len() < MIN_FIT_POINTS {
            return Err(EurError::InvalidDomain(format!(
                "decline fit needs at least {} positive-rate observations, got {}",
                MIN_FIT_POINTS,
                t.len()
            )));
        }

        let peak = q.iter().copied().fold(0.0, f64::max);
        let bounds = ParameterBox::for_peak_rate(peak);
        let mut start = bounds.encode(&seed);
        let mut best: Option<(Vec<f64>, f64)> = None;
        let mut converged = false;
        let mut iterations = 0;

        for attempt in 0..=self.options.restarts {
            let problem = ArpsLeastSquares {
                time: &t,
                rate: &q,
                scale: peak,
                bounds,
            };
            let solver = NelderMead::new(self.simplex_around(&start))
                .with_sd_tolerance(self.options.sd_tolerance)?;
            let result = Executor::new(problem, solver)
                .configure(|state| state.max_iters(self.options.max_iterations))
                .run()?;

            let state = result.state();
            iterations += state.get_iter();
            let run_converged = matches!(
                state.get_termination_status(),
                TerminationStatus::Terminated(TerminationReason::SolverConverged)
            );
            let Some(param) = state.get_best_param().cloned() else {
                continue;
            };
            let cost = state.get_best_cost();

            let previous_cost = best.as_ref().map_or(f64::INFINITY, |(_, c)| *c);
            if cost.is_finite() && cost <= previous_cost {
                debug!(
                    attempt,
                    cost,
                    shift = param.sub(&start).l2_norm(),
                    "decline fit improved"
                );
                best = Some((param.clone(), cost));
            }
            converged |= run_converged;

            let settled = previous_cost.is_finite() && previous_cost - cost <= RESTART_IMPROVEMENT * previous_cost;
            if run_converged && settled {
                break;
            }
            if let Some((param, _)) = &best {
                start = param.clone();
            }
        }

        match best {
            Some((theta, cost)) if converged && cost.is_finite() => Ok(FitOutcome {
                parameters: bounds.decode(&theta),
                relative_rmse: cost.sqrt(),
                iterations,
                points: t.len(),
            }),
            Some((_, cost)) => Err(EurError::FitDidNotConverge(format!(
                "Nelder-Mead did not converge after {} iterations (best cost {:.3e})",
                iterations, cost
            ))),
            None => Err(EurError::FitDidNotConverge(
                "no finite cost was reached".to_string(),
            )),
        }
    }

    fn simplex_around(&self, center: &[f64]) -> Vec<Vec<f64>> {
        let center = center.to_vec();
        let mut simplex = vec![center.clone()];
        for k in 0..center.len() {
            let mut offset = vec![0.0; center.len()];
            offset[k] = self.options.simplex_step;
            simplex.push(center.add(&offset));
        }
        simplex
    }
}
