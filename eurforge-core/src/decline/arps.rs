use serde::{Deserialize, Serialize};

/// Below this exponent the hyperbolic forms are replaced by their
/// exponential limits.
const EXPONENTIAL_LIMIT: f64 = 1.0e-8;
const HARMONIC_TOLERANCE: f64 = 1.0e-8;

/// Arps decline `q(t) = qi / (1 + b·di·t)^(1/b)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArpsParameters {
    pub initial_rate: f64,
    pub initial_decline: f64,
    pub exponent: f64,
}

/// Where a production forecast stops.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EurLimits {
    /// Economic-limit gas rate; zero integrates the decline to exhaustion.
    pub economic_rate: f64,
    /// Optional cap on the forecast, days from first production.
    pub forecast_horizon: Option<f64>,
}

impl Default for EurLimits {
    fn default() -> Self {
        Self {
            economic_rate: 0.0,
            forecast_horizon: None,
        }
    }
}

impl ArpsParameters {
    pub fn new(initial_rate: f64, initial_decline: f64, exponent: f64) -> Self {
        Self {
            initial_rate,
            initial_decline,
            exponent,
        }
    }

    pub fn rate(&self, t: f64) -> f64 {
        let (qi, d, b) = (self.initial_rate, self.initial_decline, self.exponent);
        if b < EXPONENTIAL_LIMIT {
            qi * (-d * t).exp()
        } else {
            qi / (1.0 + b * d * t).powf(1.0 / b)
        }
    }

    /// Cumulative production from `0` to `t`.
    pub fn cumulative(&self, t: f64) -> f64 {
        let (qi, d, b) = (self.initial_rate, self.initial_decline, self.exponent);
        if b < EXPONENTIAL_LIMIT {
            qi / d * (1.0 - (-d * t).exp())
        } else if (b - 1.0).abs() < HARMONIC_TOLERANCE {
            qi / d * (1.0 + d * t).ln()
        } else {
            qi / ((1.0 - b) * d) * (1.0 - (1.0 + b * d * t).powf((b - 1.0) / b))
        }
    }

    /// Time at which the rate falls to `rate`. `None` if it never does.
    pub fn time_to_rate(&self, rate: f64) -> Option<f64> {
        let (qi, d, b) = (self.initial_rate, self.initial_decline, self.exponent);
        if rate >= qi {
            return Some(0.0);
        }
        if rate <= 0.0 {
            return None;
        }
        if b < EXPONENTIAL_LIMIT {
            Some((qi / rate).ln() / d)
        } else {
            Some(((qi / rate).powf(b) - 1.0) / (b * d))
        }
    }

    /// Cumulative production until the rate falls to `rate`.
    pub fn cumulative_to_rate(&self, rate: f64) -> f64 {
        let (qi, d, b) = (self.initial_rate, self.initial_decline, self.exponent);
        let rate = rate.max(0.0);
        if rate >= qi {
            return 0.0;
        }
        if b < EXPONENTIAL_LIMIT {
            (qi - rate) / d
        } else if (b - 1.0).abs() < HARMONIC_TOLERANCE {
            if rate == 0.0 {
                f64::INFINITY
            } else {
                qi / d * (qi / rate).ln()
            }
        } else if b > 1.0 && rate == 0.0 {
            f64::INFINITY
        } else {
            qi.powf(b) / ((1.0 - b) * d) * (qi.powf(1.0 - b) - rate.powf(1.0 - b))
        }
    }

    pub fn estimated_ultimate_recovery(&self, limits: &EurLimits) -> f64 {
        let to_limit = self.cumulative_to_rate(limits.economic_rate);
        match limits.forecast_horizon {
            Some(horizon) => to_limit.min(self.cumulative(horizon)),
            None => to_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn hyperbolic_rate_and_cumulative_are_consistent() {
        let arps = ArpsParameters::new(1000.0, 0.15, 0.5);
        assert_eq!(arps.rate(0.0), 1000.0);
        assert_relative_eq!(arps.rate(10.0), 1000.0 / (1.75_f64).powi(2), max_relative = 1e-12);

        // Cumulative to the rate reached at t equals the cumulative at t.
        let t = 40.0;
        assert_relative_eq!(arps.cumulative_to_rate(arps.rate(t)), arps.cumulative(t), max_relative = 1e-9);
        assert_relative_eq!(arps.time_to_rate(arps.rate(t)).unwrap(), t, max_relative = 1e-9);
    }

    #[test]
    fn exponential_and_harmonic_limits() {
        let exponential = ArpsParameters::new(500.0, 0.01, 0.0);
        assert_relative_eq!(exponential.cumulative_to_rate(0.0), 50_000.0, max_relative = 1e-12);
        assert_relative_eq!(exponential.rate(100.0), 500.0 * (-1.0_f64).exp(), max_relative = 1e-12);

        let harmonic = ArpsParameters::new(500.0, 0.01, 1.0);
        assert_relative_eq!(harmonic.cumulative(100.0), 50_000.0 * 2.0_f64.ln(), max_relative = 1e-12);
        assert!(harmonic.cumulative_to_rate(0.0).is_infinite());
    }

    #[test]
    fn eur_respects_economic_limit_and_horizon() {
        let arps = ArpsParameters::new(1000.0, 0.1, 0.5);
        let unlimited = arps.estimated_ultimate_recovery(&EurLimits::default());
        assert_relative_eq!(unlimited, 1000.0 / (0.5 * 0.1), max_relative = 1e-12);

        let limited = arps.estimated_ultimate_recovery(&EurLimits {
            economic_rate: 10.0,
            forecast_horizon: None,
        });
        assert!(limited < unlimited);

        let capped = arps.estimated_ultimate_recovery(&EurLimits {
            economic_rate: 10.0,
            forecast_horizon: Some(30.0),
        });
        assert_relative_eq!(capped, arps.cumulative(30.0), max_relative = 1e-12);
        assert_eq!(arps.cumulative_to_rate(2000.0), 0.0);
    }
}
