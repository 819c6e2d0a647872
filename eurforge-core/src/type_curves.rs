//! Fetkovich decline type curves in dimensionless form.

use serde::Serialize;

const EXPONENTIAL_LIMIT: f64 = 1.0e-8;
const HARMONIC_TOLERANCE: f64 = 1.0e-8;

/// `qDd(tDd) = 1 / (1 + b·tDd)^(1/b)`, `e^(−tDd)` as `b → 0`.
pub fn arps_dimensionless_rate(t_d: f64, b: f64) -> f64 {
    if b < EXPONENTIAL_LIMIT {
        (-t_d).exp()
    } else {
        1.0 / (1.0 + b * t_d).powf(1.0 / b)
    }
}

/// `∫₀^tDd qDd dt`.
pub fn arps_dimensionless_cumulative(t_d: f64, b: f64) -> f64 {
    if b < EXPONENTIAL_LIMIT {
        1.0 - (-t_d).exp()
    } else if (b - 1.0).abs() < HARMONIC_TOLERANCE {
        (1.0 + t_d).ln()
    } else {
        (1.0 - (1.0 + b * t_d).powf((b - 1.0) / b)) / (1.0 - b)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeCurve {
    pub exponent: f64,
    pub time: Vec<f64>,
    pub rate: Vec<f64>,
    pub cumulative: Vec<f64>,
}

/// One curve per exponent, all sampled on the same `tDd` grid.
pub fn type_curve_family(exponents: &[f64], time: &[f64]) -> Vec<TypeCurve> {
    exponents
        .iter()
        .map(|&b| TypeCurve {
            exponent: b,
            time: time.to_vec(),
            rate: time.iter().map(|&t| arps_dimensionless_rate(t, b)).collect(),
            cumulative: time.iter().map(|&t| arps_dimensionless_cumulative(t, b)).collect(),
        })
        .collect()
}

/// `points` values spaced evenly in `log10` between `start` and `end`.
pub fn log_grid(start: f64, end: f64, points: usize) -> Vec<f64> {
    if points < 2 {
        return vec![start; points];
    }
    let (lo, hi) = (start.log10(), end.log10());
    let step = (hi - lo) / (points - 1) as f64;
    (0..points).map(|k| 10f64.powf(lo + step * k as f64)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn curves_start_at_unity_and_decline() {
        for b in [0.0, 0.3, 0.5, 1.0] {
            assert_eq!(arps_dimensionless_rate(0.0, b), 1.0);
            assert_eq!(arps_dimensionless_cumulative(0.0, b), 0.0);
            assert!(arps_dimensionless_rate(10.0, b) < arps_dimensionless_rate(1.0, b));
        }
        assert_relative_eq!(arps_dimensionless_rate(2.0, 0.5), 0.25, max_relative = 1e-12);
        assert_relative_eq!(arps_dimensionless_cumulative(1.0, 1.0), 2.0_f64.ln(), max_relative = 1e-12);
    }

    #[test]
    fn cumulative_is_the_area_under_the_rate() {
        let b = 0.4;
        let grid: Vec<f64> = (0..=20_000).map(|k| k as f64 * 5.0e-4).collect();
        let area: f64 = grid
            .windows(2)
            .map(|w| 0.5 * (arps_dimensionless_rate(w[0], b) + arps_dimensionless_rate(w[1], b)) * (w[1] - w[0]))
            .sum();
        assert_relative_eq!(area, arps_dimensionless_cumulative(10.0, b), max_relative = 1e-6);
    }

    #[test]
    fn family_shares_the_grid() {
        let grid = log_grid(1.0e-2, 1.0e2, 5);
        assert_relative_eq!(grid[0], 1.0e-2, max_relative = 1e-12);
        assert_relative_eq!(grid[2], 1.0, max_relative = 1e-12);
        assert_relative_eq!(grid[4], 1.0e2, max_relative = 1e-12);

        let family = type_curve_family(&[0.0, 0.5, 1.0], &grid);
        assert_eq!(family.len(), 3);
        assert!(family.iter().all(|c| c.time == grid && c.rate.len() == 5));
        // Higher exponents decline more slowly at late time.
        assert!(family[2].rate[4] > family[1].rate[4]);
        assert!(family[1].rate[4] > family[0].rate[4]);
    }
}
