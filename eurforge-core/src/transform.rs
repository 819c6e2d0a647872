//! Running integral and log-derivative of a sampled curve.
//!
//! The same transform is applied to the pressure-normalized rate against
//! `tca` and to the dimensionless rate against `tcaDd`. Inputs need not be
//! ordered: pairs are sorted by `x` with a stable permutation and the results
//! are written back at the caller's indices.

use crate::error::EurError;

/// The running integral of a curve and its negative log-derivative.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegralDerivative {
    pub integral: Vec<f64>,
    pub derivative: Vec<f64>,
}

/// Cumulative trapezoidal area of `y` over `x` up to each point.
pub fn cumulative_trapezoid(x: &[f64], y: &[f64]) -> Result<Vec<f64>, EurError> {
    check_pairs(x, y)?;
    let order = sort_order(x);
    let mut area = vec![0.0; x.len()];
    let mut total = 0.0;
    for (k, &i) in order.iter().enumerate() {
        if k > 0 {
            let j = order[k - 1];
            total += 0.5 * (y[j] + y[i]) * (x[i] - x[j]);
        }
        area[i] = total;
    }
    Ok(area)
}

/// `(1/x) · ∫ y dx` from the smallest `x` up to each point; zero where `x ≤ 0`.
pub fn running_integral(x: &[f64], y: &[f64]) -> Result<Vec<f64>, EurError> {
    let area = cumulative_trapezoid(x, y)?;
    Ok(x
        .iter()
        .zip(area)
        .map(|(&xi, a)| if xi <= 0.0 { 0.0 } else { a / xi })
        .collect())
}

/// `−d(integral)/d(ln x)` by finite differences: forward at the first point,
/// backward at the last, central elsewhere.
///
/// A zero at the smallest `x` is tolerated by reusing `ln` of the next point.
///
/// # Errors
///
/// `InvalidDomain` for any other non-positive or non-finite `x`.
pub fn log_derivative(x: &[f64], integral: &[f64]) -> Result<Vec<f64>, EurError> {
    check_pairs(x, integral)?;
    let n = x.len();
    if n < 2 {
        return Ok(vec![0.0; n]);
    }

    let order = sort_order(x);
    let xs: Vec<f64> = order.iter().map(|&i| x[i]).collect();
    let ys: Vec<f64> = order.iter().map(|&i| integral[i]).collect();

    if let Some(k) = xs
        .iter()
        .enumerate()
        .position(|(k, &v)| v < 0.0 || (v == 0.0 && k > 0))
    {
        return Err(EurError::InvalidDomain(format!(
            "log-derivative needs positive abscissae after the first point, got {}",
            xs[k]
        )));
    }

    let ln_x: Vec<f64> = xs
        .iter()
        .enumerate()
        .map(|(k, &v)| if k == 0 && v == 0.0 { xs[1].ln() } else { v.ln() })
        .collect();

    let mut derivative = vec![0.0; n];
    for k in 0..n {
        let (a, b) = if k == 0 {
            (0, 1)
        } else if k == n - 1 {
            (n - 2, n - 1)
        } else {
            (k - 1, k + 1)
        };
        let d_ln = ln_x[b] - ln_x[a];
        derivative[order[k]] = if d_ln != 0.0 { -(ys[b] - ys[a]) / d_ln } else { 0.0 };
    }
    Ok(derivative)
}

pub fn integral_derivative(x: &[f64], y: &[f64]) -> Result<IntegralDerivative, EurError> {
    let integral = running_integral(x, y)?;
    let derivative = log_derivative(x, &integral)?;
    Ok(IntegralDerivative { integral, derivative })
}

/// Applies [`integral_derivative`] to the points where `valid` holds and both
/// coordinates are finite; every other index receives `NaN`.
///
/// Only the earliest point at `x = 0` is transformed. Later points sharing
/// that abscissa (leading zero-rate observations) receive `NaN`.
pub fn integral_derivative_masked(
    x: &[f64],
    y: &[f64],
    valid: &[bool],
) -> Result<IntegralDerivative, EurError> {
    check_lengths(x.len(), y.len())?;
    check_lengths(x.len(), valid.len())?;

    let mut kept: Vec<usize> = Vec::with_capacity(x.len());
    let mut origin_taken = false;
    for i in 0..x.len() {
        if !(valid[i] && x[i].is_finite() && y[i].is_finite()) {
            continue;
        }
        if x[i] == 0.0 {
            if origin_taken {
                continue;
            }
            origin_taken = true;
        }
        kept.push(i);
    }
    let xs: Vec<f64> = kept.iter().map(|&i| x[i]).collect();
    let ys: Vec<f64> = kept.iter().map(|&i| y[i]).collect();
    let compact = integral_derivative(&xs, &ys)?;

    let mut result = IntegralDerivative {
        integral: vec![f64::NAN; x.len()],
        derivative: vec![f64::NAN; x.len()],
    };
    for (k, &i) in kept.iter().enumerate() {
        result.integral[i] = compact.integral[k];
        result.derivative[i] = compact.derivative[k];
    }
    Ok(result)
}

fn check_lengths(a: usize, b: usize) -> Result<(), EurError> {
    if a != b {
        return Err(EurError::LengthMismatch(a, b));
    }
    Ok(())
}

fn check_pairs(x: &[f64], y: &[f64]) -> Result<(), EurError> {
    check_lengths(x.len(), y.len())?;
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(EurError::InvalidDomain(
            "integral transform received a non-finite value".to_string(),
        ));
    }
    Ok(())
}

fn sort_order(x: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..x.len()).collect();
    order.sort_by(|&a, &b| x[a].total_cmp(&x[b]));
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn running_integral_is_zero_at_the_first_point() {
        let x = [0.0, 1.0, 2.0, 4.0];
        let y = [3.0, 2.0, 1.5, 1.0];
        assert_eq!(running_integral(&x, &y).unwrap()[0], 0.0);

        let shifted = [2.0, 3.0, 5.0];
        assert_eq!(running_integral(&shifted, &[1.0, 1.0, 1.0]).unwrap()[0], 0.0);
    }

    #[test]
    fn running_integral_of_a_constant_from_zero_is_the_constant() {
        let x = [0.0, 0.5, 1.0, 3.0, 10.0];
        let result = running_integral(&x, &[2.5; 5]).unwrap();
        for value in &result[1..] {
            assert_relative_eq!(*value, 2.5, max_relative = 1e-12);
        }
    }

    #[test]
    fn cumulative_area_is_non_decreasing_for_non_negative_data() {
        let x = [0.0, 1.0, 1.5, 4.0, 9.0];
        let y = [5.0, 0.0, 2.0, 0.5, 0.0];
        let area = cumulative_trapezoid(&x, &y).unwrap();
        assert!(area.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn results_do_not_depend_on_input_order() {
        let x = [0.0, 1.0, 2.0, 5.0, 7.0];
        let y = [4.0, 3.0, 2.5, 1.0, 0.8];
        let sorted = integral_derivative(&x, &y).unwrap();

        let permutation = [3, 0, 4, 2, 1];
        let px: Vec<f64> = permutation.iter().map(|&i| x[i]).collect();
        let py: Vec<f64> = permutation.iter().map(|&i| y[i]).collect();
        let shuffled = integral_derivative(&px, &py).unwrap();

        for (k, &i) in permutation.iter().enumerate() {
            assert_eq!(shuffled.integral[k], sorted.integral[i]);
            assert_eq!(shuffled.derivative[k], sorted.derivative[i]);
        }
    }

    #[test]
    fn log_derivative_recovers_power_law_exponent() {
        let exponent = -0.5;
        let x: Vec<f64> = (0..80).map(|k| 1.05_f64.powi(k)).collect();
        let y: Vec<f64> = x.iter().map(|v| v.powf(exponent)).collect();
        let derivative = log_derivative(&x, &y).unwrap();

        for i in 5..75 {
            assert_relative_eq!(-derivative[i] / y[i], exponent, max_relative = 1e-3);
        }
    }

    #[test]
    fn log_derivative_tolerates_a_leading_zero_only() {
        let derivative = log_derivative(&[0.0, 1.0, 2.0], &[0.0, 1.0, 1.5]).unwrap();
        assert_eq!(derivative[0], 0.0);
        assert!(derivative[1].is_finite());

        assert!(matches!(
            log_derivative(&[0.0, 0.0, 2.0], &[0.0, 1.0, 1.5]),
            Err(EurError::InvalidDomain(_))
        ));
        assert!(matches!(
            log_derivative(&[-1.0, 1.0, 2.0], &[0.0, 1.0, 1.5]),
            Err(EurError::InvalidDomain(_))
        ));
        assert!(matches!(
            log_derivative(&[1.0, f64::NAN], &[0.0, 1.0]),
            Err(EurError::InvalidDomain(_))
        ));
    }

    #[test]
    fn single_point_derivative_is_zero() {
        assert_eq!(log_derivative(&[3.0], &[1.0]).unwrap(), vec![0.0]);
        assert!(log_derivative(&[], &[]).unwrap().is_empty());
    }

    #[test]
    fn masked_transform_writes_nan_at_invalid_points() {
        let x = [0.0, 1.0, f64::NAN, 3.0, 4.0];
        let y = [1.0, 1.0, 1.0, 1.0, 1.0];
        let valid = [true, true, false, false, true];
        let result = integral_derivative_masked(&x, &y, &valid).unwrap();

        assert!(result.integral[2].is_nan());
        assert!(result.integral[3].is_nan());
        assert_relative_eq!(result.integral[4], 1.0, max_relative = 1e-12);
        assert_eq!(result.integral[0], 0.0);
    }

    #[test]
    fn masked_transform_keeps_only_the_first_point_at_zero() {
        let x = [0.0, 0.0, 1.0, 2.0];
        let y = [0.0, 0.0, 2.0, 1.5];
        let result = integral_derivative_masked(&x, &y, &[true; 4]).unwrap();

        assert_eq!(result.integral[0], 0.0);
        assert!(result.integral[1].is_nan());
        assert!(result.derivative[1].is_nan());
        assert!(result.integral[2].is_finite());
        assert!(result.derivative[3].is_finite());
    }
}
