//! Log-log diagnostic charts for one analysed well.

use anyhow::Result;
use eurforge_core::{
    dimensionless::DimensionlessSeries,
    pipeline::AnalysisReport,
    type_curves::{log_grid, type_curve_family},
};
use plotters::prelude::*;
use std::path::Path;

const TYPE_CURVE_EXPONENTS: [f64; 5] = [0.0, 0.3, 0.5, 0.7, 1.0];
const TYPE_CURVE_POINTS: usize = 200;

/// Writes every chart for `report` into `output_dir`.
pub fn generate_all_plots(output_dir: &Path, report: &AnalysisReport) -> Result<()> {
    println!("[Plotting] Generating charts for well '{}'...", report.well);

    plot_normalized_rate(output_dir, report)?;
    plot_dimensionless(output_dir, &report.well, &report.dimensionless, "dimensionless")?;
    if let Some(refined) = &report.refined {
        plot_dimensionless(output_dir, &report.well, refined, "refined")?;
    }
    plot_rate_fit(output_dir, report)?;

    println!("[Plotting] Charts have been saved to '{}'.", output_dir.display());
    Ok(())
}

/// Pairs with both coordinates positive and finite, as a log axis needs.
fn positive_pairs(x: &[f64], y: &[f64]) -> Vec<(f64, f64)> {
    x.iter()
        .zip(y)
        .filter(|&(&a, &b)| a.is_finite() && b.is_finite() && a > 0.0 && b > 0.0)
        .map(|(&a, &b)| (a, b))
        .collect()
}

/// Log-axis bounds covering every value, padded by half a decade.
fn log_bounds<'a>(values: impl Iterator<Item = &'a f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .copied()
        .filter(|v| v.is_finite() && *v > 0.0)
        .fold((f64::INFINITY, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if hi <= 0.0 {
        return None;
    }
    let pad = 10f64.sqrt();
    Some((lo / pad, hi * pad))
}

/// Normalized rate, its running integral and integral derivative against
/// material-balance pseudo-time.
fn plot_normalized_rate(output_dir: &Path, report: &AnalysisReport) -> Result<()> {
    let series = &report.normalized;
    let curves = [
        ("q/Δp", positive_pairs(&series.tca, &series.normalized_rate), RED),
        ("(q/Δp)i", positive_pairs(&series.tca, &series.rate_integral), BLUE),
        ("(q/Δp)id", positive_pairs(&series.tca, &series.rate_integral_derivative), GREEN),
    ];
    let all: Vec<&(f64, f64)> = curves.iter().flat_map(|(_, points, _)| points.iter()).collect();
    let (Some(x_range), Some(y_range)) = (
        log_bounds(all.iter().map(|p| &p.0)),
        log_bounds(all.iter().map(|p| &p.1)),
    ) else {
        println!("[Plotting] Warning: no positive normalized points for '{}'.", report.well);
        return Ok(());
    };

    let path = output_dir.join(format!("{}_1_normalized_rate.png", report.well));
    let root = BitMapBackend::new(&path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Normalized Rate: {}", report.well), ("sans-serif", 40).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(
            (x_range.0..x_range.1).log_scale(),
            (y_range.0..y_range.1).log_scale(),
        )?;

    chart
        .configure_mesh()
        .x_desc("Material-balance pseudo-time tca (days)")
        .y_desc("Normalized rate")
        .draw()?;

    for (label, points, color) in curves {
        chart
            .draw_series(points.iter().map(|&p| Circle::new(p, 3, color.filled())))?
            .label(label)
            .legend(move |(x, y)| Circle::new((x + 10, y), 3, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

/// Dimensionless groups over Arps type-curve stems.
fn plot_dimensionless(output_dir: &Path, well: &str, series: &DimensionlessSeries, stage: &str) -> Result<()> {
    let rate = positive_pairs(&series.tcadd, &series.qdd);
    let integral = positive_pairs(&series.tcadd, &series.qddj);
    let derivative = positive_pairs(&series.tcadd, &series.qddjd);

    let Some(data_x) = log_bounds(rate.iter().chain(&integral).map(|p| &p.0)) else {
        println!("[Plotting] Warning: no positive dimensionless points for '{}'.", well);
        return Ok(());
    };
    let x_range = (data_x.0.min(1.0e-2), data_x.1.max(1.0e1));
    let grid = log_grid(x_range.0, x_range.1, TYPE_CURVE_POINTS);
    let family = type_curve_family(&TYPE_CURVE_EXPONENTS, &grid);

    let y_values: Vec<f64> = rate
        .iter()
        .chain(&integral)
        .chain(&derivative)
        .map(|p| p.1)
        .chain(family.iter().flat_map(|c| c.rate.iter().copied()))
        .collect();
    let Some(y_range) = log_bounds(y_values.iter()) else {
        return Ok(());
    };
    let y_range = (y_range.0.max(1.0e-4), y_range.1);

    let path = output_dir.join(format!("{}_2_{}.png", well, stage));
    let root = BitMapBackend::new(&path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Blasingame Type Curve ({}): {}", stage, well), ("sans-serif", 40).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(
            (x_range.0..x_range.1).log_scale(),
            (y_range.0..y_range.1).log_scale(),
        )?;

    chart
        .configure_mesh()
        .x_desc("tcaDd")
        .y_desc("qDd, qDdi, qDdid")
        .draw()?;

    for curve in &family {
        chart.draw_series(LineSeries::new(
            curve
                .time
                .iter()
                .zip(&curve.rate)
                .filter(|&(_, &q)| q >= y_range.0)
                .map(|(&t, &q)| (t, q)),
            BLACK.mix(0.4).stroke_width(1),
        ))?;
    }

    let markers = [("qDd", rate, RED), ("qDdi", integral, BLUE), ("qDdid", derivative, GREEN)];
    for (label, points, color) in markers {
        chart
            .draw_series(points.into_iter().map(|p| Circle::new(p, 3, color.filled())))?
            .label(label)
            .legend(move |(x, y)| Circle::new((x + 10, y), 3, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

/// Observed gas rate with the fitted Arps decline.
fn plot_rate_fit(output_dir: &Path, report: &AnalysisReport) -> Result<()> {
    let series = &report.normalized;
    let observed: Vec<(f64, f64)> = series
        .time
        .iter()
        .zip(&series.gas_rate)
        .filter(|&(&t, &q)| t.is_finite() && q > 0.0)
        .map(|(&t, &q)| (t, q))
        .collect();
    let Some(y_range) = log_bounds(observed.iter().map(|p| &p.1)) else {
        return Ok(());
    };
    let t_max = observed.last().map_or(1.0, |p| p.0).max(1.0);

    let path = output_dir.join(format!("{}_3_rate_fit.png", report.well));
    let root = BitMapBackend::new(&path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Decline Fit: {}", report.well), ("sans-serif", 40).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..t_max, (y_range.0..y_range.1).log_scale())?;

    chart
        .configure_mesh()
        .x_desc("Time (days)")
        .y_desc("Gas rate")
        .draw()?;

    chart
        .draw_series(observed.iter().map(|&p| Circle::new(p, 3, BLUE.filled())))?
        .label("Observed")
        .legend(|(x, y)| Circle::new((x + 10, y), 3, BLUE.filled()));

    if let Some(fit) = &report.fetkovich {
        let arps = fit.parameters;
        chart
            .draw_series(LineSeries::new(
                (0..=200).map(|k| {
                    let t = t_max * k as f64 / 200.0;
                    (t, arps.rate(t).max(y_range.0))
                }),
                RED.stroke_width(2),
            ))?
            .label(format!(
                "Arps qi={:.1}, di={:.4}, b={:.3}",
                arps.initial_rate, arps.initial_decline, arps.exponent
            ))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_bounds_skip_non_positive_values() {
        let values = [0.0, -1.0, f64::NAN, 1.0, 100.0];
        let (lo, hi) = log_bounds(values.iter()).unwrap();
        assert!(lo < 1.0 && lo > 0.1);
        assert!(hi > 100.0 && hi < 1000.0);
        assert!(log_bounds([0.0, -2.0].iter()).is_none());
    }

    #[test]
    fn positive_pairs_drop_points_a_log_axis_cannot_show() {
        let pairs = positive_pairs(&[0.0, 1.0, 2.0, 3.0], &[1.0, f64::NAN, 2.0, -1.0]);
        assert_eq!(pairs, vec![(2.0, 2.0)]);
    }
}
