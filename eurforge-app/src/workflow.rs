use crate::config::{AnalysisConfig, InputBundle};
use crate::plotting;
use anyhow::{bail, Context, Result};
use eurforge_core::{
    dimensionless::WellGeometry,
    pipeline::{AnalysisBuilder, AnalysisReport},
    production::ProductionRecord,
};
use eurforge_schemas::method::DeclineMethod;
use std::{fs, path::Path};
use tracing::{error, warn};

/// Analyses every selected well and writes its series, report and charts.
///
/// A well that fails structurally is reported and skipped; the run fails
/// only if no well could be analysed.
pub fn run_wells(
    config: &AnalysisConfig,
    inputs: &InputBundle,
    wells: &[String],
    output_dir: &Path,
    plots: bool,
) -> Result<Vec<AnalysisReport>> {
    println!("\n--- [Workflow] Starting Decline Analysis ---");

    let ingest_path = output_dir.join("ingest_report.json");
    fs::write(&ingest_path, serde_json::to_string_pretty(&inputs.production.reports)?)
        .with_context(|| format!("Failed to write {:?}", ingest_path))?;

    let selected: Vec<&ProductionRecord> = inputs
        .production
        .records
        .iter()
        .filter(|r| wells.is_empty() || wells.iter().any(|w| w == r.well()))
        .collect();
    if selected.is_empty() {
        bail!("No production records match the selected wells");
    }

    let mut reports = Vec::new();
    for record in selected {
        match analyse_well(config, inputs, record, output_dir, plots) {
            Ok(report) => {
                print_summary_report(&report);
                reports.push(report);
            }
            Err(err) => error!(well = %record.well(), error = %format!("{:#}", err), "well analysis failed"),
        }
    }

    if reports.is_empty() {
        bail!("No well could be analysed");
    }
    Ok(reports)
}

fn analyse_well(
    config: &AnalysisConfig,
    inputs: &InputBundle,
    record: &ProductionRecord,
    output_dir: &Path,
    plots: bool,
) -> Result<AnalysisReport> {
    println!("\n--- [Workflow] Well '{}' ({} observations) ---", record.well(), record.len());

    let mut builder = AnalysisBuilder::new()
        .with_pvt(inputs.pvt.clone())
        .with_parameters(inputs.parameters)
        .with_production(record.clone())
        .with_options(config.options.clone())
        .with_series_logging_to_file(output_dir.join(format!("{}_series.csv", record.well())));
    if let Some(geometry) = initial_geometry(config, inputs)? {
        builder = builder.with_geometry(geometry);
    }
    if let Some(weights) = &inputs.weights {
        builder = builder.with_weights(weights.clone());
    }

    let engine = builder
        .build()
        .with_context(|| format!("Failed to configure analysis for well '{}'", record.well()))?;
    let report = engine
        .run_logged()
        .with_context(|| format!("Analysis failed for well '{}'", record.well()))?;

    let report_path = output_dir.join(format!("{}_report.json", record.well()));
    fs::write(&report_path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("Failed to write {:?}", report_path))?;

    if plots {
        if let Err(err) = plotting::generate_all_plots(output_dir, &report) {
            warn!(well = %record.well(), error = %err, "charts could not be generated");
        }
    }
    Ok(report)
}

/// Geometry from the configuration, falling back to the skin-adjusted
/// wellbore radius. `None` leaves the choice to the builder.
fn initial_geometry(config: &AnalysisConfig, inputs: &InputBundle) -> Result<Option<WellGeometry>> {
    let drainage_radius = config.geometry.drainage_radius;
    let geometry = match (config.geometry.effective_wellbore_radius, inputs.parameters.wellbore_radius) {
        (Some(r_wa), _) => Some(WellGeometry::new(drainage_radius, r_wa)?),
        (None, Some(r_w)) => Some(WellGeometry::from_skin(drainage_radius, r_w, inputs.parameters.skin)?),
        (None, None) => None,
    };
    Ok(geometry)
}

fn print_summary_report(report: &AnalysisReport) {
    println!("\n--- [Summary Report: {}] ---", report.well);
    println!("========================================");

    let valid = report.normalized.valid_indices().len();
    println!("Observations: {} ({} valid)", report.normalized.len(), valid);

    if let Some(fit) = &report.fetkovich {
        let arps = &fit.parameters;
        println!("\nFetkovich / Arps decline:");
        println!("  - qi: {:.3}   di: {:.5} 1/d   b: {:.4}", arps.initial_rate, arps.initial_decline, arps.exponent);
        println!("  - Relative RMSE: {:.3e} ({} points, {} iterations)", fit.relative_rmse, fit.points, fit.iterations);
        let reservoir = &fit.reservoir;
        println!("  - Regime: {:?}   Bgi: {:.5e}", reservoir.regime, reservoir.formation_volume_factor);
        println!(
            "  - Drainage radius: {:.1} m   K: {:.4}   G: {:.4e}",
            reservoir.drainage_radius, reservoir.permeability, reservoir.gas_in_place
        );
    }
    for fit in report.blasingame.iter().chain(report.npi.iter()) {
        println!(
            "\n{} material balance: G = {:.4e} (slope {:.4e}, {} points)",
            fit.method, fit.gas_in_place, fit.line.slope, fit.line.points
        );
    }

    println!("\nEUR by method:");
    for method in DeclineMethod::ALL {
        let weight = report.eur.weights.get(&method).copied().unwrap_or(0.0);
        match (report.eur.get(method), report.failure(method)) {
            (Some(eur), _) => println!("  - {:<10}: {:>14.4e}  (weight {:.2})", method, eur, weight),
            (None, Some(reason)) => println!("  - {:<10}: unavailable ({})", method, reason),
            (None, None) => println!("  - {:<10}: unavailable", method),
        }
    }
    println!("  --------------------------------------");
    println!("  - Comprehensive EUR: {:.4e}", report.eur.comprehensive);
    println!("========================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::write_inputs;

    #[test]
    fn analyses_a_well_and_writes_its_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_inputs(dir.path(), "");
        let config = AnalysisConfig::load(&config_path).unwrap();
        let inputs = InputBundle::load(&config).unwrap();
        let output_dir = dir.path().join("out");
        fs::create_dir_all(&output_dir).unwrap();

        let reports = run_wells(&config, &inputs, &[], &output_dir, false).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].well, "A");
        assert!(reports[0].eur.comprehensive.is_finite());
        assert!(output_dir.join("A_report.json").exists());
        assert!(output_dir.join("A_series.csv").exists());
        assert!(output_dir.join("ingest_report.json").exists());
    }

    #[test]
    fn unknown_well_filter_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = AnalysisConfig::load(&write_inputs(dir.path(), "")).unwrap();
        let inputs = InputBundle::load(&config).unwrap();
        let result = run_wells(&config, &inputs, &["B".to_string()], dir.path(), false);
        assert!(result.is_err());
    }
}
