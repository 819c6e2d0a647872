use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

mod config;
mod plotting;
mod workflow;

#[derive(Parser, Debug)]
#[command(name = "eurforge")]
#[command(about = "Gas-well EUR estimation by decline-curve analysis")]
#[command(version)]
struct Cli {
    /// Analysis configuration (YAML)
    #[arg(short, long, default_value = "analysis.yaml")]
    config: PathBuf,

    /// Override the output directory from the configuration
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Analyse only this well; repeat for several
    #[arg(long = "well")]
    wells: Vec<String>,

    /// Skip chart generation
    #[arg(long)]
    no_plots: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    println!("--- EUR Forge ---");

    let config = config::AnalysisConfig::load(&cli.config)?;
    let inputs = config::InputBundle::load(&config)?;

    let wells = if cli.wells.is_empty() {
        config.production.wells.clone().unwrap_or_default()
    } else {
        cli.wells.clone()
    };

    let base_dir = cli.output_dir.clone().unwrap_or_else(|| config.output_dir.clone());
    let output_dir = base_dir.join(format!("run_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S")));
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    // Keep the configuration next to its results for traceability
    fs::copy(&cli.config, output_dir.join("analysis.yaml"))?;

    let reports = workflow::run_wells(&config, &inputs, &wells, &output_dir, !cli.no_plots)?;

    println!(
        "\nAnalysed {} well(s). Results are in '{}'",
        reports.len(),
        output_dir.display()
    );
    Ok(())
}
