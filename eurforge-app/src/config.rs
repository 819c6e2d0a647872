use anyhow::{Context, Result};
use eurforge_core::{
    pipeline::AnalysisOptions,
    production::{ingest_rows, IngestOptions, IngestOutcome},
    pvt::PvtTable,
};
use eurforge_schemas::{
    file_formats::{ParameterFile, WeightFile},
    method::MethodWeights,
    production::ProductionRow,
    pvt::{PressureUnit, PvtRow},
    reservoir::ReservoirParameters,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

/// The contents of `analysis.yaml`. Relative paths are resolved against the
/// directory holding the configuration file.
#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    pub pvt: PvtSource,
    pub production: ProductionSource,
    pub parameters_path: PathBuf,
    #[serde(default)]
    pub weights: Option<WeightSource>,
    #[serde(default)]
    pub geometry: GeometryConfig,
    #[serde(default)]
    pub options: AnalysisOptions,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct PvtSource {
    pub path: PathBuf,
    #[serde(default)]
    pub pressure_unit: PressureUnit,
}

#[derive(Debug, Deserialize)]
pub struct ProductionSource {
    pub path: PathBuf,
    #[serde(default)]
    pub pressure_unit: PressureUnit,
    /// Well id for rows that carry none.
    #[serde(default)]
    pub default_well: Option<String>,
    /// Analyse only these wells.
    #[serde(default)]
    pub wells: Option<Vec<String>>,
}

/// Weights given inline or in a separate weight file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WeightSource {
    File { path: PathBuf },
    Inline(MethodWeights),
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub drainage_radius: f64,
    /// Overrides the skin-adjusted wellbore radius from the parameters.
    pub effective_wellbore_radius: Option<f64>,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            drainage_radius: 1000.0,
            effective_wellbore_radius: None,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./data/runs")
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration: {:?}", path))?;
        let mut config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration: {:?}", path))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.pvt.path = resolve(base, &config.pvt.path);
        config.production.path = resolve(base, &config.production.path);
        config.parameters_path = resolve(base, &config.parameters_path);
        if let Some(WeightSource::File { path }) = &mut config.weights {
            *path = resolve(base, path);
        }
        Ok(config)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Everything read from disk for one run.
pub struct InputBundle {
    pub pvt: Arc<PvtTable>,
    pub parameters: ReservoirParameters,
    pub weights: Option<MethodWeights>,
    pub production: IngestOutcome,
}

impl InputBundle {
    pub fn load(config: &AnalysisConfig) -> Result<Self> {
        println!("Loading inputs...");

        let pvt_rows: Vec<PvtRow> = read_csv(&config.pvt.path)?;
        let pvt = PvtTable::from_rows_in(pvt_rows, config.pvt.pressure_unit)
            .with_context(|| format!("Invalid PVT table in {:?}", config.pvt.path))?;

        let parameter_file: ParameterFile = read_yaml(&config.parameters_path)?;
        let mut parameters = parameter_file.parameters;
        parameters.p_i = parameter_file.pressure_unit.to_pascal(parameters.p_i);

        let weights = match &config.weights {
            Some(WeightSource::Inline(weights)) => Some(weights.clone()),
            Some(WeightSource::File { path }) => Some(read_yaml::<WeightFile>(path)?.weights),
            None => None,
        };

        let rows: Vec<ProductionRow> = read_csv(&config.production.path)?;
        let production = ingest_rows(
            &rows,
            &IngestOptions {
                pressure_unit: config.production.pressure_unit,
                default_well: config.production.default_well.clone(),
            },
        )
        .with_context(|| format!("Failed to ingest production from {:?}", config.production.path))?;

        println!(
            "Loaded {} PVT rows, {} production rows for {} well(s).",
            pvt.len(),
            rows.len(),
            production.records.len()
        );
        Ok(Self {
            pvt: Arc::new(pvt),
            parameters,
            weights,
            production,
        })
    }
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path))?;
    let mut rows = Vec::new();
    for (index, result) in reader.deserialize().enumerate() {
        let row: T = result.with_context(|| format!("Failed to parse row {} of {:?}", index + 1, path))?;
        rows.push(row);
    }
    Ok(rows)
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse YAML from {:?}", path))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use eurforge_schemas::method::DeclineMethod;

    /// Writes a small but complete input set into `dir`.
    pub(crate) fn write_inputs(dir: &Path, weights: &str) -> PathBuf {
        fs::write(
            dir.join("pvt.csv"),
            "p（MPa）,μg（Pa·s）,Z（-）,Ct（MPa^-1）\n0,1.8e-5,1,0.06\n30,1.8e-5,1,0.06\n",
        )
        .unwrap();

        let mut production = String::from("Gas,Date,Qg,Qw,Pwf,Gp\n");
        let mut cumulative = 0.0;
        for day in 0..60 {
            let rate = 1000.0 / (1.0 + 0.5 * 0.05 * day as f64).powi(2);
            production.push_str(&format!("A,{},{:.6},0,5,{:.6}\n", day, rate, cumulative));
            cumulative += rate;
        }
        fs::write(dir.join("production.csv"), production).unwrap();

        fs::write(
            dir.join("parameters.yaml"),
            "schema_version: \"1\"\npressure_unit: MPa\nparameters:\n  μgi: 1.8e-5\n  Zi: 1.0\n  pi: 20\n  Cti: 0.06\n  G: 1.0e10\n  K: 1.0\n  Φ: 0.1\n  Ti: 350\n  h: 10\n  r_w: 0.1\n  S_water: 0.3\n",
        )
        .unwrap();

        let config = dir.join("analysis.yaml");
        fs::write(
            &config,
            format!(
                "pvt:\n  path: pvt.csv\n  pressure_unit: MPa\nproduction:\n  path: production.csv\n  pressure_unit: MPa\nparameters_path: parameters.yaml\n{}output_dir: runs\n",
                weights
            ),
        )
        .unwrap();
        config
    }

    #[test]
    fn loads_config_and_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_inputs(dir.path(), "weights:\n  Fetkovich: 0.5\n  Blasingame: 0.25\n  NPI: 0.25\n");
        let config = AnalysisConfig::load(&path).unwrap();
        assert_eq!(config.pvt.path, dir.path().join("pvt.csv"));
        assert_eq!(config.geometry.drainage_radius, 1000.0);
        assert!(matches!(config.weights, Some(WeightSource::Inline(_))));

        let inputs = InputBundle::load(&config).unwrap();
        assert_eq!(inputs.parameters.p_i, 20.0e6);
        assert_eq!(inputs.pvt.pressure_range(), (0.0, 30.0e6));
        assert_eq!(inputs.production.records.len(), 1);
        assert_eq!(inputs.production.records[0].len(), 60);
        assert_eq!(inputs.weights.unwrap()[&DeclineMethod::Npi], 0.25);
    }

    #[test]
    fn weights_can_come_from_a_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("weights.yaml"),
            "schema_version: \"1\"\nweights:\n  Fetkovich: 1.0\n",
        )
        .unwrap();
        let path = write_inputs(dir.path(), "weights:\n  path: weights.yaml\n");
        let config = AnalysisConfig::load(&path).unwrap();
        let inputs = InputBundle::load(&config).unwrap();
        let weights = inputs.weights.unwrap();
        assert_eq!(weights.len(), 1);
        assert_eq!(weights[&DeclineMethod::Fetkovich], 1.0);
    }
}
