use crate::{
    dimensionless::DimensionlessSeries, error::EurError, pipeline::AnalysisReport,
    series::{NormalizedSeries, PointFlags},
};
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One row of a derived series.
///
/// Normalized rows carry `tca` and `q/Δp_p` in `pseudo_time` and `rate`;
/// dimensionless rows carry `tcaDd` and `qDd`, with `NpDd` in `cumulative`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesRow {
    pub well: String,
    pub stage: String,
    pub index: usize,
    pub time: f64,
    pub gas_rate: f64,
    pub average_pressure: f64,
    pub pseudo_time: f64,
    pub rate: f64,
    pub integral: f64,
    pub derivative: f64,
    pub cumulative: f64,
    pub flags_json: String,
}

pub struct SeriesLogger {
    path: String,
    writer: Writer<fs::File>,
}

impl SeriesLogger {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, EurError> {
        let path = path.as_ref().display().to_string();
        let writer = Writer::from_path(&path).map_err(|e| EurError::CsvError(path.clone(), e))?;
        Ok(Self { path, writer })
    }

    pub fn log_normalized(&mut self, series: &NormalizedSeries) -> Result<(), EurError> {
        for i in 0..series.len() {
            let row = SeriesRow {
                well: series.well.clone(),
                stage: "normalized".to_string(),
                index: i,
                time: series.time[i],
                gas_rate: series.gas_rate[i],
                average_pressure: series.average_pressure[i],
                pseudo_time: series.tca[i],
                rate: series.normalized_rate[i],
                integral: series.rate_integral[i],
                derivative: series.rate_integral_derivative[i],
                cumulative: f64::NAN,
                flags_json: flags_json(&series.flags[i])?,
            };
            self.write(row)?;
        }
        self.flush()
    }

    /// `stage` separates the initial-guess and refined-geometry passes.
    pub fn log_dimensionless(
        &mut self,
        series: &DimensionlessSeries,
        normalized: &NormalizedSeries,
        stage: &str,
    ) -> Result<(), EurError> {
        if series.len() != normalized.len() {
            return Err(EurError::LengthMismatch(series.len(), normalized.len()));
        }
        for i in 0..series.len() {
            let row = SeriesRow {
                well: series.well.clone(),
                stage: stage.to_string(),
                index: i,
                time: normalized.time[i],
                gas_rate: normalized.gas_rate[i],
                average_pressure: normalized.average_pressure[i],
                pseudo_time: series.tcadd[i],
                rate: series.qdd[i],
                integral: series.qddj[i],
                derivative: series.qddjd[i],
                cumulative: series.npdd[i],
                flags_json: flags_json(&series.flags[i])?,
            };
            self.write(row)?;
        }
        self.flush()
    }

    pub fn log_report(&mut self, report: &AnalysisReport) -> Result<(), EurError> {
        self.log_normalized(&report.normalized)?;
        self.log_dimensionless(&report.dimensionless, &report.normalized, "dimensionless")?;
        if let Some(refined) = &report.refined {
            self.log_dimensionless(refined, &report.normalized, "refined")?;
        }
        Ok(())
    }

    fn write(&mut self, row: SeriesRow) -> Result<(), EurError> {
        self.writer
            .serialize(row)
            .map_err(|e| EurError::CsvError(self.path.clone(), e))
    }

    fn flush(&mut self) -> Result<(), EurError> {
        self.writer
            .flush()
            .map_err(|e| EurError::FileIO(self.path.clone(), e))
    }
}

fn flags_json(flags: &PointFlags) -> Result<String, EurError> {
    Ok(serde_json::to_string(flags)?)
}

/// Reads back a file written by [`SeriesLogger`].
pub fn read_series_log(path: impl AsRef<Path>) -> Result<Vec<SeriesRow>, EurError> {
    let path = path.as_ref().display().to_string();
    let mut reader = csv::Reader::from_path(&path).map_err(|e| EurError::CsvError(path.clone(), e))?;
    reader
        .deserialize()
        .map(|row| row.map_err(|e| EurError::CsvError(path.clone(), e)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_rows_round_trip_through_csv() {
        let series = NormalizedSeries {
            well: "W7".to_string(),
            time: vec![0.0, 1.0],
            gas_rate: vec![1000.0, 900.0],
            drawdown: vec![1.0e6, 1.1e6],
            normalized_rate: vec![1.0e-3, 8.0e-4],
            average_pressure: vec![20.0e6, 19.9e6],
            tca: vec![0.0, 1.05],
            rate_integral: vec![0.0, 9.0e-4],
            rate_integral_derivative: vec![0.0, 1.0e-4],
            flags: vec![
                PointFlags::default(),
                PointFlags {
                    pvt_extrapolated: true,
                    ..PointFlags::default()
                },
            ],
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.csv");
        let mut logger = SeriesLogger::new(&path).unwrap();
        logger.log_normalized(&series).unwrap();
        drop(logger);

        let rows = read_series_log(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].well, "W7");
        assert_eq!(rows[1].stage, "normalized");
        assert_eq!(rows[1].pseudo_time, 1.05);
        assert!(rows[1].cumulative.is_nan());
        let flags: PointFlags = serde_json::from_str(&rows[1].flags_json).unwrap();
        assert!(flags.pvt_extrapolated);
    }

    #[test]
    fn unwritable_path_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("series.csv");
        assert!(matches!(SeriesLogger::new(&path), Err(EurError::CsvError(..))));
    }
}
