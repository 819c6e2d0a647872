//! Validated production history and ingestion of raw tabular rows.

use crate::error::EurError;
use chrono::{NaiveDate, NaiveDateTime};
use eurforge_schemas::{production::ProductionRow, pvt::PressureUnit};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

const SECONDS_PER_DAY: f64 = 86_400.0;
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// One validated production observation. Time is elapsed days from the
/// first observation of the well; pressure is in pascals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    pub time: f64,
    pub gas_rate: f64,
    pub water_rate: f64,
    pub bottomhole_pressure: f64,
    pub cumulative_gas: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductionRecord {
    well: String,
    observations: Vec<Observation>,
}

impl ProductionRecord {
    /// # Errors
    ///
    /// `EmptyProduction` for an empty history, `NonMonotonicTime` when time
    /// does not strictly increase, and `InvalidDomain` for negative rates,
    /// decreasing cumulative production or non-positive pressure.
    pub fn new(well: impl Into<String>, observations: Vec<Observation>) -> Result<Self, EurError> {
        let well = well.into();
        if observations.is_empty() {
            return Err(EurError::EmptyProduction(well));
        }

        for (row, obs) in observations.iter().enumerate() {
            let values = [obs.time, obs.gas_rate, obs.water_rate, obs.bottomhole_pressure, obs.cumulative_gas];
            if values.iter().any(|v| !v.is_finite()) {
                return Err(EurError::InvalidDomain(format!("observation {} has a non-finite value", row)));
            }
            if obs.gas_rate < 0.0 || obs.water_rate < 0.0 || obs.cumulative_gas < 0.0 {
                return Err(EurError::InvalidDomain(format!(
                    "observation {} has a negative rate or cumulative",
                    row
                )));
            }
            if obs.bottomhole_pressure <= 0.0 {
                return Err(EurError::InvalidDomain(format!(
                    "observation {} has non-positive bottomhole pressure",
                    row
                )));
            }
            if row > 0 {
                let previous = &observations[row - 1];
                if !(obs.time > previous.time) {
                    return Err(EurError::NonMonotonicTime { row });
                }
                if obs.cumulative_gas < previous.cumulative_gas {
                    return Err(EurError::InvalidDomain(format!(
                        "cumulative production decreases at observation {}",
                        row
                    )));
                }
            }
        }

        Ok(Self { well, observations })
    }

    pub fn well(&self) -> &str {
        &self.well
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.time).collect()
    }

    pub fn gas_rates(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.gas_rate).collect()
    }

    pub fn water_rates(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.water_rate).collect()
    }

    pub fn bottomhole_pressures(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.bottomhole_pressure).collect()
    }

    pub fn cumulative_gas(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.cumulative_gas).collect()
    }

    pub fn mean_bottomhole_pressure(&self) -> f64 {
        self.observations.iter().map(|o| o.bottomhole_pressure).sum::<f64>() / self.len() as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedRow {
    /// 1-based data row in the source table.
    pub row: usize,
    pub reason: String,
}

/// What happened to the rows of one well during ingestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub well: String,
    pub accepted: usize,
    pub dropped: Vec<DroppedRow>,
}

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub pressure_unit: PressureUnit,
    /// Well id used for rows that have none.
    pub default_well: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    pub records: Vec<ProductionRecord>,
    pub reports: Vec<IngestReport>,
}

struct ParsedRow {
    row: usize,
    observation: Observation,
}

/// Converts raw rows into one validated record per well, in order of first
/// appearance.
///
/// Rows with missing or malformed fields, negative rates, non-positive
/// pressure or a cumulative that decreases are dropped and reported.
///
/// # Errors
///
/// `NonMonotonicTime` when the accepted rows of a well are not strictly
/// increasing in time. This aborts ingestion.
pub fn ingest_rows(rows: &[ProductionRow], options: &IngestOptions) -> Result<IngestOutcome, EurError> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, (Vec<ParsedRow>, IngestReport)> = HashMap::new();

    for (index, raw) in rows.iter().enumerate() {
        let row = index + 1;
        let well = raw
            .well
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .or_else(|| options.default_well.clone())
            .unwrap_or_else(|| "unknown".to_string());

        let (parsed, report) = groups.entry(well.clone()).or_insert_with(|| {
            order.push(well.clone());
            (
                Vec::new(),
                IngestReport {
                    well: well.clone(),
                    ..IngestReport::default()
                },
            )
        });

        match parse_row(raw, row, options) {
            Ok(row) => parsed.push(row),
            Err(reason) => {
                debug!(well = %well, row, reason = %reason, "production row dropped");
                report.dropped.push(DroppedRow { row, reason });
            }
        }
    }

    let mut outcome = IngestOutcome::default();
    for well in order {
        let Some((parsed, mut report)) = groups.remove(&well) else {
            continue;
        };

        let mut observations: Vec<Observation> = Vec::with_capacity(parsed.len());
        let origin = parsed.first().map_or(0.0, |r| r.observation.time);
        let mut last_time: Option<f64> = None;

        for row in parsed {
            let time = row.observation.time;
            if let Some(previous) = last_time {
                if !(time > previous) {
                    warn!(well = %well, row = row.row, "production time is not strictly increasing");
                    return Err(EurError::NonMonotonicTime { row: row.row });
                }
            }
            last_time = Some(time);

            if let Some(previous) = observations.last() {
                if row.observation.cumulative_gas < previous.cumulative_gas {
                    report.dropped.push(DroppedRow {
                        row: row.row,
                        reason: "cumulative production decreased".to_string(),
                    });
                    continue;
                }
            }

            observations.push(Observation {
                time: time - origin,
                ..row.observation
            });
        }

        report.accepted = observations.len();
        if !report.dropped.is_empty() {
            warn!(well = %well, dropped = report.dropped.len(), "invalid production rows dropped");
        }
        info!(well = %well, accepted = report.accepted, "production history ingested");

        if !observations.is_empty() {
            outcome.records.push(ProductionRecord::new(well, observations)?);
        }
        outcome.reports.push(report);
    }

    Ok(outcome)
}

fn parse_row(raw: &ProductionRow, row: usize, options: &IngestOptions) -> Result<ParsedRow, String> {
    let time = parse_time(required(&raw.date, "date")?)?;
    let gas_rate = parse_number(&raw.qg, "gas rate")?;
    let water_rate = parse_number(&raw.qw, "water rate")?;
    let bottomhole_pressure = options
        .pressure_unit
        .to_pascal(parse_number(&raw.pwf, "bottomhole pressure")?);
    let cumulative_gas = parse_number(&raw.gp, "cumulative gas")?;

    if gas_rate < 0.0 || water_rate < 0.0 {
        return Err("negative rate".to_string());
    }
    if cumulative_gas < 0.0 {
        return Err("negative cumulative production".to_string());
    }
    if bottomhole_pressure <= 0.0 {
        return Err("non-positive bottomhole pressure".to_string());
    }

    Ok(ParsedRow {
        row,
        observation: Observation {
            time,
            gas_rate,
            water_rate,
            bottomhole_pressure,
            cumulative_gas,
        },
    })
}

fn required<'a>(field: &'a Option<String>, name: &str) -> Result<&'a str, String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("missing {}", name))
}

fn parse_number(field: &Option<String>, name: &str) -> Result<f64, String> {
    let text = required(field, name)?;
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(format!("invalid {} '{}'", name, text)),
    }
}

/// Parses a time cell into days: a bare number is taken as elapsed days,
/// anything else must be a calendar date or timestamp.
fn parse_time(text: &str) -> Result<f64, String> {
    if let Ok(days) = text.parse::<f64>() {
        return if days.is_finite() {
            Ok(days)
        } else {
            Err(format!("invalid time '{}'", text))
        };
    }

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| "calendar epoch unavailable".to_string())?;
    let to_days = |dt: NaiveDateTime| dt.signed_duration_since(epoch).num_seconds() as f64 / SECONDS_PER_DAY;

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(to_days(dt));
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(to_days(dt));
            }
        }
    }
    Err(format!("unrecognised date '{}'", text))
}
