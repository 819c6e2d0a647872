use serde::{Deserialize, Serialize};

/// A raw production row as it appears in a tabular export.
///
/// Every field is kept as text so that a malformed cell only invalidates its
/// own row; conversion and validation happen at ingestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductionRow {
    #[serde(default, alias = "Gas", alias = "well_id")]
    pub well: Option<String>,
    #[serde(default, alias = "Date", alias = "time", alias = "t")]
    pub date: Option<String>,
    #[serde(default, alias = "Qg", alias = "gas_rate")]
    pub qg: Option<String>,
    #[serde(default, alias = "Qw", alias = "water_rate")]
    pub qw: Option<String>,
    #[serde(default, alias = "Pwf", alias = "bottomhole_pressure")]
    pub pwf: Option<String>,
    #[serde(default, alias = "Gp", alias = "cumulative_gas")]
    pub gp: Option<String>,
}
