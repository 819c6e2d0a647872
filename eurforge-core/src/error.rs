use eurforge_schemas::method::DeclineMethod;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EurError {
    #[error("Invalid PVT table: {0}")]
    InvalidPvtTable(String),

    #[error("Material-balance target p/Z = {target:.6e} is outside the PVT range [{min:.6e}, {max:.6e}]")]
    RootNotBracketed { target: f64, min: f64, max: f64 },

    #[error("Pseudopressure drawdown vanishes at p_wf = {p_wf:.6e}")]
    DivisionSingularity { p_wf: f64 },

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Decline fit did not converge: {0}")]
    FitDidNotConverge(String),

    #[error("No weight supplied for method '{0}'")]
    MissingWeight(DeclineMethod),

    #[error("Invalid reservoir parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Reservoir parameter '{0}' is required but was not supplied")]
    MissingParameter(&'static str),

    #[error("Production time is not strictly increasing at row {row}")]
    NonMonotonicTime { row: usize },

    #[error("Series lengths differ: {0} vs {1}")]
    LengthMismatch(usize, usize),

    #[error("Analysis input '{0}' was not provided")]
    NotConfigured(&'static str),

    #[error("No usable production records for well '{0}'")]
    EmptyProduction(String),

    #[error("I/O error for file '{0}': {1}")]
    FileIO(String, #[source] std::io::Error),

    #[error("Failed to process CSV file '{0}': {1}")]
    CsvError(String, #[source] csv::Error),

    #[error("Failed to serialize series data: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Optimizer failed: {0}")]
    Optimizer(#[from] anyhow::Error),
}

impl EurError {
    /// Whether the failure is confined to a single point or a single method.
    ///
    /// Structural failures (bad PVT table, unordered time, invalid parameters,
    /// I/O) abort a run; everything else is recorded and the run continues.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EurError::RootNotBracketed { .. }
                | EurError::DivisionSingularity { .. }
                | EurError::InvalidDomain(_)
                | EurError::FitDidNotConverge(_)
                | EurError::MissingWeight(_)
                | EurError::MissingParameter(_)
                | EurError::Optimizer(_)
        )
    }
}
