//! Per-well decline analysis: builder, engine and report.

pub mod builder;
pub mod engine;
pub mod options;
pub mod report;

pub use self::{
    builder::{validate_parameters, AnalysisBuilder},
    engine::AnalysisEngine,
    options::AnalysisOptions,
    report::{AnalysisReport, MethodFailure},
};
