use crate::{method::MethodWeights, pvt::PressureUnit, reservoir::ReservoirParameters};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ParameterFile {
    pub schema_version: String,
    /// Unit of `pi` in this file.
    #[serde(default)]
    pub pressure_unit: PressureUnit,
    pub parameters: ReservoirParameters,
}

#[derive(Debug, Deserialize)]
pub struct WeightFile {
    pub schema_version: String,
    pub weights: MethodWeights,
}
