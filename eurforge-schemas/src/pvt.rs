use serde::{Deserialize, Serialize};

/// One sample of a gas PVT table.
///
/// Column headers of the exported laboratory tables (`p（MPa）`, `μg（Pa·s）`,
/// `Z（-）`, `Ct（MPa^-1）`) are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PvtRow {
    #[serde(alias = "p", alias = "p（MPa）", alias = "p(MPa)")]
    pub pressure: f64,
    #[serde(alias = "mu_g", alias = "μg", alias = "μg（Pa·s）", alias = "μg(Pa·s)")]
    pub viscosity: f64,
    #[serde(alias = "z", alias = "Z", alias = "Z（-）", alias = "Z(-)")]
    pub z_factor: f64,
    #[serde(alias = "ct", alias = "Ct", alias = "Ct（MPa^-1）", alias = "Ct(MPa^-1)")]
    pub compressibility: f64,
}

/// Unit in which pressures are written in an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureUnit {
    #[default]
    #[serde(alias = "Pa")]
    Pa,
    #[serde(alias = "MPa")]
    Mpa,
}

impl PressureUnit {
    pub fn to_pascal(self, value: f64) -> f64 {
        match self {
            PressureUnit::Pa => value,
            PressureUnit::Mpa => value * 1.0e6,
        }
    }
}
