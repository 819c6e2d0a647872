use serde::{Deserialize, Serialize};

/// Reservoir and well parameters for a single analysis run.
///
/// Serialized with the conventional petroleum-engineering keys (`μgi`, `Zi`,
/// `pi`, ...). ASCII aliases are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReservoirParameters {
    /// Gas viscosity at initial pressure.
    #[serde(rename = "μgi", alias = "mu_gi")]
    pub mu_gi: f64,
    /// Z-factor at initial pressure.
    #[serde(rename = "Zi", alias = "z_i")]
    pub z_i: f64,
    /// Initial reservoir pressure.
    #[serde(rename = "pi", alias = "p_i")]
    pub p_i: f64,
    /// Total compressibility at initial pressure, MPa⁻¹.
    #[serde(rename = "Cti", alias = "ct_i")]
    pub ct_i: f64,
    /// Original gas in place.
    #[serde(rename = "G", alias = "gas_in_place")]
    pub gas_in_place: f64,
    #[serde(rename = "K", alias = "permeability")]
    pub permeability: f64,
    #[serde(rename = "Φ", alias = "porosity", alias = "phi")]
    pub porosity: f64,
    /// Reservoir temperature, K.
    #[serde(rename = "Ti", alias = "temperature")]
    pub temperature: f64,
    /// Net pay thickness.
    #[serde(rename = "h", alias = "thickness")]
    pub thickness: f64,
    #[serde(default)]
    pub skin: f64,
    #[serde(rename = "r_w", alias = "wellbore_radius", default)]
    pub wellbore_radius: Option<f64>,
    #[serde(rename = "S_water", alias = "water_saturation", default)]
    pub water_saturation: Option<f64>,
}
