//! Physical constants and numerical defaults shared by the analysis stages.

/// Standard-condition pressure, MPa.
pub const P_SC_MPA: f64 = 0.101325;
/// Standard-condition temperature, K.
pub const T_SC_K: f64 = 293.15;

pub const PA_PER_MPA: f64 = 1.0e6;
/// Converts a compressibility in MPa⁻¹ to Pa⁻¹.
pub const PER_MPA_TO_PER_PA: f64 = 1.0e-6;

/// Rate used in place of an exact zero when dividing by the gas rate.
pub const ZERO_RATE_EPSILON: f64 = 1.0e-10;

/// Initial pressures above this (MPa) use the high-pressure Fetkovich forms.
pub const HIGH_PRESSURE_THRESHOLD_MPA: f64 = 25.0;
/// Initial pressures below this (MPa) use the low-pressure Fetkovich forms.
pub const LOW_PRESSURE_THRESHOLD_MPA: f64 = 13.0;

pub const DEFAULT_QUADRATURE_POINTS: usize = 1000;
pub const MIN_QUADRATURE_POINTS: usize = 500;

pub const DEFAULT_BISECTION_MAX_ITERATIONS: usize = 200;
/// Absolute pressure tolerance for the p/Z inversion, Pa.
pub const DEFAULT_BISECTION_TOLERANCE_PA: f64 = 1.0e-3;

/// Darcy-unit conversion for dimensionless time.
pub const DIMENSIONLESS_TIME_FACTOR: f64 = 0.0864;
/// Darcy-unit conversion for radial-flow rate groups.
pub const RADIAL_FLOW_FACTOR: f64 = 1.842e4;
