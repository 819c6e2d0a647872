pub mod aggregate;
pub mod analysis;
pub mod constants;
pub mod decline;
pub mod dimensionless;
pub mod error;
pub mod logger;
pub mod normalization;
pub mod pipeline;
pub mod production;
pub mod pseudo_time;
pub mod pvt;
pub mod series;
pub mod transform;
pub mod type_curves;
