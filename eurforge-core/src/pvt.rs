use crate::error::EurError;
use eurforge_schemas::pvt::{PressureUnit, PvtRow};

/// Gas properties at a single pressure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PvtProperties {
    pub viscosity: f64,
    pub z_factor: f64,
    /// Total compressibility, MPa⁻¹.
    pub compressibility: f64,
}

/// Result of a table query. `extrapolated` is set when the pressure lies
/// outside the sampled range and the boundary segment was extended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PvtLookup {
    pub properties: PvtProperties,
    pub extrapolated: bool,
}

/// Immutable, strictly pressure-ordered PVT table with piecewise-linear
/// interpolation. Pressures are stored in pascals.
#[derive(Debug, Clone)]
pub struct PvtTable {
    pressure: Vec<f64>,
    viscosity: Vec<f64>,
    z_factor: Vec<f64>,
    compressibility: Vec<f64>,
}

impl PvtTable {
    /// Builds a table from rows whose pressure is already in pascals.
    ///
    /// # Errors
    ///
    /// `InvalidPvtTable` when fewer than two rows are given, a value is not
    /// finite, or pressure is not strictly increasing.
    pub fn new(rows: Vec<PvtRow>) -> Result<Self, EurError> {
        Self::from_rows_in(rows, PressureUnit::Pa)
    }

    /// Builds a table from rows whose pressure column is in `unit`.
    pub fn from_rows_in(rows: Vec<PvtRow>, unit: PressureUnit) -> Result<Self, EurError> {
        if rows.len() < 2 {
            return Err(EurError::InvalidPvtTable(format!(
                "at least 2 rows are required, got {}",
                rows.len()
            )));
        }

        let mut table = PvtTable {
            pressure: Vec::with_capacity(rows.len()),
            viscosity: Vec::with_capacity(rows.len()),
            z_factor: Vec::with_capacity(rows.len()),
            compressibility: Vec::with_capacity(rows.len()),
        };

        for (i, row) in rows.iter().enumerate() {
            let pressure = unit.to_pascal(row.pressure);
            let values = [pressure, row.viscosity, row.z_factor, row.compressibility];
            if values.iter().any(|v| !v.is_finite()) {
                return Err(EurError::InvalidPvtTable(format!("row {} contains a non-finite value", i)));
            }
            if let Some(&previous) = table.pressure.last() {
                if pressure <= previous {
                    return Err(EurError::InvalidPvtTable(format!(
                        "pressure must be strictly increasing (row {}: {} after {})",
                        i, pressure, previous
                    )));
                }
            }
            table.pressure.push(pressure);
            table.viscosity.push(row.viscosity);
            table.z_factor.push(row.z_factor);
            table.compressibility.push(row.compressibility);
        }

        Ok(table)
    }

    pub fn lookup(&self, pressure: f64) -> PvtLookup {
        let i = self.segment(pressure);
        let (p0, p1) = (self.pressure[i], self.pressure[i + 1]);
        PvtLookup {
            properties: PvtProperties {
                viscosity: lerp(p0, p1, self.viscosity[i], self.viscosity[i + 1], pressure),
                z_factor: lerp(p0, p1, self.z_factor[i], self.z_factor[i + 1], pressure),
                compressibility: lerp(
                    p0,
                    p1,
                    self.compressibility[i],
                    self.compressibility[i + 1],
                    pressure,
                ),
            },
            extrapolated: !self.contains(pressure),
        }
    }

    pub fn viscosity(&self, pressure: f64) -> f64 {
        self.lookup(pressure).properties.viscosity
    }

    pub fn z_factor(&self, pressure: f64) -> f64 {
        self.lookup(pressure).properties.z_factor
    }

    pub fn contains(&self, pressure: f64) -> bool {
        let (min, max) = self.pressure_range();
        pressure >= min && pressure <= max
    }

    pub fn pressure_range(&self) -> (f64, f64) {
        (self.pressure[0], self.pressure[self.pressure.len() - 1])
    }

    pub fn pressures(&self) -> &[f64] {
        &self.pressure
    }

    pub fn len(&self) -> usize {
        self.pressure.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pressure.is_empty()
    }

    /// Index of the segment `[i, i + 1]` used for `pressure`, clamped to the
    /// boundary segments.
    fn segment(&self, pressure: f64) -> usize {
        let above = self.pressure.partition_point(|&p| p <= pressure);
        above.saturating_sub(1).min(self.pressure.len() - 2)
    }
}

fn lerp(x0: f64, x1: f64, y0: f64, y1: f64, x: f64) -> f64 {
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}
