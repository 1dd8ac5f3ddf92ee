//! Physics cell state and metadata.

use maniaclab_core::consts::{AIRTEMP_COEFF_PER_PRESSURE, DEFAULT_TEMPERATURE};
use maniaclab_core::{CoordPair, ObjectId, SimFloat};

/// State of one physics cell.
///
/// All quantities are non-negative in steady state. `heat_capacity` is a
/// cache: for unblocked cells it equals
/// `air_pressure · AIRTEMP_COEFF_PER_PRESSURE` and must be refreshed on
/// every write that changes the pressure; for blocked cells it holds the
/// owning object's temperature coefficient.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LabCell {
    /// Amount of air in the cell.
    pub air_pressure: SimFloat,
    /// Heat energy; temperature is `heat_energy / heat_capacity`.
    pub heat_energy: SimFloat,
    /// Fog density, kept within `[0, 1]` by the stamp operations.
    pub fog_density: SimFloat,
    /// Pressure-driven flux along the X and Y axes.
    pub flow: [SimFloat; 2],
    /// Cached heat capacity (see type-level docs).
    pub heat_capacity: SimFloat,
}

impl LabCell {
    /// A cell holding air at the given pressure, temperature, and fog
    /// density, with no flow.
    pub fn with_air(pressure: SimFloat, temperature: SimFloat, fog_density: SimFloat) -> Self {
        let heat_capacity = AIRTEMP_COEFF_PER_PRESSURE * pressure;
        Self {
            air_pressure: pressure,
            heat_energy: temperature * heat_capacity,
            fog_density,
            flow: [0.0, 0.0],
            heat_capacity,
        }
    }

    /// Recompute the heat-capacity cache of an unblocked cell after a
    /// pressure write.
    pub fn refresh_heat_capacity(&mut self) {
        self.heat_capacity = AIRTEMP_COEFF_PER_PRESSURE * self.air_pressure;
    }

    /// Current temperature, or 0 for a cell with no heat capacity.
    pub fn temperature(&self) -> SimFloat {
        if self.heat_capacity < 1e-17 {
            0.0
        } else {
            self.heat_energy / self.heat_capacity
        }
    }
}

/// Metadata of one physics cell.
///
/// Invariant: `blocked == owner.is_some()`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LabCellMeta {
    /// Whether the cell is covered by an object's blocking stamp cell.
    pub blocked: bool,
    /// The object blocking this cell, if any.
    pub owner: Option<ObjectId>,
}

/// Initial values for unblocked cells.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Air pressure cells start with.
    pub initial_air_pressure: SimFloat,
    /// Temperature cells start with.
    pub initial_temperature: SimFloat,
    /// Fog density cells start with.
    pub initial_fog_density: SimFloat,
    /// Whether fog equalises between cells on its own, in addition to
    /// travelling with bulk air flow.
    pub fog_diffusion: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_air_pressure: 1.0,
            initial_temperature: DEFAULT_TEMPERATURE,
            initial_fog_density: 0.0,
            fog_diffusion: false,
        }
    }
}

/// Per-cell payload of a stamp placement: the footprint offset plus the
/// physics state and metadata to write there.
#[derive(Clone, Copy, Debug, Default)]
pub struct CellInfo {
    /// Offset within the stamp footprint.
    pub offs: CoordPair,
    /// Cell state to install.
    pub phys: LabCell,
    /// Metadata to install.
    pub meta: LabCellMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_air_links_energy_to_capacity() {
        let cell = LabCell::with_air(2.0, 300.0, 0.0);
        assert_eq!(cell.heat_capacity, 2.0);
        assert_eq!(cell.heat_energy, 600.0);
        assert!((cell.temperature() - 300.0).abs() < 1e-3);
    }

    #[test]
    fn temperature_of_empty_cell_is_zero() {
        assert_eq!(LabCell::default().temperature(), 0.0);
    }

    #[test]
    fn refresh_tracks_pressure() {
        let mut cell = LabCell::with_air(1.0, 300.0, 0.0);
        cell.air_pressure = 4.0;
        cell.refresh_heat_capacity();
        assert_eq!(cell.heat_capacity, 4.0);
    }
}
