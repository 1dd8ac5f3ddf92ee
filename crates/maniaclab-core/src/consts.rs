//! Engine constants.
//!
//! These are compile-time properties of the engine, not configuration:
//! the stamp geometry, the nominal tick length, explosion timings, and
//! the defaults for unblocked physics cells.

use crate::types::{CoordInt, SimFloat, TickCounter};

/// Physics cells per game cell along each axis.
pub const SUBDIVISION_COUNT: CoordInt = 5;

/// Half of [`SUBDIVISION_COUNT`], rounded down.
pub const HALF_OFFSET: CoordInt = 2;

/// Number of cells in one stamp (`SUBDIVISION_COUNT²`).
pub const CELL_STAMP_LENGTH: usize = (SUBDIVISION_COUNT * SUBDIVISION_COUNT) as usize;

/// Heat capacity of air per unit of pressure.
pub const AIRTEMP_COEFF_PER_PRESSURE: SimFloat = 1.0;

/// Default game grid width.
pub const LEVEL_WIDTH: CoordInt = 52;

/// Default game grid height.
pub const LEVEL_HEIGHT: CoordInt = 52;

/// Ticks between scheduling an explosion and it igniting its cell.
pub const EXPLOSION_TRIGGER_TIMEOUT: TickCounter = 50;

/// Ticks an explosion block stays alive once ignited.
pub const EXPLOSION_BLOCK_LIFETIME: TickCounter = 150;

/// Heat energy (scaled by the cell's heat capacity) a fire particle
/// deposits into the cell it occupies, per update.
pub const FIRE_PARTICLE_TEMPERATURE_RISE: SimFloat = 1.0;

/// Offset between the Kelvin and Celsius scales.
pub const KELVIN_TO_CELSIUS: SimFloat = 273.15;

/// Default temperature of unblocked cells (25 °C).
pub const DEFAULT_TEMPERATURE: SimFloat = KELVIN_TO_CELSIUS + 25.0;

/// Default air pressure of unblocked cells.
pub const DEFAULT_PRESSURE: SimFloat = 1.0;

/// Nominal wall-clock duration of one tick, in seconds.
pub const TIME_SLICE: f64 = 0.004;
