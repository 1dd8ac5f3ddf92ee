//! The fluid/heat/fog cellular automaton behind the ManiacLab object world.
//!
//! [`LabSim`] advances a double-buffered grid of [`LabCell`]s one step per
//! game tick on a worker pool, while the owning thread mutates the grid
//! between frames through stamp operations and reads it back through
//! per-cell accessors and stamp measurements.
//!
//! The concurrency discipline is ownership-based: `start_frame` moves the
//! buffer set into the frame job and `wait_for_frame` reclaims it, so any
//! attempt to touch a buffer while a frame is in flight panics instead of
//! racing.

#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cell;
mod kernel;
mod readback;
pub mod sim;

pub use cell::{CellInfo, LabCell, LabCellMeta, SimulationConfig};
pub use sim::LabSim;

use maniaclab_core::SimFloat;

/// Fraction of a pressure difference converted into flow per step.
pub const AIR_DIFFUSION_FACTOR: SimFloat = 0.5;

/// Momentum retention of existing flow (moving-average weight).
pub const AIR_FLOW_FACTOR: SimFloat = 0.8;

/// Strength of the buoyancy term on the vertical axis.
pub const CONVECTION_FACTOR: SimFloat = 1e-5;

/// Fraction of a temperature difference equalised per step.
pub const HEAT_DIFFUSION_FACTOR: SimFloat = 0.05;

/// Fraction of a fog-density difference equalised per step.
pub const FOG_DIFFUSION_FACTOR: SimFloat = 0.05;

/// Rows per unit of parallel work dispatch.
pub const ROWS_PER_BLOCK: usize = 10;
