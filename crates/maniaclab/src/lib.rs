//! ManiacLab: a coupled fluid cellular automaton and tile object world.
//!
//! This is the facade crate re-exporting the public API of the engine
//! sub-crates. For most users, depending on `maniaclab` alone is
//! sufficient.
//!
//! # Quick start
//!
//! ```
//! use maniaclab::prelude::*;
//! use maniaclab::logic::objects::rock;
//!
//! // A 10×10 level with a rock dropped near the top.
//! let mut level = Level::with_seed(10, 10, 42);
//! let id = level.place_object(rock(), 5, 0, 300.0);
//!
//! // One full straight movement later the rock has fallen one cell
//! // (and is already falling further).
//! for _ in 0..=STRAIGHT_DURATION_TICKS {
//!     level.update();
//! }
//! let obj = level.objects().get(id).unwrap();
//! assert_eq!(obj.y, 1.0);
//! assert_eq!(level.get_physics_coords(obj.x, obj.y), CoordPair::new(25, 5));
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`core`] | `maniaclab-core` | Coordinates, constants, stamps, object handles |
//! | [`sim`] | `maniaclab-sim` | The fluid/heat/fog automaton |
//! | [`logic`] | `maniaclab-logic` | Level, objects, movements, particles, sensors |

#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub use maniaclab_core as core;
pub use maniaclab_logic as logic;
pub use maniaclab_sim as sim;

/// The commonly needed names in one import.
pub mod prelude {
    pub use maniaclab_core::consts::{
        EXPLOSION_BLOCK_LIFETIME, EXPLOSION_TRIGGER_TIMEOUT, SUBDIVISION_COUNT, TIME_SLICE,
    };
    pub use maniaclab_core::{
        CellStamp, CoordInt, CoordPair, ObjectId, SimFloat, Stamp, TickCounter,
    };
    pub use maniaclab_logic::{
        FrameState, GameObject, Level, LevelCell, MeasurementSensor, MoveDirection, Movement,
        ObjectInfo, ObjectKind, ParticleSystem, Sensor, Trigger, ROLL_HALF_DURATION_TICKS,
        STRAIGHT_DURATION_TICKS,
    };
    pub use maniaclab_sim::{LabCell, LabCellMeta, LabSim, SimulationConfig};
}
