//! Core types and grid primitives for the ManiacLab engine.
//!
//! This is the leaf crate with no internal dependencies. It defines the
//! coordinate and tick primitives shared by the fluid automaton and the
//! object world, the engine constants, the generational object arena, and
//! the stamp types describing object footprints on the physics grid.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
pub mod consts;
pub mod stamp;
pub mod types;

// Re-export the most frequently used items at the crate root.
pub use arena::{ObjectArena, ObjectId};
pub use stamp::{CellKind, CellStamp, CellTemplate, SinkSource, Stamp};
pub use types::{CoordInt, CoordPair, SimFloat, TickCounter};
