//! The tile-based object world driving the ManiacLab fluid automaton.
//!
//! A [`Level`] owns a game-sized grid of [`LevelCell`]s, the embedded
//! physics automaton, a particle system, and a tick-keyed timer queue.
//! Game objects live in a generational arena and are referenced by
//! handle from cells, reservations, physics metadata, and timers; the
//! `here` slot of exactly one cell is the owning reference of each
//! object.
//!
//! `Level::update` advances the world one tick: it waits for the
//! previous simulation frame, drains due timers, updates every resident
//! object bottom-to-top, steps the particles, and launches the next
//! simulation frame.

#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod level;
pub mod movement;
pub mod object;
pub mod objects;
pub mod particles;
pub mod sensor;
pub mod timer;

pub use level::{Level, LevelCell};
pub use movement::{Movement, ROLL_HALF_DURATION_TICKS, STRAIGHT_DURATION_TICKS};
pub use object::{FrameState, GameObject, MoveDirection, ObjectInfo};
pub use objects::ObjectKind;
pub use particles::{Particle, ParticleSystem, ParticleType};
pub use sensor::{MeasurementSensor, Sensor, Trigger};
pub use timer::Timer;
