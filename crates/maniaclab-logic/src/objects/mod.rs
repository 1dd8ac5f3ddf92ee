//! The built-in object kinds and their behaviours.
//!
//! Each kind module defines its stamps, its `ObjectInfo`, a
//! constructor returning a ready-to-place [`GameObject`], and the
//! kind-specific per-tick logic as `Level` methods.
//!
//! [`GameObject`]: crate::object::GameObject

pub mod bomb;
pub mod explosion;
pub mod fan;
pub mod fog;
pub mod player;
pub mod rock;
pub mod wall;

pub use bomb::bomb;
pub use explosion::ExplosionState;
pub use fan::{horiz_fan, vert_fan, FanState};
pub use fog::{fog_emitter, FogState};
pub use player::{player, ActionRequest, PlayerController};
pub use rock::rock;
pub use wall::{round_safe_wall, safe_wall, WallState};

use maniaclab_core::SimFloat;

/// Heat capacity of stone objects.
pub const HEAT_CAPACITY_STONE: SimFloat = 8.0;

/// Heat capacity of metal objects.
pub const HEAT_CAPACITY_METAL: SimFloat = 2.0;

/// Kind tag of a game object, carrying per-kind mutable state.
#[derive(Clone, Debug)]
pub enum ObjectKind {
    /// Indestructible square wall, optionally heating its surroundings.
    SquareSafeWall(WallState),
    /// Indestructible round wall; things roll off it.
    RoundSafeWall(WallState),
    /// A round, movable, falling rock.
    Rock,
    /// Explodes on impact, headache, explosion touch, or overheating.
    Bomb,
    /// The player avatar.
    Player(PlayerController),
    /// A transient explosion block stamping pressure, heat, and flow.
    Explosion(ExplosionState),
    /// Fan blowing horizontally.
    HorizFan(FanState),
    /// Fan blowing vertically.
    VertFan(FanState),
    /// Emits fog and tempers the air around it.
    FogEmitter(FogState),
}
