//! Rocks: round, movable, gravity-affected, destructible.

use std::sync::LazyLock;

use maniaclab_core::{CellStamp, Stamp};

use crate::object::{GameObject, ObjectInfo};
use crate::objects::ObjectKind;

static ROCK_INFO: LazyLock<ObjectInfo> = LazyLock::new(|| ObjectInfo {
    is_blocking: true,
    is_destructible: true,
    is_collectable: false,
    is_gravity_affected: true,
    is_movable: true,
    is_round: true,
    is_sticky: false,
    roll_radius: 0.5,
    stamp: Stamp::new(&CellStamp::from_blocking([
        false, true, true, true, false, //
        true, true, true, true, true, //
        true, true, true, true, true, //
        true, true, true, true, true, //
        false, true, true, true, false,
    ])),
});

/// A rock ready for placement.
pub fn rock() -> GameObject {
    GameObject::new(&ROCK_INFO, ObjectKind::Rock, 1.0)
}
