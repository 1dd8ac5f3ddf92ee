//! Bombs: explode on impact, on headache, on explosion touch, or when
//! their average temperature passes the threshold.

use std::sync::LazyLock;

use maniaclab_core::{CellStamp, ObjectId, SimFloat, Stamp};

use crate::level::Level;
use crate::object::{GameObject, ObjectInfo};
use crate::objects::{ObjectKind, HEAT_CAPACITY_METAL};

/// Average stamp temperature above which a bomb self-ignites.
pub(crate) const TEMPERATURE_THRESHOLD: SimFloat = 390.0;

static BOMB_INFO: LazyLock<ObjectInfo> = LazyLock::new(|| ObjectInfo {
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

/// A bomb ready for placement.
pub fn bomb() -> GameObject {
    GameObject::new(&BOMB_INFO, ObjectKind::Bomb, HEAT_CAPACITY_METAL)
}

impl Level {
    /// Detonate the bomb: a 3×3 explosion around its cell, then
    /// self-destruction.
    pub(crate) fn bomb_explode(&mut self, id: ObjectId) {
        let Some(obj) = self.objects.get(id) else {
            return;
        };
        let cell = obj.cell;
        self.add_large_explosion(cell.x, cell.y, 1, 1);
        self.destruct_object(id);
    }
}
