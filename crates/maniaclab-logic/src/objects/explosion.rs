//! Explosion blocks.
//!
//! An explosion block occupies a cell without a physics footprint. On
//! its first tick it stamps pressure and temperature over a rounded
//! area; every tick it pushes flow outwards in all four directions,
//! fading with a cosine over its lifetime; after
//! `EXPLOSION_BLOCK_LIFETIME` ticks it removes itself.

use std::sync::LazyLock;

use maniaclab_core::consts::EXPLOSION_BLOCK_LIFETIME;
use maniaclab_core::{CellStamp, ObjectId, SimFloat, Stamp, TickCounter};

use crate::level::Level;
use crate::object::{GameObject, ObjectInfo};
use crate::objects::ObjectKind;

const EXPLOSION_PRESSURE: SimFloat = 1.5;
const EXPLOSION_TEMPERATURE: SimFloat = 1000.0;
const EXPLOSION_FLOW_INTENSITY: SimFloat = 10.0;

static EXPLOSION_INFO: LazyLock<ObjectInfo> = LazyLock::new(|| ObjectInfo {
    is_blocking: true,
    is_destructible: false,
    is_collectable: false,
    is_gravity_affected: false,
    is_movable: false,
    is_round: false,
    is_sticky: false,
    roll_radius: 0.5,
    // No physics footprint; the burst acts through effect stamps.
    stamp: Stamp::new(&CellStamp::from_blocking([false; 25])),
});

static SPAWN_STAMP: LazyLock<Stamp> = LazyLock::new(|| {
    Stamp::new(&CellStamp::from_blocking([
        false, true, true, true, false, //
        true, true, true, true, true, //
        true, true, true, true, true, //
        true, true, true, true, true, //
        false, true, true, true, false,
    ]))
});

/// Directional flow stamps: a strip on each footprint edge pushing
/// outwards.
static FLOW_STAMPS: LazyLock<[(Stamp, [SimFloat; 2]); 4]> = LazyLock::new(|| {
    let top = CellStamp::from_blocking([
        false, true, true, true, false, //
        false, false, false, false, false, //
        false, false, false, false, false, //
        false, false, false, false, false, //
        false, false, false, false, false,
    ]);
    let left = CellStamp::from_blocking([
        false, false, false, false, false, //
        true, false, false, false, false, //
        true, false, false, false, false, //
        true, false, false, false, false, //
        false, false, false, false, false,
    ]);
    let right = CellStamp::from_blocking([
        false, false, false, false, false, //
        false, false, false, false, true, //
        false, false, false, false, true, //
        false, false, false, false, true, //
        false, false, false, false, false,
    ]);
    let bottom = CellStamp::from_blocking([
        false, false, false, false, false, //
        false, false, false, false, false, //
        false, false, false, false, false, //
        false, false, false, false, false, //
        false, true, true, true, false,
    ]);
    [
        (Stamp::new(&top), [0.0, -1.0]),
        (Stamp::new(&left), [-1.0, 0.0]),
        (Stamp::new(&right), [1.0, 0.0]),
        (Stamp::new(&bottom), [0.0, 1.0]),
    ]
});

/// Per-block state of an explosion.
#[derive(Clone, Copy, Debug)]
pub struct ExplosionState {
    /// Tick at which the block removes itself.
    pub die_at: TickCounter,
    /// Ticks lived, driving the flow fade.
    pub ctr: u32,
}

/// An explosion block ready for placement; `now` is the current tick.
pub fn explosion_object(now: TickCounter) -> GameObject {
    GameObject::new(
        &EXPLOSION_INFO,
        ObjectKind::Explosion(ExplosionState {
            die_at: now + EXPLOSION_BLOCK_LIFETIME,
            ctr: 0,
        }),
        1.0,
    )
}

impl Level {
    /// Per-tick explosion effects: initial pressure and heat burst,
    /// then fading outward flow, then self-destruction.
    pub(crate) fn explosion_tick(&mut self, id: ObjectId) {
        let Some(obj) = self.objects.get(id) else {
            return;
        };
        let ObjectKind::Explosion(state) = &obj.kind else {
            return;
        };
        let phy = obj.phy;
        let ctr = state.ctr;
        let die_at = state.die_at;
        let last_update = obj.ticks;

        if ctr == 0 {
            self.physics
                .apply_pressure_stamp(phy.x, phy.y, &SPAWN_STAMP, EXPLOSION_PRESSURE);
            self.physics
                .apply_temperature_stamp(phy.x, phy.y, &SPAWN_STAMP, EXPLOSION_TEMPERATURE);
        }

        let rel_time = ctr as f32 / EXPLOSION_BLOCK_LIFETIME as f32;
        let cos_factor = (rel_time * std::f32::consts::FRAC_PI_2).cos();
        for (stamp, dir) in FLOW_STAMPS.iter() {
            let flow = [
                dir[0] * cos_factor * EXPLOSION_FLOW_INTENSITY,
                dir[1] * cos_factor * EXPLOSION_FLOW_INTENSITY,
            ];
            self.physics.apply_flow_stamp(phy.x, phy.y, stamp, flow, 1.0);
        }

        if let Some(obj) = self.objects.get_mut(id) {
            if let ObjectKind::Explosion(state) = &mut obj.kind {
                state.ctr += 1;
            }
        }

        if last_update >= die_at {
            self.destruct_object(id);
        }
    }
}
