//! Fog emitters.

use std::sync::LazyLock;

use maniaclab_core::{CellStamp, ObjectId, SimFloat, Stamp};

use crate::level::Level;
use crate::object::{GameObject, ObjectInfo};
use crate::objects::ObjectKind;

static FOG_INFO: LazyLock<ObjectInfo> = LazyLock::new(|| ObjectInfo {
    is_blocking: true,
    is_destructible: false,
    is_collectable: false,
    is_gravity_affected: false,
    is_movable: false,
    is_round: false,
    is_sticky: false,
    roll_radius: 0.0,
    stamp: Stamp::new(&CellStamp::from_blocking([
        false, false, false, false, false, //
        false, false, true, false, false, //
        false, true, true, true, false, //
        false, false, true, false, false, //
        false, false, false, false, false,
    ])),
});

// A sparse diamond ring around the emitter body.
static FOG_EFFECT_STAMP: LazyLock<Stamp> = LazyLock::new(|| {
    Stamp::new(&CellStamp::from_blocking([
        false, false, true, false, false, //
        false, true, false, true, false, //
        true, false, false, false, true, //
        false, true, false, true, false, //
        false, false, true, false, false,
    ]))
});

static FOG_TEMPERATURE_STAMP: LazyLock<Stamp> = LazyLock::new(|| {
    Stamp::new(&CellStamp::from_blocking([
        false, false, true, false, false, //
        false, true, true, true, false, //
        true, true, true, true, true, //
        false, true, true, true, false, //
        false, false, true, false, false,
    ]))
});

/// Emission configuration of a fog emitter.
#[derive(Clone, Copy, Debug)]
pub struct FogState {
    /// Fog density added around the emitter per tick.
    pub intensity: SimFloat,
    /// Temperature applied around the emitter per tick.
    pub temperature: SimFloat,
}

/// A fog emitter ready for placement.
pub fn fog_emitter(intensity: SimFloat, temperature: SimFloat) -> GameObject {
    GameObject::new(
        &FOG_INFO,
        ObjectKind::FogEmitter(FogState {
            intensity,
            temperature,
        }),
        2.0,
    )
}

impl Level {
    /// Emit fog and temper the surrounding air.
    pub(crate) fn fog_tick(&mut self, id: ObjectId) {
        let Some(obj) = self.objects.get(id) else {
            return;
        };
        let ObjectKind::FogEmitter(state) = &obj.kind else {
            return;
        };
        let state = *state;
        let phy = obj.phy;

        self.physics
            .apply_fog_effect_stamp(phy.x, phy.y, &FOG_EFFECT_STAMP, state.intensity);
        self.physics
            .apply_temperature_stamp(phy.x, phy.y, &FOG_TEMPERATURE_STAMP, state.temperature);
    }
}
