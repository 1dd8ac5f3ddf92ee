//! Fans blowing air through a slit in their housing.

use std::sync::LazyLock;

use rand::Rng;

use maniaclab_core::{CellStamp, ObjectId, SimFloat, Stamp};

use crate::level::Level;
use crate::object::{GameObject, ObjectInfo};
use crate::objects::ObjectKind;

static HORIZ_FAN_INFO: LazyLock<ObjectInfo> = LazyLock::new(|| ObjectInfo {
    is_blocking: true,
    is_destructible: false,
    is_collectable: false,
    is_gravity_affected: false,
    is_movable: false,
    is_round: false,
    is_sticky: false,
    roll_radius: 0.0,
    stamp: Stamp::new(&CellStamp::from_blocking([
        false, true, true, true, false, //
        false, false, false, false, false, //
        false, false, false, false, false, //
        false, false, false, false, false, //
        false, true, true, true, false,
    ])),
});

static VERT_FAN_INFO: LazyLock<ObjectInfo> = LazyLock::new(|| ObjectInfo {
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
        true, false, false, false, true, //
        true, false, false, false, true, //
        true, false, false, false, true, //
        false, false, false, false, false,
    ])),
});

static HORIZ_FAN_EFFECT_STAMP: LazyLock<Stamp> = LazyLock::new(|| {
    Stamp::new(&CellStamp::from_blocking([
        false, false, false, false, false, //
        false, false, true, false, false, //
        false, false, true, false, false, //
        false, false, true, false, false, //
        false, false, false, false, false,
    ]))
});

static VERT_FAN_EFFECT_STAMP: LazyLock<Stamp> = LazyLock::new(|| {
    Stamp::new(&CellStamp::from_blocking([
        false, false, false, false, false, //
        false, false, false, false, false, //
        false, true, true, true, false, //
        false, false, false, false, false, //
        false, false, false, false, false,
    ]))
});

/// Blowing configuration of a fan.
#[derive(Clone, Copy, Debug)]
pub struct FanState {
    /// Flow magnitude applied to the effect cells.
    pub intensity: SimFloat,
    /// Angular turbulence magnitude; 0 blows perfectly straight.
    pub turbulence_magnitude: SimFloat,
    /// Base angle of the flow direction.
    pub turbulence_offset: SimFloat,
}

/// A horizontal fan ready for placement.
pub fn horiz_fan(intensity: SimFloat, turbulence: SimFloat) -> GameObject {
    GameObject::new(
        &HORIZ_FAN_INFO,
        ObjectKind::HorizFan(FanState {
            intensity,
            turbulence_magnitude: turbulence,
            turbulence_offset: 0.0,
        }),
        2.0,
    )
}

/// A vertical fan ready for placement.
pub fn vert_fan(intensity: SimFloat, turbulence: SimFloat) -> GameObject {
    GameObject::new(
        &VERT_FAN_INFO,
        ObjectKind::VertFan(FanState {
            intensity,
            turbulence_magnitude: turbulence,
            turbulence_offset: std::f32::consts::FRAC_PI_2,
        }),
        2.0,
    )
}

impl Level {
    /// Blend the effect cells' flow towards the fan direction,
    /// deviated by the per-tick turbulence sample.
    pub(crate) fn fan_tick(&mut self, id: ObjectId) {
        let Some(obj) = self.objects.get(id) else {
            return;
        };
        let (state, effect_stamp) = match &obj.kind {
            ObjectKind::HorizFan(state) => (*state, &*HORIZ_FAN_EFFECT_STAMP),
            ObjectKind::VertFan(state) => (*state, &*VERT_FAN_EFFECT_STAMP),
            _ => return,
        };
        let phy = obj.phy;

        let deviation = if state.turbulence_magnitude > 1e-6 {
            let swing = state.turbulence_magnitude * std::f32::consts::FRAC_PI_4;
            self.rng.gen_range(-swing..swing)
        } else {
            0.0
        } + state.turbulence_offset;

        let dir = [
            state.intensity * deviation.cos(),
            state.intensity * deviation.sin(),
        ];
        self.physics
            .apply_flow_stamp(phy.x, phy.y, effect_stamp, dir, 0.2);
    }
}
