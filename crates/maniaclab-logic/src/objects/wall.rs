//! Safe walls, square and round, with an optional heater.

use std::sync::LazyLock;

use maniaclab_core::{CellStamp, ObjectId, SimFloat, Stamp};

use crate::level::Level;
use crate::object::{GameObject, ObjectInfo};
use crate::objects::{ObjectKind, HEAT_CAPACITY_STONE};

static SQUARE_WALL_INFO: LazyLock<ObjectInfo> = LazyLock::new(|| ObjectInfo {
    is_blocking: true,
    is_destructible: false,
    is_collectable: false,
    is_gravity_affected: false,
    is_movable: false,
    is_round: false,
    is_sticky: true,
    roll_radius: 0.0,
    stamp: Stamp::new(&CellStamp::from_blocking([true; 25])),
});

static ROUND_WALL_INFO: LazyLock<ObjectInfo> = LazyLock::new(|| ObjectInfo {
    is_blocking: true,
    is_destructible: false,
    is_collectable: false,
    is_gravity_affected: false,
    is_movable: false,
    is_round: true,
    is_sticky: true,
    roll_radius: 0.5,
    stamp: Stamp::new(&CellStamp::from_blocking([
        false, true, true, true, false, //
        true, true, true, true, true, //
        true, true, true, true, true, //
        true, true, true, true, true, //
        false, true, true, true, false,
    ])),
});

// The plus-shaped area the heater measures and tempers.
static HEATER_STAMP: LazyLock<Stamp> = LazyLock::new(|| {
    Stamp::new(&CellStamp::from_blocking([
        false, false, false, false, false, //
        false, false, true, false, false, //
        false, true, true, true, false, //
        false, false, true, false, false, //
        false, false, false, false, false,
    ]))
});

/// Heater configuration of a wall.
#[derive(Clone, Copy, Debug)]
pub struct WallState {
    /// Whether the heater nudges the surrounding temperature.
    pub heater_enabled: bool,
    /// Temperature the heater steers towards.
    pub target_temperature: SimFloat,
    /// Maximum heat energy moved per tick.
    pub energy_rate: SimFloat,
}

impl Default for WallState {
    fn default() -> Self {
        Self {
            heater_enabled: false,
            target_temperature: 1.0,
            energy_rate: 1.0,
        }
    }
}

/// A square safe wall ready for placement.
pub fn safe_wall() -> GameObject {
    GameObject::new(
        &SQUARE_WALL_INFO,
        ObjectKind::SquareSafeWall(WallState::default()),
        HEAT_CAPACITY_STONE,
    )
}

/// A round safe wall ready for placement.
pub fn round_safe_wall() -> GameObject {
    GameObject::new(
        &ROUND_WALL_INFO,
        ObjectKind::RoundSafeWall(WallState::default()),
        HEAT_CAPACITY_STONE,
    )
}

impl GameObject {
    /// Mutable access to the wall heater state, for walls.
    pub fn wall_state_mut(&mut self) -> Option<&mut WallState> {
        match &mut self.kind {
            ObjectKind::SquareSafeWall(state) | ObjectKind::RoundSafeWall(state) => Some(state),
            _ => None,
        }
    }
}

impl Level {
    /// Configure the heater of a placed wall.
    pub fn set_wall_heater(
        &mut self,
        id: ObjectId,
        enabled: bool,
        target_temperature: SimFloat,
        energy_rate: SimFloat,
    ) {
        if let Some(state) = self.objects.get_mut(id).and_then(GameObject::wall_state_mut) {
            state.heater_enabled = enabled;
            state.target_temperature = target_temperature;
            state.energy_rate = energy_rate;
        }
    }

    /// Nudge the average heat energy under the heater stamp towards the
    /// configured target, bounded by the energy rate.
    pub(crate) fn heater_tick(&mut self, id: ObjectId) {
        let Some(obj) = self.objects.get(id) else {
            return;
        };
        let (ObjectKind::SquareSafeWall(state) | ObjectKind::RoundSafeWall(state)) = &obj.kind
        else {
            return;
        };
        if !state.heater_enabled {
            return;
        }
        let phy = obj.phy;
        let heat_capacity = obj.heat_capacity;
        let target_temperature = state.target_temperature;
        let energy_rate = state.energy_rate;

        let avg_heat_energy =
            self.measure_stamp_avg(phy.x, phy.y, &HEATER_STAMP, |cell| cell.heat_energy);
        let target_energy = target_temperature * heat_capacity;
        let change = (target_energy - avg_heat_energy).clamp(-energy_rate, energy_rate);
        let new_temperature = (avg_heat_energy + change) / heat_capacity;

        self.physics
            .apply_temperature_stamp(phy.x, phy.y, &HEATER_STAMP, new_temperature);
    }
}
