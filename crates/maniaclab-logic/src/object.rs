//! Game objects and their shared update contract.

use maniaclab_core::{CoordPair, ObjectId, SimFloat, Stamp, TickCounter};

use crate::level::Level;
use crate::objects::ObjectKind;

/// Flags latched for an object between ticks.
///
/// The engine and the particle system only set these; each object
/// resets its own state at the end of its update.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameState {
    /// The object is part of an explosion area.
    pub explode: bool,
    /// The object is being hit by igniting particles.
    pub ignite: bool,
    /// The object is not moving.
    pub idle: bool,
}

impl FrameState {
    /// Reset all flags to their defaults.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Immutable per-kind properties of a game object.
pub struct ObjectInfo {
    /// Whether the object blocks physics cells.
    pub is_blocking: bool,
    /// Whether explosions destroy the object.
    pub is_destructible: bool,
    /// Whether the player can pick the object up.
    pub is_collectable: bool,
    /// Whether gravity pulls the object down.
    pub is_gravity_affected: bool,
    /// Whether the object can be pushed.
    pub is_movable: bool,
    /// Whether other round objects roll off this one.
    pub is_round: bool,
    /// Whether objects resting on this one stay put.
    pub is_sticky: bool,
    /// Rolling radius used for rotation while moving.
    pub roll_radius: f32,
    /// Physics footprint.
    pub stamp: Stamp,
}

/// Direction of a commanded move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveDirection {
    /// Towards smaller y.
    Up,
    /// Towards larger y.
    Down,
    /// Towards larger x.
    Right,
    /// Towards smaller x.
    Left,
}

impl MoveDirection {
    /// The unit cell offset of this direction.
    pub fn to_vector(self) -> CoordPair {
        match self {
            MoveDirection::Up => CoordPair::new(0, -1),
            MoveDirection::Down => CoordPair::new(0, 1),
            MoveDirection::Left => CoordPair::new(-1, 0),
            MoveDirection::Right => CoordPair::new(1, 0),
        }
    }
}

/// One object in the level.
pub struct GameObject {
    /// Per-kind immutable properties.
    pub info: &'static ObjectInfo,
    /// Kind tag plus per-kind mutable state.
    pub kind: ObjectKind,
    /// The cell owning this object.
    pub cell: CoordPair,
    /// Continuous position, equal to `cell` while not moving.
    pub x: SimFloat,
    /// Continuous position, equal to `cell` while not moving.
    pub y: SimFloat,
    /// Rotation angle.
    pub phi: SimFloat,
    /// Horizontal mirroring of the visual.
    pub flip: bool,
    /// Physics-grid anchor of the stamp.
    pub phy: CoordPair,
    /// Heat capacity of the object's blocked cells.
    pub heat_capacity: SimFloat,
    /// Active movement, if any.
    pub movement: Option<crate::movement::Movement>,
    /// Tick of the last full update, for movement dependency ordering.
    pub ticks: TickCounter,
    /// Latched per-tick flags.
    pub frame_state: FrameState,
}

impl GameObject {
    /// Create an object of the given kind. Position fields are filled
    /// in by [`Level::place_object`](crate::level::Level::place_object).
    pub fn new(info: &'static ObjectInfo, kind: ObjectKind, heat_capacity: SimFloat) -> Self {
        Self {
            info,
            kind,
            cell: CoordPair::default(),
            x: 0.0,
            y: 0.0,
            phi: 0.0,
            flip: false,
            phy: CoordPair::default(),
            heat_capacity,
            movement: None,
            ticks: 0,
            frame_state: FrameState::default(),
        }
    }
}

impl Level {
    /// Advance one object by one tick: kind-specific logic plus the
    /// shared movement/stamp/idle handling.
    pub fn update_object(&mut self, id: ObjectId) {
        let Some(obj) = self.objects.get(id) else {
            return;
        };
        if obj.ticks == self.get_ticks() {
            return;
        }

        match obj.kind {
            ObjectKind::Bomb => {
                let heat_capacity = obj.heat_capacity;
                let temperature =
                    self.measure_object_avg(id, |cell| cell.heat_energy / heat_capacity);
                if temperature > crate::objects::bomb::TEMPERATURE_THRESHOLD {
                    self.bomb_explode(id);
                    return;
                }
                self.generic_update(id);
            }
            ObjectKind::Explosion(_) => {
                self.generic_update(id);
                if self.objects.contains(id) {
                    self.explosion_tick(id);
                }
            }
            ObjectKind::SquareSafeWall(_) | ObjectKind::RoundSafeWall(_) => {
                self.generic_update(id);
                if self.objects.contains(id) {
                    self.heater_tick(id);
                }
            }
            ObjectKind::HorizFan(_) | ObjectKind::VertFan(_) => {
                self.generic_update(id);
                if self.objects.contains(id) {
                    self.fan_tick(id);
                }
            }
            ObjectKind::FogEmitter(_) => {
                self.generic_update(id);
                if self.objects.contains(id) {
                    self.fog_tick(id);
                }
            }
            ObjectKind::Rock | ObjectKind::Player(_) => {
                self.generic_update(id);
            }
        }
    }

    /// The shared part of every object update: advance the movement,
    /// migrate the physics stamp, run idle logic, reset the frame
    /// state.
    pub(crate) fn generic_update(&mut self, id: ObjectId) {
        let ticks = self.get_ticks();
        let Some(obj) = self.objects.get_mut(id) else {
            return;
        };
        // Latch the tick before any recursion through movement
        // dependencies can revisit this object.
        obj.ticks = ticks;

        if obj.movement.is_some() && !self.advance_movement(id) {
            return;
        }

        let (new_phy, old_phy, info) = {
            let Some(obj) = self.objects.get(id) else {
                return;
            };
            (self.get_physics_coords(obj.x, obj.y), obj.phy, obj.info)
        };
        if new_phy != old_phy {
            if info.stamp.non_empty() {
                let vel = new_phy - old_phy;
                self.physics.move_stamp(
                    old_phy.x,
                    old_phy.y,
                    new_phy.x,
                    new_phy.y,
                    &info.stamp,
                    Some(vel),
                );
            }
            if let Some(obj) = self.objects.get_mut(id) {
                obj.phy = new_phy;
            }
        }

        let still_idle = self
            .objects
            .get(id)
            .is_some_and(|obj| obj.movement.is_none());
        if still_idle {
            self.idle_object(id);
        }

        if let Some(obj) = self.objects.get_mut(id) {
            obj.frame_state.reset();
        }
    }

    /// Kind dispatch of the per-tick idle behaviour.
    pub(crate) fn idle_object(&mut self, id: ObjectId) -> bool {
        let Some(obj) = self.objects.get(id) else {
            return false;
        };
        match obj.kind {
            ObjectKind::Player(_) => self.player_idle(id),
            _ => self.default_idle(id),
        }
    }

    /// Gravity handling shared by everything that falls.
    pub(crate) fn default_idle(&mut self, id: ObjectId) -> bool {
        let Some(obj) = self.objects.get(id) else {
            return false;
        };
        if obj.movement.is_some() {
            return true;
        }
        if obj.info.is_gravity_affected && obj.cell.y < self.height() {
            return self.handle_gravity(id);
        }
        true
    }

    /// Let the object fall straight down, or roll off a round resting
    /// partner into a free fall channel.
    pub(crate) fn handle_gravity(&mut self, id: ObjectId) -> bool {
        let Some(obj) = self.objects.get(id) else {
            return false;
        };
        let cell = obj.cell;
        if cell.y == self.height() - 1 {
            return true;
        }
        debug_assert!(obj.movement.is_none());
        let is_round = obj.info.is_round;

        let below = self.get_cell(cell.x, cell.y + 1);
        if below.here.is_none() && below.reserved_by.is_none() {
            self.start_straight_movement(id, CoordPair::new(0, 1));
            return true;
        }

        let below_round = below
            .here
            .and_then(|below_id| self.objects.get(below_id))
            .is_some_and(|below_obj| below_obj.info.is_round);

        if is_round && below_round {
            let mut left = cell.x > 0 && self.get_fall_channel(cell.x - 1, cell.y).is_some();
            let mut right =
                cell.x < self.width() - 1 && self.get_fall_channel(cell.x + 1, cell.y).is_some();

            if left && right {
                use rand::Rng;
                if self.rng.gen::<f32>() >= 0.5 {
                    left = false;
                } else {
                    right = false;
                }
            }

            let offset_x = if left {
                -1
            } else if right {
                1
            } else {
                return true;
            };
            self.start_roll_movement(id, CoordPair::new(offset_x, 1));
        }

        true
    }

    /// Completion hook of a movement. Falling objects transfer control
    /// to whatever they landed on through `impact` and `headache`.
    ///
    /// Returns false when further handling must stop (the object
    /// destroyed itself).
    pub(crate) fn after_movement(&mut self, id: ObjectId, prev: crate::movement::Movement) -> bool {
        let Some(obj) = self.objects.get(id) else {
            return false;
        };
        if prev.offset().y <= 0 || !obj.info.is_gravity_affected {
            return true;
        }

        let cell = obj.cell;
        if cell.y < self.height() - 1 {
            let below_cell = CoordPair::new(cell.x, cell.y + 1);
            let Some(below) = self.get_cell(below_cell.x, below_cell.y).here else {
                return true;
            };
            if !self.impact(id, Some(below)) {
                return false;
            }
            // The impact may have removed either party.
            if let Some(below) = self.get_cell(below_cell.x, below_cell.y).here {
                self.headache(below, id);
            }
        } else if !self.impact(id, None) {
            return false;
        }

        true
    }

    /// The object landed on `on_object` (or the level floor). Returns
    /// false when subsequent handlers must not run.
    pub(crate) fn impact(&mut self, id: ObjectId, _on_object: Option<ObjectId>) -> bool {
        let Some(obj) = self.objects.get(id) else {
            return false;
        };
        match obj.kind {
            ObjectKind::Bomb => {
                self.bomb_explode(id);
                false
            }
            _ => true,
        }
    }

    /// Another object landed on this one.
    pub(crate) fn headache(&mut self, id: ObjectId, _from_object: ObjectId) {
        let Some(obj) = self.objects.get(id) else {
            return;
        };
        if let ObjectKind::Bomb = obj.kind {
            self.bomb_explode(id);
        }
    }

    /// The object was touched by an explosion. Destructible objects
    /// remove themselves; bombs chain-explode.
    pub fn explosion_touch(&mut self, id: ObjectId) {
        let Some(obj) = self.objects.get_mut(id) else {
            return;
        };
        if let ObjectKind::Bomb = obj.kind {
            self.bomb_explode(id);
            return;
        }
        obj.frame_state.explode = true;
        let destructible = obj.info.is_destructible;
        if destructible {
            self.destruct_object(id);
        }
    }

    /// The object was touched by igniting particles.
    pub fn ignition_touch(&mut self, id: ObjectId) {
        if let Some(obj) = self.objects.get_mut(id) {
            obj.frame_state.ignite = true;
        }
    }

    /// Command the object to move one cell. With `chain_move`, a
    /// movable object in the way is pushed ahead.
    pub fn move_object(&mut self, id: ObjectId, dir: MoveDirection, chain_move: bool) -> bool {
        let Some(obj) = self.objects.get(id) else {
            return false;
        };
        if !obj.info.is_movable || obj.movement.is_some() {
            return false;
        }

        let offs = dir.to_vector();
        let neigh_x = offs.x + obj.x.round() as i32;
        let neigh_y = offs.y + obj.y.round() as i32;

        if (offs.x != 0 || offs.y != 0)
            && neigh_x >= 0
            && neigh_x < self.width()
            && neigh_y >= 0
            && neigh_y < self.height()
        {
            let neighbour = self.get_cell(neigh_x, neigh_y);
            if neighbour.reserved_by.is_some() {
                return false;
            }
            let pushable = match neighbour.here {
                None => true,
                Some(resident) => chain_move && self.move_object(resident, dir, false),
            };
            if pushable {
                self.start_straight_movement(id, offs);
                return true;
            }
        }

        false
    }

    /// Remove the object from the level (clearing its stamp and any
    /// reservations it holds).
    pub fn destruct_object(&mut self, id: ObjectId) {
        let Some(obj) = self.objects.get(id) else {
            return;
        };
        let cell = obj.cell;
        self.cleanup_cell(cell.x, cell.y);
    }
}
