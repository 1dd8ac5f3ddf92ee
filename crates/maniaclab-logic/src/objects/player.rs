//! The player avatar.
//!
//! The player is driven by a controller holding one pending action
//! request per tick. Moving into a collectable neighbour collects it;
//! moving sideways against a movable object pushes it if the cell
//! behind it is free.

use std::f32::consts::FRAC_PI_2;
use std::sync::LazyLock;

use maniaclab_core::{CellStamp, CoordPair, ObjectId, Stamp};

use crate::level::Level;
use crate::object::{GameObject, ObjectInfo};
use crate::objects::ObjectKind;

static PLAYER_INFO: LazyLock<ObjectInfo> = LazyLock::new(|| ObjectInfo {
    is_blocking: true,
    is_destructible: true,
    is_collectable: false,
    is_gravity_affected: false,
    is_movable: true,
    is_round: false,
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

/// A commanded player action, consumed on the next idle tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ActionRequest {
    /// Stand still.
    #[default]
    None,
    /// Move one cell up.
    MoveUp,
    /// Move one cell down.
    MoveDown,
    /// Move one cell left.
    MoveLeft,
    /// Move one cell right.
    MoveRight,
}

/// Input state of the player.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlayerController {
    /// The pending action.
    pub action_request: ActionRequest,
}

/// A player avatar ready for placement.
pub fn player() -> GameObject {
    GameObject::new(
        &PLAYER_INFO,
        ObjectKind::Player(PlayerController::default()),
        1.0,
    )
}

impl Level {
    /// Set the player's pending action request.
    pub fn set_player_action(&mut self, id: ObjectId, request: ActionRequest) {
        if let Some(obj) = self.objects.get_mut(id) {
            if let ObjectKind::Player(controller) = &mut obj.kind {
                controller.action_request = request;
            }
        }
    }

    /// Collect the object in `target` if possible.
    ///
    /// Returns true when the cell is passable afterwards: it was empty,
    /// or held a collectable that has been picked up.
    pub(crate) fn try_collect(&mut self, target: CoordPair) -> bool {
        let cell = *self.get_cell(target.x, target.y);
        if cell.here.is_some() && cell.reserved_by.is_some() {
            return false;
        }

        let Some(id) = cell.here.or(cell.reserved_by) else {
            return true;
        };

        if self.objects.get(id).is_some_and(|obj| obj.info.is_collectable) {
            self.cleanup_cell(target.x, target.y);
            return true;
        }

        false
    }

    /// The player's controller-driven idle behaviour.
    pub(crate) fn player_idle(&mut self, id: ObjectId) -> bool {
        let Some(obj) = self.objects.get(id) else {
            return false;
        };
        let ObjectKind::Player(controller) = &obj.kind else {
            return false;
        };
        let request = controller.action_request;
        let cell = obj.cell;
        let phi = obj.phi;
        let flip = obj.flip;

        match request {
            ActionRequest::None => {}
            ActionRequest::MoveUp => {
                if cell.y <= 1 {
                    return true;
                }
                if self.try_collect(CoordPair::new(cell.x, cell.y - 1)) {
                    self.start_straight_movement(id, CoordPair::new(0, -1));
                    // Orient along the previous facing.
                    let was_straight = (-1e-2..=1e-2).contains(&phi);
                    let was_up = (flip && phi < 0.0) || (!flip && phi > 0.0);
                    let orient_right =
                        (flip && was_straight) || (was_up && flip) || (!was_up && !flip);
                    if let Some(obj) = self.objects.get_mut(id) {
                        if orient_right {
                            obj.flip = true;
                            obj.phi = -FRAC_PI_2;
                        } else {
                            obj.flip = false;
                            obj.phi = FRAC_PI_2;
                        }
                    }
                }
            }
            ActionRequest::MoveDown => {
                if cell.y >= self.height() - 1 {
                    return true;
                }
                if self.try_collect(CoordPair::new(cell.x, cell.y + 1)) {
                    self.start_straight_movement(id, CoordPair::new(0, 1));
                    let was_straight = (-1e-2..=1e-2).contains(&phi);
                    let was_down = (flip && phi > 0.0) || (!flip && phi < 0.0);
                    let orient_right =
                        (was_straight && flip) || (was_down && flip) || (!was_down && !flip);
                    if let Some(obj) = self.objects.get_mut(id) {
                        if orient_right {
                            obj.flip = true;
                            obj.phi = FRAC_PI_2;
                        } else {
                            obj.flip = false;
                            obj.phi = -FRAC_PI_2;
                        }
                    }
                }
            }
            ActionRequest::MoveLeft => {
                if cell.x <= 1 {
                    return true;
                }
                if self.try_collect(CoordPair::new(cell.x - 1, cell.y)) {
                    self.start_straight_movement(id, CoordPair::new(-1, 0));
                    if let Some(obj) = self.objects.get_mut(id) {
                        obj.flip = false;
                        obj.phi = 0.0;
                    }
                    return true;
                }
                if cell.x <= 2 {
                    return true;
                }
                self.try_push(id, cell, -1);
            }
            ActionRequest::MoveRight => {
                if cell.x >= self.width() - 1 {
                    return true;
                }
                if self.try_collect(CoordPair::new(cell.x + 1, cell.y)) {
                    self.start_straight_movement(id, CoordPair::new(1, 0));
                    if let Some(obj) = self.objects.get_mut(id) {
                        obj.flip = true;
                        obj.phi = 0.0;
                    }
                    return true;
                }
                if cell.x >= self.width() - 2 {
                    return true;
                }
                self.try_push(id, cell, 1);
            }
        }

        true
    }

    /// Push the movable neighbour at `cell.x + dx` one cell further and
    /// follow into the vacated spot.
    fn try_push(&mut self, id: ObjectId, cell: CoordPair, dx: maniaclab_core::CoordInt) {
        let neighbour = *self.get_cell(cell.x + dx, cell.y);
        let behind = *self.get_cell(cell.x + 2 * dx, cell.y);

        if behind.here.is_some() || behind.reserved_by.is_some() {
            return;
        }
        let Some(neighbour_id) = neighbour.here else {
            return;
        };
        let pushable = self
            .objects
            .get(neighbour_id)
            .is_some_and(|obj| obj.movement.is_none() && obj.info.is_movable);
        if !pushable {
            return;
        }

        self.start_straight_movement(neighbour_id, CoordPair::new(dx, 0));
        self.start_straight_movement(id, CoordPair::new(dx, 0));
        if let Some(obj) = self.objects.get_mut(id) {
            obj.flip = dx > 0;
            obj.phi = 0.0;
        }
    }
}
