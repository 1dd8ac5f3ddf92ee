//! Movement state machines.
//!
//! A movement is a short-lived value attached to a [`GameObject`]
//! moving it between two ([`Movement::Straight`]) or three
//! ([`Movement::Roll`]) cells. The cell bookkeeping happens at start:
//! the destination takes the resident immediately, the source (and a
//! roll's via cell) keep a reservation until the movement finalises or
//! is skipped.
//!
//! [`GameObject`]: crate::object::GameObject

use maniaclab_core::consts::TIME_SLICE;
use maniaclab_core::{CoordPair, ObjectId, SimFloat, TickCounter};

use crate::level::Level;

/// Straight movement duration in ticks: 1.0 s at the 4 ms time slice.
pub const STRAIGHT_DURATION_TICKS: TickCounter = 250;

/// Roll movement half-phase duration in ticks. Two half-phases equal
/// one straight movement.
pub const ROLL_HALF_DURATION_TICKS: TickCounter = STRAIGHT_DURATION_TICKS / 2;

/// State of a straight one-cell movement.
#[derive(Clone, Copy, Debug)]
pub struct StraightMovement {
    /// Source cell, reserved until finalisation.
    pub from: CoordPair,
    /// Destination cell, occupied from the first tick.
    pub to: CoordPair,
    /// Integer start position.
    pub start: CoordPair,
    /// Unit offset of the movement.
    pub offset: CoordPair,
    /// Ticks elapsed.
    pub time: TickCounter,
}

/// State of a roll movement: sideways over the via cell, then down.
#[derive(Clone, Copy, Debug)]
pub struct RollMovement {
    /// Source cell, reserved until finalisation.
    pub from: CoordPair,
    /// Pivot cell rolled over, reserved until finalisation.
    pub via: CoordPair,
    /// Landing cell, occupied from the first tick.
    pub to: CoordPair,
    /// Integer start position.
    pub start: CoordPair,
    /// Offset of the landing cell (`|x| = 1`, `y = 1`).
    pub offset: CoordPair,
    /// Ticks elapsed.
    pub time: TickCounter,
}

/// A movement attached to a game object.
#[derive(Clone, Copy, Debug)]
pub enum Movement {
    /// One cell up, down, left, or right.
    Straight(StraightMovement),
    /// Diagonal roll over a pivot cell.
    Roll(RollMovement),
}

impl Movement {
    /// The total cell offset of the movement.
    pub fn offset(&self) -> CoordPair {
        match self {
            Movement::Straight(m) => m.offset,
            Movement::Roll(m) => m.offset,
        }
    }

    /// The final integer position.
    pub fn end_position(&self) -> CoordPair {
        match self {
            Movement::Straight(m) => m.start + m.offset,
            Movement::Roll(m) => m.start + m.offset,
        }
    }
}

impl Level {
    /// Begin a straight movement of one cell.
    ///
    /// Transfers the resident slot to the destination immediately and
    /// reserves the source.
    ///
    /// # Panics
    ///
    /// Panics on a zero or diagonal offset, or when the destination is
    /// occupied.
    pub fn start_straight_movement(&mut self, id: ObjectId, offset: CoordPair) {
        assert!(
            offset.x.abs() + offset.y.abs() == 1,
            "straight movements cover exactly one field, got offset {offset}"
        );

        let obj = self.objects.get(id).expect("moving a dead object");
        assert!(obj.movement.is_none(), "object is already moving");
        let from = obj.cell;
        let to = from + offset;
        let start = from;

        // The continuous position must have settled on the grid.
        debug_assert!(obj.x == from.x as SimFloat && obj.y == from.y as SimFloat);

        {
            let from_cell = self.get_cell(from.x, from.y);
            debug_assert_eq!(from_cell.here, Some(id));
            debug_assert!(from_cell.reserved_by.is_none());
            assert!(
                self.get_cell(to.x, to.y).here.is_none(),
                "straight movement into an occupied cell at {to}"
            );
        }

        self.cell_mut(from.x, from.y).here = None;
        self.cell_mut(from.x, from.y).reserved_by = Some(id);
        self.cell_mut(to.x, to.y).here = Some(id);

        let obj = self.objects.get_mut(id).expect("moving a dead object");
        obj.cell = to;
        obj.movement = Some(Movement::Straight(StraightMovement {
            from,
            to,
            start,
            offset,
            time: 0,
        }));
    }

    /// Begin a roll movement: sideways over the via cell, then one cell
    /// down.
    ///
    /// # Panics
    ///
    /// Panics unless `|offset.x| == 1 && offset.y == 1`, or when the via
    /// or landing cell is occupied.
    pub fn start_roll_movement(&mut self, id: ObjectId, offset: CoordPair) {
        assert!(
            offset.x.abs() == 1 && offset.y == 1,
            "roll movements go one sideways and one down, got offset {offset}"
        );

        let obj = self.objects.get(id).expect("moving a dead object");
        assert!(obj.movement.is_none(), "object is already moving");
        let from = obj.cell;
        let via = CoordPair::new(from.x + offset.x, from.y);
        let to = from + offset;
        let start = from;

        {
            let from_cell = self.get_cell(from.x, from.y);
            debug_assert_eq!(from_cell.here, Some(id));
            debug_assert!(from_cell.reserved_by.is_none());
            assert!(self.get_cell(via.x, via.y).here.is_none());
            assert!(self.get_cell(to.x, to.y).here.is_none());
        }

        self.cell_mut(from.x, from.y).here = None;
        self.cell_mut(from.x, from.y).reserved_by = Some(id);
        self.cell_mut(via.x, via.y).reserved_by = Some(id);
        self.cell_mut(to.x, to.y).here = Some(id);

        let obj = self.objects.get_mut(id).expect("moving a dead object");
        obj.cell = to;
        obj.movement = Some(Movement::Roll(RollMovement {
            from,
            via,
            to,
            start,
            offset,
            time: 0,
        }));
    }

    /// Advance the object's movement by one tick.
    ///
    /// Returns whether the caller should keep processing the object:
    /// true while the movement is in progress or when the
    /// after-movement hook allowed it, false when the hook stopped
    /// further handling (e.g. the object destroyed itself on impact).
    pub(crate) fn advance_movement(&mut self, id: ObjectId) -> bool {
        let Some(obj) = self.objects.get(id) else {
            return false;
        };
        let Some(movement) = obj.movement else {
            return true;
        };

        match movement {
            Movement::Straight(mut m) => {
                m.time += 1;

                // An object moving out of our destination must update
                // first so both never occupy the same spot.
                let vacating = self.get_cell(m.to.x, m.to.y).reserved_by;
                if let Some(dep) = vacating {
                    if dep != id {
                        self.update_object(dep);
                    }
                }
                let Some(obj) = self.objects.get_mut(id) else {
                    return false;
                };

                if obj.info.is_round {
                    if m.offset.x != 0 {
                        obj.phi += (TIME_SLICE / f64::from(obj.info.roll_radius)) as SimFloat
                            * m.offset.x as SimFloat;
                    } else {
                        obj.phi +=
                            (f64::from(m.time) * TIME_SLICE * std::f64::consts::TAU).sin()
                                as SimFloat
                                / 100.0;
                    }
                }

                if m.time >= STRAIGHT_DURATION_TICKS {
                    obj.x = (m.start.x + m.offset.x) as SimFloat;
                    obj.y = (m.start.y + m.offset.y) as SimFloat;
                    obj.movement = None;
                    // The source reservation stays in place while the
                    // completion handlers run.
                    let result = self.after_movement(id, Movement::Straight(m));
                    self.cell_mut(m.from.x, m.from.y).reserved_by = None;
                    result
                } else {
                    let progress =
                        f64::from(m.time) / f64::from(STRAIGHT_DURATION_TICKS);
                    obj.x = m.start.x as SimFloat + (f64::from(m.offset.x) * progress) as SimFloat;
                    obj.y = m.start.y as SimFloat + (f64::from(m.offset.y) * progress) as SimFloat;
                    obj.movement = Some(Movement::Straight(m));
                    true
                }
            }
            Movement::Roll(mut m) => {
                m.time += 1;
                let Some(obj) = self.objects.get_mut(id) else {
                    return false;
                };

                if m.time >= ROLL_HALF_DURATION_TICKS * 2 {
                    obj.x = (m.start.x + m.offset.x) as SimFloat;
                    obj.y = (m.start.y + m.offset.y) as SimFloat;
                    obj.movement = None;
                    // The source and via reservations stay in place
                    // while the completion handlers run.
                    let result = self.after_movement(id, Movement::Roll(m));
                    self.cell_mut(m.via.x, m.via.y).reserved_by = None;
                    self.cell_mut(m.from.x, m.from.y).reserved_by = None;
                    return result;
                }

                if m.time >= ROLL_HALF_DURATION_TICKS {
                    // Second half: drop onto the landing cell.
                    let fall = f64::from(m.time - ROLL_HALF_DURATION_TICKS) * TIME_SLICE * 2.0;
                    obj.x = (m.start.x + m.offset.x) as SimFloat;
                    obj.y = m.start.y as SimFloat + (f64::from(m.offset.y) * fall) as SimFloat;
                } else {
                    // First half: roll sideways over the pivot.
                    let slide = f64::from(m.time) * TIME_SLICE * 2.0;
                    obj.x = m.start.x as SimFloat + (f64::from(m.offset.x) * slide) as SimFloat;
                    obj.y = m.start.y as SimFloat;
                }
                obj.movement = Some(Movement::Roll(m));
                true
            }
        }
    }

    /// Teleport the object to the movement's final position without
    /// invoking the after-movement hook. Reservations are released.
    pub fn skip_movement(&mut self, id: ObjectId) {
        let Some(obj) = self.objects.get_mut(id) else {
            return;
        };
        let Some(movement) = obj.movement.take() else {
            return;
        };

        let end = movement.end_position();
        obj.x = end.x as SimFloat;
        obj.y = end.y as SimFloat;

        match movement {
            Movement::Straight(m) => {
                self.cell_mut(m.from.x, m.from.y).reserved_by = None;
            }
            Movement::Roll(m) => {
                self.cell_mut(m.via.x, m.via.y).reserved_by = None;
                self.cell_mut(m.from.x, m.from.y).reserved_by = None;
            }
        }
    }

    /// Skip the object's movement and migrate its physics stamp to the
    /// final position, as if the movement had played out.
    pub(crate) fn fast_forward_movement(&mut self, id: ObjectId) {
        let Some(obj) = self.objects.get(id) else {
            return;
        };
        if obj.movement.is_none() {
            return;
        }
        let old_phy = obj.phy;
        self.skip_movement(id);

        let (new_phy, info) = {
            let obj = self.objects.get(id).expect("object vanished during skip");
            (self.get_physics_coords(obj.x, obj.y), obj.info)
        };
        if new_phy != old_phy && info.stamp.non_empty() {
            self.physics
                .move_stamp(old_phy.x, old_phy.y, new_phy.x, new_phy.y, &info.stamp, None);
        }
        if let Some(obj) = self.objects.get_mut(id) {
            obj.phy = new_phy;
        }
    }
}
