//! End-to-end object world scenarios: gravity, rolling, reservations,
//! and pushing.

use maniaclab_core::CoordPair;
use maniaclab_logic::objects::{player, rock, safe_wall, ActionRequest};
use maniaclab_logic::{Level, STRAIGHT_DURATION_TICKS};

use std::cell::Cell;
use std::rc::Rc;

fn run(level: &mut Level, ticks: u32) {
    for _ in 0..ticks {
        level.update();
    }
}

#[test]
fn rock_falls_to_the_floor() {
    let mut level = Level::with_seed(10, 10, 1);
    let id = level.place_object(rock(), 5, 0, 300.0);

    // One full fall: the rock arrives at row 1 (and immediately keeps
    // falling).
    run(&mut level, STRAIGHT_DURATION_TICKS + 1);
    assert_eq!(level.objects().get(id).unwrap().y, 1.0);

    // Eight more rows to the floor.
    run(&mut level, 8 * STRAIGHT_DURATION_TICKS);
    let obj = level.objects().get(id).unwrap();
    assert_eq!((obj.x, obj.y), (5.0, 9.0));
    assert!(obj.movement.is_none());
    assert_eq!(level.get_cell(5, 9).here, Some(id));
}

#[test]
fn stack_is_stable_when_fall_channels_are_blocked() {
    let mut level = Level::with_seed(10, 10, 2);
    level.place_object(safe_wall(), 4, 9, 300.0);
    level.place_object(safe_wall(), 6, 9, 300.0);
    let bottom = level.place_object(rock(), 5, 9, 300.0);
    let top = level.place_object(rock(), 5, 8, 300.0);

    run(&mut level, 3 * STRAIGHT_DURATION_TICKS);

    // Below is occupied and both diagonal channels end on walls, so
    // the top rock rests.
    let top_obj = level.objects().get(top).unwrap();
    assert_eq!((top_obj.x, top_obj.y), (5.0, 8.0));
    assert!(top_obj.movement.is_none());
    assert_eq!(level.get_cell(5, 9).here, Some(bottom));
}

#[test]
fn rock_rolls_off_a_round_partner_into_a_free_channel() {
    let mut level = Level::with_seed(10, 10, 3);
    level.place_object(rock(), 5, 9, 300.0);
    let top = level.place_object(rock(), 5, 8, 300.0);

    // A roll takes as long as a straight movement.
    run(&mut level, STRAIGHT_DURATION_TICKS + 1);

    let obj = level.objects().get(top).unwrap();
    assert_eq!(obj.y, 9.0);
    assert!(
        obj.x == 4.0 || obj.x == 6.0,
        "rock should have rolled aside, is at x={}",
        obj.x
    );
    assert!(obj.movement.is_none());

    // All reservations from the roll are gone.
    for x in 0..10 {
        for y in 0..10 {
            assert!(
                level.get_cell(x, y).reserved_by.is_none(),
                "stale reservation at ({x}, {y})"
            );
        }
    }
}

#[test]
fn placement_fast_forwards_a_moving_resident() {
    let mut level = Level::with_seed(10, 10, 4);
    let deaths = Rc::new(Cell::new(0));
    let deaths_seen = Rc::clone(&deaths);
    level.on_player_death(Box::new(move |_| deaths_seen.set(deaths_seen.get() + 1)));

    let id = level.place_player(player(), 3, 3).unwrap();
    level.set_player_action(id, ActionRequest::MoveRight);
    run(&mut level, 3);

    // The player is mid-move from (3, 3) to (4, 3).
    assert!(level.objects().get(id).unwrap().movement.is_some());
    assert_eq!(level.get_cell(3, 3).reserved_by, Some(id));
    assert_eq!(level.get_cell(4, 3).here, Some(id));

    // Placing into the destination finishes the movement instantly and
    // then destroys the resident.
    let intruder = level.place_object(rock(), 4, 3, 300.0);

    assert!(level.objects().get(id).is_none(), "resident must be gone");
    assert_eq!(deaths.get(), 1);
    assert!(level.get_cell(3, 3).reserved_by.is_none());
    assert!(level.get_cell(3, 3).here.is_none());
    assert_eq!(level.get_cell(4, 3).here, Some(intruder));
}

#[test]
fn placement_fast_forwards_a_reserver() {
    let mut level = Level::with_seed(10, 10, 5);
    let id = level.place_player(player(), 3, 3).unwrap();
    level.set_player_action(id, ActionRequest::MoveRight);
    run(&mut level, 3);

    // Placing into the source cell fast-forwards the reserver out of
    // the way instead of destroying it.
    let newcomer = level.place_object(rock(), 3, 3, 300.0);

    let obj = level.objects().get(id).unwrap();
    assert_eq!((obj.x, obj.y), (4.0, 3.0));
    assert!(obj.movement.is_none());
    assert_eq!(level.get_cell(4, 3).here, Some(id));
    assert_eq!(level.get_cell(3, 3).here, Some(newcomer));
}

#[test]
fn player_pushes_a_rock() {
    let mut level = Level::with_seed(10, 10, 6);
    let player_id = level.place_player(player(), 4, 9).unwrap();
    let rock_id = level.place_object(rock(), 5, 9, 300.0);
    level.set_player_action(player_id, ActionRequest::MoveRight);

    run(&mut level, STRAIGHT_DURATION_TICKS + 1);

    assert_eq!(level.objects().get(player_id).unwrap().x, 5.0);
    assert_eq!(level.objects().get(rock_id).unwrap().x, 6.0);
}

#[test]
fn skipping_a_movement_is_idempotent() {
    let mut level = Level::with_seed(10, 10, 7);
    let id = level.place_player(player(), 3, 3).unwrap();
    level.set_player_action(id, ActionRequest::MoveRight);
    run(&mut level, 5);

    level.skip_movement(id);
    let obj = level.objects().get(id).unwrap();
    assert_eq!((obj.x, obj.y), (4.0, 3.0));
    assert!(obj.movement.is_none());
    assert!(level.get_cell(3, 3).reserved_by.is_none());

    // A second skip is a no-op.
    level.skip_movement(id);
    let obj = level.objects().get(id).unwrap();
    assert_eq!((obj.x, obj.y), (4.0, 3.0));
    assert_eq!(level.get_cell(4, 3).here, Some(id));
}

#[test]
#[should_panic(expected = "occupied cell")]
fn straight_movement_into_an_occupied_cell_panics() {
    let mut level = Level::with_seed(10, 10, 8);
    let a = level.place_object(rock(), 4, 9, 300.0);
    level.place_object(rock(), 5, 9, 300.0);
    level.start_straight_movement(a, CoordPair::new(1, 0));
}

#[test]
fn commanded_moves_reject_busy_objects() {
    use maniaclab_logic::MoveDirection;

    let mut level = Level::with_seed(10, 10, 30);
    let id = level.place_object(rock(), 5, 9, 300.0);

    assert!(level.move_object(id, MoveDirection::Right, false));
    assert_eq!(level.get_cell(6, 9).here, Some(id));
    // Already moving.
    assert!(!level.move_object(id, MoveDirection::Right, false));
}

#[test]
fn second_player_is_rejected() {
    let mut level = Level::with_seed(10, 10, 9);
    let first = level.place_player(player(), 2, 2);
    assert!(first.is_some());
    assert!(level.place_player(player(), 3, 3).is_none());
    assert_eq!(level.player(), first);
}
