//! Explosion scheduling, chaining, and block lifecycle.

use maniaclab_core::consts::{EXPLOSION_BLOCK_LIFETIME, EXPLOSION_TRIGGER_TIMEOUT};
use maniaclab_logic::objects::{bomb, rock, safe_wall};
use maniaclab_logic::{Level, ObjectKind, STRAIGHT_DURATION_TICKS};

fn run(level: &mut Level, ticks: u32) {
    for _ in 0..ticks {
        level.update();
    }
}

fn explosion_count(level: &Level) -> usize {
    level
        .objects()
        .iter()
        .filter(|(_, obj)| matches!(obj.kind, ObjectKind::Explosion(_)))
        .count()
}

#[test]
fn falling_rock_sets_off_a_bomb() {
    let mut level = Level::with_seed(12, 12, 10);
    let bomb_id = level.place_object(bomb(), 5, 5, 300.0);
    let rock_id = level.place_object(rock(), 5, 0, 300.0);

    // Four falls bring the rock onto the bomb; the landing headache
    // detonates it.
    run(&mut level, 4 * STRAIGHT_DURATION_TICKS + 1);
    assert!(level.objects().get(bomb_id).is_none(), "bomb must be gone");

    // The 3x3 explosion ignites after the trigger timeout, consuming
    // the rock and filling every affected cell with an explosion
    // block.
    run(&mut level, EXPLOSION_TRIGGER_TIMEOUT);
    assert!(level.objects().get(rock_id).is_none(), "rock must be gone");
    assert_eq!(explosion_count(&level), 9);
    for y in 4..=6 {
        for x in 4..=6 {
            let id = level.get_cell(x, y).here.expect("cell must hold a block");
            let obj = level.objects().get(id).unwrap();
            assert!(matches!(obj.kind, ObjectKind::Explosion(_)));
        }
    }

    // The blocks remove themselves after their lifetime.
    run(&mut level, EXPLOSION_BLOCK_LIFETIME);
    assert_eq!(explosion_count(&level), 0);
}

#[test]
fn indestructible_residents_shield_their_cell() {
    let mut level = Level::with_seed(12, 12, 11);
    let wall_id = level.place_object(safe_wall(), 4, 5, 300.0);
    level.add_large_explosion(5, 5, 1, 1);

    run(&mut level, EXPLOSION_TRIGGER_TIMEOUT);

    assert!(level.objects().get(wall_id).is_some());
    assert_eq!(level.get_cell(4, 5).here, Some(wall_id));
    assert_eq!(explosion_count(&level), 8);
}

#[test]
fn particle_explosion_spawns_a_particle_ring() {
    let mut level = Level::with_seed(12, 12, 15);
    level.add_large_particle_explosion(5, 5, 1, 1);

    // Eight particles per affected cell, before any sparks shed.
    assert!(level.particles().active_count() >= 72);

    run(&mut level, EXPLOSION_TRIGGER_TIMEOUT);
    assert_eq!(explosion_count(&level), 9);
}

#[test]
fn explosion_block_stamps_pressure_and_expires() {
    let mut level = Level::with_seed(12, 12, 12);
    level.add_explosion(3, 3);

    run(&mut level, EXPLOSION_TRIGGER_TIMEOUT);
    assert_eq!(explosion_count(&level), 1);

    // The first block tick set the burst pressure; the frame swap has
    // published it as the read source.
    level.physics().wait_for_frame();
    let pressure = level
        .physics()
        .front_cell_at(17, 17)
        .air_pressure;
    assert!(
        pressure > 1.4,
        "burst pressure not applied, centre reads {pressure}"
    );

    run(&mut level, EXPLOSION_BLOCK_LIFETIME);
    assert_eq!(explosion_count(&level), 0);
}
