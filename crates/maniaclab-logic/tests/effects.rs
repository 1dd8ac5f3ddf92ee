//! Stationary effect objects: fans, fog emitters, and heater walls.

use maniaclab_logic::objects::{fog_emitter, horiz_fan, safe_wall};
use maniaclab_logic::Level;

#[test]
fn fan_blends_flow_into_its_effect_cells() {
    let mut level = Level::with_seed(10, 10, 40);
    level.place_object(horiz_fan(10.0, 0.0), 5, 5, 300.0);

    level.update();
    level.physics().wait_for_frame();

    // The effect slit sits in the middle of the housing.
    let flow = level.physics().front_cell_at(27, 26).flow;
    assert!(flow[0] > 0.0, "fan should blow along +x, got {flow:?}");
}

#[test]
fn fog_emitter_raises_fog_density() {
    let mut level = Level::with_seed(10, 10, 41);
    level.place_object(fog_emitter(0.5, 310.0), 5, 5, 300.0);

    level.update();
    level.physics().wait_for_frame();

    // A ring cell of the effect stamp.
    let fog = level.physics().front_cell_at(27, 25).fog_density;
    assert!(fog > 0.0, "emitter should add fog, got {fog}");
}

#[test]
fn heater_wall_warms_its_surroundings() {
    let mut level = Level::with_seed(10, 10, 42);
    let id = level.place_object(safe_wall(), 5, 5, 300.0);
    level.set_wall_heater(id, true, 600.0, 50.0);

    let baseline = 300.0 * 8.0; // placement temperature times stone capacity

    for _ in 0..20 {
        level.update();
    }
    level.physics().wait_for_frame();

    let avg_energy = level.measure_object_avg(id, |cell| cell.heat_energy);
    assert!(
        avg_energy > baseline + 1.0,
        "heater did not raise the stamp energy: {avg_energy} vs {baseline}"
    );
}
