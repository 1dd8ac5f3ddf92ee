//! Per-cell update kernel of the automaton.
//!
//! Every function in here reads the frozen front buffer and metadata and
//! accumulates into the cell's back-buffer entry. Each neighbour pair is
//! visited twice per step, once from each side with opposite signs, so
//! air transport conserves mass by construction; the clamps bound any
//! single transfer to a quarter of the source quantity.

use maniaclab_core::CoordInt;

use crate::cell::{LabCell, LabCellMeta};
use crate::{
    AIR_DIFFUSION_FACTOR, AIR_FLOW_FACTOR, CONVECTION_FACTOR, FOG_DIFFUSION_FACTOR,
    HEAT_DIFFUSION_FACTOR,
};

/// Clamp with the upper bound taking priority when the interval is
/// inverted by a transient negative pressure.
fn clamp(value: f32, min: f32, max: f32) -> f32 {
    if value > max {
        max
    } else if value < min {
        min
    } else {
        value
    }
}

/// Move air (and the heat and fog it carries) between a cell and one
/// neighbour. Returns the applied flow for the momentum blend.
///
/// `flow_sign` is +1 towards the positive-axis neighbour and -1 towards
/// the negative-axis neighbour; `flow_source` is the downstream cell
/// whose momentum seeds the target flow.
#[allow(clippy::too_many_arguments)]
fn air_flow(
    dir: usize,
    flow_sign: f32,
    back: &mut LabCell,
    front: &LabCell,
    meta: &LabCellMeta,
    neigh_front: &LabCell,
    neigh_meta: &LabCellMeta,
    flow_source: &LabCell,
) -> f32 {
    if neigh_meta.blocked || meta.blocked {
        return 0.0;
    }

    let dpressure = front.air_pressure - neigh_front.air_pressure;
    let dtemp = if dir == 1 && neigh_front.air_pressure > 1e-17 && front.air_pressure > 1e-17 {
        front.heat_energy / front.air_pressure - neigh_front.heat_energy / neigh_front.air_pressure
    } else {
        0.0
    };
    // Only cooling towards the neighbour contributes lift.
    let temp_flow = flow_sign * if dtemp < 0.0 { dtemp * CONVECTION_FACTOR } else { 0.0 };
    let press_flow = dpressure * AIR_DIFFUSION_FACTOR;
    let flow = flow_sign * flow_source.flow[dir] * AIR_FLOW_FACTOR
        + (press_flow + temp_flow) * (1.0 - AIR_FLOW_FACTOR);

    let applicable_flow = clamp(
        flow,
        -neigh_front.air_pressure / 4.0,
        front.air_pressure / 4.0,
    );

    back.air_pressure -= applicable_flow;

    if applicable_flow == 0.0 {
        return applicable_flow;
    }

    // A non-zero applicable flow guarantees the pressure it divides by is
    // positive: outflow is bounded by the own pressure, inflow by the
    // neighbour's.
    let energy_flow = if applicable_flow > 0.0 {
        front.heat_energy / front.air_pressure * applicable_flow
    } else {
        neigh_front.heat_energy / neigh_front.air_pressure * applicable_flow
    };
    debug_assert!(!energy_flow.is_nan());
    back.heat_energy -= energy_flow;

    let fog_flow = if applicable_flow > 0.0 {
        front.fog_density / front.air_pressure * applicable_flow
    } else {
        neigh_front.fog_density / neigh_front.air_pressure * applicable_flow
    };
    debug_assert!(!fog_flow.is_nan());
    back.fog_density -= fog_flow;

    applicable_flow
}

/// Conduct heat between a cell and one neighbour.
///
/// Heat capacities come from the per-cell cache, so blocked cells conduct
/// with their object's coefficient. If a transfer would overshoot past
/// equilibrium, the cell is clamped to its share of the equilibrium
/// partition instead.
fn temperature_flow(
    back: &mut LabCell,
    front: &LabCell,
    neigh_front: &LabCell,
) {
    let tc = front.heat_capacity;
    let neigh_tc = neigh_front.heat_capacity;

    if tc < 1e-17 || neigh_tc < 1e-17 {
        return;
    }

    let temp = front.heat_energy / tc;
    let neigh_temp = neigh_front.heat_energy / neigh_tc;
    let dtemp = neigh_temp - temp;

    let energy_flow_raw = if dtemp > 0.0 { neigh_tc * dtemp } else { tc * dtemp };
    let energy_flow = clamp(
        energy_flow_raw * HEAT_DIFFUSION_FACTOR,
        -front.heat_energy / 4.0,
        neigh_front.heat_energy / 4.0,
    );
    debug_assert!(!energy_flow.is_nan());

    back.heat_energy += energy_flow;

    if (energy_flow > 0.0 && neigh_temp < temp) || (energy_flow <= 0.0 && temp < neigh_temp) {
        let total = f64::from(neigh_front.heat_energy) + f64::from(front.heat_energy);
        let avg_temp = total / f64::from(tc + neigh_tc);
        debug_assert!(!avg_temp.is_nan());
        back.heat_energy = (avg_temp * f64::from(tc)) as f32;
    }
}

/// Equalise fog density between a cell and one unblocked neighbour,
/// weighted by pressure the same way heat conduction is weighted by
/// capacity.
fn fog_flow(
    back: &mut LabCell,
    front: &LabCell,
    meta: &LabCellMeta,
    neigh_front: &LabCell,
    neigh_meta: &LabCellMeta,
) {
    if meta.blocked || neigh_meta.blocked {
        return;
    }

    let tc = front.air_pressure;
    let neigh_tc = neigh_front.air_pressure;

    if tc < 1e-17 || neigh_tc < 1e-17 {
        return;
    }

    let density = front.fog_density / tc;
    let neigh_density = neigh_front.fog_density / neigh_tc;
    let ddensity = neigh_density - density;

    let flow_raw = if ddensity > 0.0 { neigh_tc * ddensity } else { tc * ddensity };
    let flow = clamp(
        flow_raw * FOG_DIFFUSION_FACTOR,
        -front.fog_density / 4.0,
        neigh_front.fog_density / 4.0,
    );
    debug_assert!(!flow.is_nan());

    back.fog_density += flow;

    if (flow > 0.0 && neigh_density < density) || (flow <= 0.0 && density < neigh_density) {
        let total = f64::from(neigh_front.fog_density) + f64::from(front.fog_density);
        let avg = total / f64::from(tc + neigh_tc);
        debug_assert!(!avg.is_nan());
        back.fog_density = (avg * f64::from(tc)) as f32;
    }
}

/// Run both sides of one axis: accumulate air, heat, and (optionally)
/// fog exchange, then blend the cell's new flow from the outgoing
/// applicable flow and the momentum carried by inflowing air.
#[allow(clippy::too_many_arguments)]
fn full_flow(
    dir: usize,
    back: &mut LabCell,
    front: &LabCell,
    meta: &LabCellMeta,
    neg_front: &LabCell,
    neg_meta: &LabCellMeta,
    pos_front: &LabCell,
    pos_meta: &LabCellMeta,
    fog_diffusion: bool,
) {
    let mut incoming_flow = 0.0f32;
    let mut incoming_weight = 0.0f32;

    let applicable_flow = air_flow(dir, -1.0, back, front, meta, neg_front, neg_meta, neg_front);
    if applicable_flow < 0.0 {
        incoming_flow += neg_front.flow[dir] * -applicable_flow;
        incoming_weight -= applicable_flow;
    }
    temperature_flow(back, front, neg_front);
    if fog_diffusion {
        fog_flow(back, front, meta, neg_front, neg_meta);
    }

    let applicable_flow = air_flow(dir, 1.0, back, front, meta, pos_front, pos_meta, front);
    if applicable_flow < 0.0 {
        incoming_flow += pos_front.flow[dir] * -applicable_flow;
        incoming_weight -= applicable_flow;
    }
    let mixing_factor = if back.air_pressure > 1e-17 {
        clamp(incoming_weight / back.air_pressure, 0.0, 1.0)
    } else {
        0.0
    };
    back.flow[dir] = (1.0 - mixing_factor) * applicable_flow
        + if back.air_pressure > 1e-17 {
            incoming_flow / back.air_pressure
        } else {
            0.0
        };

    temperature_flow(back, front, pos_front);
    if fog_diffusion {
        fog_flow(back, front, meta, pos_front, pos_meta);
    }
}

/// Inputs shared by every cell update of one frame.
pub(crate) struct FrameContext<'a> {
    pub front: &'a [LabCell],
    pub meta: &'a [LabCellMeta],
    pub width: CoordInt,
    pub height: CoordInt,
    pub null_cell: LabCell,
    pub fog_diffusion: bool,
}

impl FrameContext<'_> {
    fn cell(&self, x: CoordInt, y: CoordInt) -> (&LabCell, &LabCellMeta) {
        static NULL_META: LabCellMeta = LabCellMeta {
            blocked: false,
            owner: None,
        };
        if x < 0 || x >= self.width || y < 0 || y >= self.height {
            (&self.null_cell, &NULL_META)
        } else {
            let index = (y * self.width + x) as usize;
            (&self.front[index], &self.meta[index])
        }
    }

    /// Compute the next state of cell `(x, y)` into `back`.
    pub(crate) fn update_cell(&self, x: CoordInt, y: CoordInt, back: &mut LabCell) {
        let index = (y * self.width + x) as usize;
        let front = &self.front[index];
        let meta = &self.meta[index];

        *back = *front;

        let (left, left_meta) = self.cell(x - 1, y);
        let (right, right_meta) = self.cell(x + 1, y);
        full_flow(
            0,
            back,
            front,
            meta,
            left,
            left_meta,
            right,
            right_meta,
            self.fog_diffusion,
        );

        let (top, top_meta) = self.cell(x, y - 1);
        let (bottom, bottom_meta) = self.cell(x, y + 1);
        full_flow(
            1,
            back,
            front,
            meta,
            top,
            top_meta,
            bottom,
            bottom_meta,
            self.fog_diffusion,
        );

        if !meta.blocked {
            back.refresh_heat_capacity();
        }

        debug_assert!(!back.air_pressure.is_nan());
        debug_assert!(!back.heat_energy.is_nan());
        debug_assert!(!back.fog_density.is_nan());
        debug_assert!(!back.flow[0].is_nan() && !back.flow[1].is_nan());
    }

    /// Update rows `[y0, y1)` into the corresponding slice of the back
    /// buffer. `out` starts at row `y0`.
    pub(crate) fn update_block(&self, y0: CoordInt, y1: CoordInt, out: &mut [LabCell]) {
        debug_assert!(y0 < y1 && y0 >= 0 && y1 <= self.height);
        for y in y0..y1 {
            for x in 0..self.width {
                let offset = ((y - y0) * self.width + x) as usize;
                self.update_cell(x, y, &mut out[offset]);
            }
        }
    }
}
