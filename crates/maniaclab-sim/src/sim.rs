//! The double-buffered automaton and its frame lifecycle.
//!
//! # Buffer roles
//!
//! ```text
//! front: read source of the in-flight / upcoming frame
//! back:  owner-writable between frames; write target during a frame
//! meta:  blocked flags + owning objects; only mutated between frames
//! ```
//!
//! `start_frame` swaps the roles (publishing the owner's mutations as the
//! new read source) and moves the whole buffer set into a job on the
//! worker pool; `wait_for_frame` receives it back. Between frames the
//! owner mutates `back` through the stamp operations and reads `front`
//! through the cell accessors and measurements. While a frame is in
//! flight the owner holds no buffers, so any access panics.

use std::mem;

use crossbeam_channel::{bounded, Receiver, Sender};
use rayon::prelude::*;
use tracing::{debug, trace, warn};

use maniaclab_core::consts::SUBDIVISION_COUNT;
use maniaclab_core::{CoordInt, CoordPair, ObjectId, SimFloat, Stamp};

use crate::cell::{CellInfo, LabCell, LabCellMeta, SimulationConfig};
use crate::kernel::FrameContext;
use crate::ROWS_PER_BLOCK;

/// The owner-held buffer set. Moved wholesale into each frame job.
pub(crate) struct SimBuffers {
    pub(crate) front: Vec<LabCell>,
    pub(crate) back: Vec<LabCell>,
    pub(crate) meta: Vec<LabCellMeta>,
}

/// Cellular automaton simulating air flow, heat conduction/convection,
/// and fog transport on the physics grid.
pub struct LabSim {
    width: CoordInt,
    height: CoordInt,
    config: SimulationConfig,
    null_cell: LabCell,
    buffers: Option<SimBuffers>,
    running: bool,
    pool: rayon::ThreadPool,
    frame_tx: Sender<SimBuffers>,
    frame_rx: Receiver<SimBuffers>,
    pub(crate) worker_count: usize,
    pub(crate) rgba_buffer: Vec<u32>,
    pub(crate) data_buffer: Vec<[f32; 4]>,
}

impl LabSim {
    /// Create an automaton over a `width × height` physics grid with all
    /// cells initialised from `config`.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is not positive.
    pub fn new(width: CoordInt, height: CoordInt, config: SimulationConfig) -> Self {
        assert!(
            width > 0 && height > 0,
            "physics grid dimensions must be positive, got {width}x{height}"
        );

        let cell_count = (width as usize) * (height as usize);
        let initial = LabCell::with_air(
            config.initial_air_pressure,
            config.initial_temperature,
            config.initial_fog_density,
        );

        let worker_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .thread_name(|i| format!("labsim-worker-{i}"))
            .build()
            .expect("failed to build simulation worker pool");

        let (frame_tx, frame_rx) = bounded(1);

        debug!(
            width,
            height,
            blocks = cell_count.div_ceil(ROWS_PER_BLOCK * width as usize),
            workers = worker_count,
            "simulation grid ready"
        );

        Self {
            width,
            height,
            config,
            null_cell: initial,
            buffers: Some(SimBuffers {
                front: vec![initial; cell_count],
                back: vec![initial; cell_count],
                meta: vec![LabCellMeta::default(); cell_count],
            }),
            running: false,
            pool,
            frame_tx,
            frame_rx,
            worker_count,
            rgba_buffer: Vec::new(),
            data_buffer: Vec::new(),
        }
    }

    /// Physics grid width.
    pub fn width(&self) -> CoordInt {
        self.width
    }

    /// Physics grid height.
    pub fn height(&self) -> CoordInt {
        self.height
    }

    /// The initial-value configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Whether a frame is currently in flight.
    pub fn running(&self) -> bool {
        self.running
    }

    fn index(&self, x: CoordInt, y: CoordInt) -> usize {
        debug_assert!(self.in_range(x, y));
        (x + self.width * y) as usize
    }

    fn in_range(&self, x: CoordInt, y: CoordInt) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    pub(crate) fn bufs(&self) -> &SimBuffers {
        self.buffers
            .as_ref()
            .expect("physics buffers are owned by an in-flight frame; call wait_for_frame() first")
    }

    fn bufs_mut(&mut self) -> &mut SimBuffers {
        self.buffers
            .as_mut()
            .expect("physics buffers are owned by an in-flight frame; call wait_for_frame() first")
    }

    // ── frame lifecycle ─────────────────────────────────────────────

    /// Publish the owner's mutations and advance the automaton one step
    /// on the worker pool. Returns immediately; the frame completes in
    /// the background.
    ///
    /// # Panics
    ///
    /// Panics if a frame is already in flight.
    pub fn start_frame(&mut self) {
        assert!(!self.running, "start_frame() called with a frame in flight");
        let mut bufs = self
            .buffers
            .take()
            .expect("buffers present while not running");
        mem::swap(&mut bufs.front, &mut bufs.back);
        self.running = true;

        let width = self.width;
        let height = self.height;
        let null_cell = self.null_cell;
        let fog_diffusion = self.config.fog_diffusion;
        let tx = self.frame_tx.clone();

        trace!("frame started");
        self.pool.spawn(move || {
            {
                let ctx = FrameContext {
                    front: bufs.front.as_slice(),
                    meta: bufs.meta.as_slice(),
                    width,
                    height,
                    null_cell,
                    fog_diffusion,
                };
                let rows_per_chunk = ROWS_PER_BLOCK * width as usize;
                bufs.back
                    .par_chunks_mut(rows_per_chunk)
                    .enumerate()
                    .for_each(|(block, out)| {
                        let y0 = (block * ROWS_PER_BLOCK) as CoordInt;
                        let y1 = y0 + (out.len() / width as usize) as CoordInt;
                        ctx.update_block(y0, y1, out);
                    });
            }
            // The owner may have been dropped mid-frame; the buffers die
            // with the job then.
            let _ = tx.send(bufs);
        });
    }

    /// Block until the in-flight frame (if any) completes and reclaim
    /// the buffers.
    pub fn wait_for_frame(&mut self) {
        if !self.running {
            return;
        }
        let bufs = self
            .frame_rx
            .recv()
            .expect("simulation worker pool disconnected");
        self.buffers = Some(bufs);
        self.running = false;
        trace!("frame finished");
    }

    // ── cell accessors (legal only between frames) ──────────────────

    /// Read a cell from the front buffer.
    pub fn front_cell_at(&self, x: CoordInt, y: CoordInt) -> &LabCell {
        let index = self.index(x, y);
        &self.bufs().front[index]
    }

    /// Read a cell from the front buffer, or `None` when out of range.
    pub fn safe_front_cell_at(&self, x: CoordInt, y: CoordInt) -> Option<&LabCell> {
        if self.in_range(x, y) {
            Some(self.front_cell_at(x, y))
        } else {
            None
        }
    }

    /// Mutable access to a cell of the back buffer.
    pub fn writable_cell_at(&mut self, x: CoordInt, y: CoordInt) -> &mut LabCell {
        let index = self.index(x, y);
        &mut self.bufs_mut().back[index]
    }

    /// Mutable access to a back-buffer cell, or `None` when out of range.
    pub fn safe_writable_cell_at(&mut self, x: CoordInt, y: CoordInt) -> Option<&mut LabCell> {
        if self.in_range(x, y) {
            Some(self.writable_cell_at(x, y))
        } else {
            None
        }
    }

    /// Metadata of a cell.
    pub fn meta_at(&self, x: CoordInt, y: CoordInt) -> &LabCellMeta {
        let index = self.index(x, y);
        &self.bufs().meta[index]
    }

    /// Set or clear the blocked flag of a single cell.
    pub fn set_blocked(&mut self, x: CoordInt, y: CoordInt, blocked: bool) {
        let index = self.index(x, y);
        self.bufs_mut().meta[index].blocked = blocked;
    }

    // ── stamp operations ────────────────────────────────────────────

    /// Zero out all footprint cells of `stamp` placed at `(dx, dy)` in
    /// both buffers and unblock them.
    pub fn clear_cells(&mut self, dx: CoordInt, dy: CoordInt, stamp: &Stamp) {
        let width = self.width;
        let height = self.height;
        let in_range =
            move |x: CoordInt, y: CoordInt| x >= 0 && x < width && y >= 0 && y < height;
        let bufs = self.bufs_mut();
        for p in stamp.occupied() {
            let x = p.x + dx;
            let y = p.y + dy;
            if !in_range(x, y) {
                continue;
            }
            let index = (x + width * y) as usize;
            bufs.front[index] = LabCell::default();
            bufs.back[index] = LabCell::default();
            bufs.meta[index] = LabCellMeta::default();
        }
    }

    /// Stamp an object into the grid: block its footprint cells, seed
    /// them with heat at `initial_temperature` and an outward flow, and
    /// redistribute the displaced air to the border.
    pub fn place_object(
        &mut self,
        dx: CoordInt,
        dy: CoordInt,
        owner: ObjectId,
        temp_coefficient: SimFloat,
        initial_temperature: SimFloat,
        stamp: &Stamp,
    ) {
        let heat_energy = initial_temperature * temp_coefficient;
        let half = SimFloat::from(SUBDIVISION_COUNT as i16) / 2.0;

        let mut cells = Vec::with_capacity(stamp.popcount());
        for &offs in stamp.occupied() {
            cells.push(CellInfo {
                offs,
                phys: LabCell {
                    air_pressure: 0.0,
                    heat_energy,
                    fog_density: 0.0,
                    // Push displaced air away from the footprint centre.
                    flow: [offs.x as SimFloat - half, offs.y as SimFloat - half],
                    heat_capacity: temp_coefficient,
                },
                meta: LabCellMeta {
                    blocked: true,
                    owner: Some(owner),
                },
            });
        }

        debug!(%owner, x = dx, y = dy, "placing object stamp");
        self.place_stamp(dx, dy, &cells, None);
    }

    /// Move a stamp from `(oldx, oldy)` to `(newx, newy)`, carrying the
    /// cell contents and metadata along and redistributing whatever the
    /// new footprint displaces. `vel` biases the redistribution towards
    /// the movement direction.
    pub fn move_stamp(
        &mut self,
        oldx: CoordInt,
        oldy: CoordInt,
        newx: CoordInt,
        newy: CoordInt,
        stamp: &Stamp,
        vel: Option<CoordPair>,
    ) {
        let width = self.width;
        let height = self.height;
        let in_range =
            move |x: CoordInt, y: CoordInt| x >= 0 && x < width && y >= 0 && y < height;

        let mut cells = Vec::with_capacity(stamp.popcount());
        {
            let bufs = self.bufs_mut();
            for &offs in stamp.occupied() {
                let x = offs.x + oldx;
                let y = offs.y + oldy;
                if !in_range(x, y) {
                    continue;
                }
                let index = (x + width * y) as usize;
                cells.push(CellInfo {
                    offs,
                    phys: bufs.back[index],
                    meta: bufs.meta[index],
                });
                bufs.front[index] = LabCell::default();
                bufs.back[index] = LabCell::default();
                bufs.meta[index] = LabCellMeta::default();
            }
        }

        self.place_stamp(newx, newy, &cells, vel);
    }

    /// Install the given cells at `(atx, aty)` and redistribute the
    /// displaced air, heat, and fog to the unblocked cells bordering
    /// the footprint: uniformly, or weighted by `max(0, n̂·v̂)` when a
    /// velocity is given.
    ///
    /// # Panics
    ///
    /// Panics when a footprint cell is already blocked; occupancy must
    /// be resolved by the object world before stamping.
    pub fn place_stamp(
        &mut self,
        atx: CoordInt,
        aty: CoordInt,
        cells: &[CellInfo],
        vel: Option<CoordPair>,
    ) {
        const INDEX_ROW_LENGTH: CoordInt = SUBDIVISION_COUNT + 2;
        const INDEX_LENGTH: usize = (INDEX_ROW_LENGTH * INDEX_ROW_LENGTH) as usize;
        const NEIGH_OFFS: [(CoordInt, CoordInt); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

        const UNVISITED: isize = -1;
        const REJECTED: isize = -2;

        let width = self.width;
        let height = self.height;
        let in_range =
            move |x: CoordInt, y: CoordInt| x >= 0 && x < width && y >= 0 && y < height;
        let bufs = self.bufs_mut();

        // Slot state per `[-1..=SUB]²` coordinate, keyed by footprint
        // offset so revisits are cheap.
        let mut border_indices = [UNVISITED; INDEX_LENGTH];
        let mut border_cells: [Option<usize>; INDEX_LENGTH] = [None; INDEX_LENGTH];
        let mut border_weights = [0f64; INDEX_LENGTH];
        let mut write_index = 0usize;
        let mut border_count = 0usize;
        let mut border_weight_sum = 0f64;

        let mut air_to_distribute = 0f64;
        let mut heat_to_distribute = 0f64;
        let mut fog_to_distribute = 0f64;

        let (vel_norm, vel_x, vel_y) = match vel {
            Some(v) if v.norm() > 0.0 => {
                let norm = v.norm();
                (norm, f64::from(v.x) / norm, f64::from(v.y) / norm)
            }
            _ => (0.0, 0.0, 0.0),
        };
        let direction_weight = |ox: CoordInt, oy: CoordInt| -> f64 {
            if vel_norm > 0.0 {
                (f64::from(ox) * vel_x + f64::from(oy) * vel_y).max(0.0)
            } else {
                1.0
            }
        };

        for info in cells {
            let p = info.offs;
            let x = p.x + atx;
            let y = p.y + aty;
            if !in_range(x, y) {
                continue;
            }
            let index = (x + width * y) as usize;
            assert!(
                !bufs.meta[index].blocked,
                "place_stamp over a blocked cell at ({x}, {y})"
            );

            air_to_distribute += f64::from(bufs.back[index].air_pressure);
            heat_to_distribute += f64::from(bufs.back[index].heat_energy);
            fog_to_distribute += f64::from(bufs.back[index].fog_density);

            bufs.back[index] = info.phys;
            // Newly placed objects must see their own values instead of
            // whatever the front buffer held before.
            bufs.front[index] = info.phys;
            bufs.meta[index] = info.meta;

            for &(ox, oy) in &NEIGH_OFFS {
                let slot = ((p.y + oy + 1) * INDEX_ROW_LENGTH + p.x + 1 + ox) as usize;
                if border_indices[slot] != UNVISITED {
                    let ci = border_indices[slot];
                    if ci >= 0 && vel_norm > 0.0 {
                        // Keep the maximum weight over all footprint
                        // cells adjacent to this border cell.
                        let weight = direction_weight(ox, oy);
                        let old = border_weights[ci as usize];
                        if old < weight {
                            border_weight_sum += weight - old;
                            border_weights[ci as usize] = weight;
                        }
                    }
                    continue;
                }

                let nx = x + ox;
                let ny = y + oy;
                if !in_range(nx, ny) {
                    border_indices[slot] = REJECTED;
                    continue;
                }
                let nindex = (nx + width * ny) as usize;
                if bufs.meta[nindex].blocked {
                    border_indices[slot] = REJECTED;
                    continue;
                }

                let weight = direction_weight(ox, oy);
                border_indices[slot] = write_index as isize;
                border_cells[write_index] = Some(nindex);
                border_weights[write_index] = weight;
                write_index += 1;
                border_count += 1;
                border_weight_sum += weight;
            }

            // The footprint cell itself can never take displaced matter,
            // even if an earlier iteration marked it as border.
            let slot = ((p.y + 1) * INDEX_ROW_LENGTH + p.x + 1) as usize;
            if border_indices[slot] >= 0 {
                let ci = border_indices[slot] as usize;
                border_count -= 1;
                border_cells[ci] = None;
                border_weight_sum -= border_weights[ci];
            }
            border_indices[slot] = REJECTED;

            debug_assert!(!bufs.back[index].heat_energy.is_nan());
        }

        if air_to_distribute == 0.0 && fog_to_distribute == 0.0 {
            return;
        }
        if border_count == 0 {
            warn!(
                x = atx,
                y = aty,
                "place_stamp: no unblocked border cells to take displaced matter"
            );
            return;
        }

        let weight_to_use = if border_weight_sum > 0.0 {
            border_weight_sum
        } else {
            border_count as f64
        };
        let air_per_weight = air_to_distribute / weight_to_use;
        let heat_per_weight = heat_to_distribute / weight_to_use;
        let fog_per_weight = fog_to_distribute / weight_to_use;

        for ci in 0..write_index {
            let Some(nindex) = border_cells[ci] else {
                continue;
            };
            let weight = if border_weight_sum > 0.0 {
                border_weights[ci]
            } else {
                1.0
            };
            let cell = &mut bufs.back[nindex];
            cell.air_pressure += (air_per_weight * weight) as SimFloat;
            cell.heat_energy += (heat_per_weight * weight) as SimFloat;
            cell.fog_density += (fog_per_weight * weight) as SimFloat;
            cell.refresh_heat_capacity();
            debug_assert!(!cell.heat_energy.is_nan());
        }
    }

    /// Set the temperature of all footprint cells, respecting each
    /// cell's heat capacity (object coefficient for blocked cells, air
    /// capacity otherwise).
    pub fn apply_temperature_stamp(
        &mut self,
        x: CoordInt,
        y: CoordInt,
        stamp: &Stamp,
        temperature: SimFloat,
    ) {
        let width = self.width;
        let height = self.height;
        let in_range =
            move |cx: CoordInt, cy: CoordInt| cx >= 0 && cx < width && cy >= 0 && cy < height;
        let bufs = self.bufs_mut();
        for p in stamp.occupied() {
            let cx = x + p.x;
            let cy = y + p.y;
            if !in_range(cx, cy) {
                continue;
            }
            let cell = &mut bufs.back[(cx + width * cy) as usize];
            cell.heat_energy = temperature * cell.heat_capacity;
        }
    }

    /// Add fog to all unblocked footprint cells, clamped to `[0, 1]`.
    pub fn apply_fog_effect_stamp(
        &mut self,
        x: CoordInt,
        y: CoordInt,
        stamp: &Stamp,
        intensity: SimFloat,
    ) {
        let width = self.width;
        let height = self.height;
        let in_range =
            move |cx: CoordInt, cy: CoordInt| cx >= 0 && cx < width && cy >= 0 && cy < height;
        let bufs = self.bufs_mut();
        for p in stamp.occupied() {
            let cx = x + p.x;
            let cy = y + p.y;
            if !in_range(cx, cy) {
                continue;
            }
            let index = (cx + width * cy) as usize;
            if bufs.meta[index].blocked {
                continue;
            }
            let cell = &mut bufs.back[index];
            cell.fog_density = (cell.fog_density + intensity).clamp(0.0, 1.0);
        }
    }

    /// Blend the flow of all unblocked footprint cells towards `flow`
    /// by `blend` (1 replaces, 0 leaves untouched).
    pub fn apply_flow_stamp(
        &mut self,
        x: CoordInt,
        y: CoordInt,
        stamp: &Stamp,
        flow: [SimFloat; 2],
        blend: SimFloat,
    ) {
        let width = self.width;
        let height = self.height;
        let in_range =
            move |cx: CoordInt, cy: CoordInt| cx >= 0 && cx < width && cy >= 0 && cy < height;
        let inv_blend = 1.0 - blend;
        let bufs = self.bufs_mut();
        for p in stamp.occupied() {
            let cx = x + p.x;
            let cy = y + p.y;
            if !in_range(cx, cy) {
                continue;
            }
            let index = (cx + width * cy) as usize;
            if bufs.meta[index].blocked {
                continue;
            }
            let cell = &mut bufs.back[index];
            cell.flow[0] = flow[0] * blend + cell.flow[0] * inv_blend;
            cell.flow[1] = flow[1] * blend + cell.flow[1] * inv_blend;
        }
    }

    /// Set the air pressure of all unblocked footprint cells.
    pub fn apply_pressure_stamp(
        &mut self,
        x: CoordInt,
        y: CoordInt,
        stamp: &Stamp,
        new_pressure: SimFloat,
    ) {
        let width = self.width;
        let height = self.height;
        let in_range =
            move |cx: CoordInt, cy: CoordInt| cx >= 0 && cx < width && cy >= 0 && cy < height;
        let bufs = self.bufs_mut();
        for p in stamp.occupied() {
            let cx = x + p.x;
            let cy = y + p.y;
            if !in_range(cx, cy) {
                continue;
            }
            let index = (cx + width * cy) as usize;
            if bufs.meta[index].blocked {
                continue;
            }
            let cell = &mut bufs.back[index];
            cell.air_pressure = new_pressure;
            cell.refresh_heat_capacity();
        }
    }

    /// Re-initialise every unblocked cell of the write buffer; blocked
    /// cells are untouched.
    pub fn reset_unblocked_cells(
        &mut self,
        pressure: SimFloat,
        temperature: SimFloat,
        fog_density: SimFloat,
    ) {
        let fresh = LabCell::with_air(pressure, temperature, fog_density);
        let bufs = self.bufs_mut();
        for (cell, meta) in bufs.back.iter_mut().zip(bufs.meta.iter()) {
            if meta.blocked {
                continue;
            }
            *cell = fresh;
        }
    }

    // ── readback ────────────────────────────────────────────────────

    /// Average `sensor` over the coordinates of a stamp placed at
    /// `(atx, aty)`, skipping out-of-range and, optionally, blocked
    /// cells. Returns NaN when no cell was sampled.
    pub fn measure_stamp_avg<F>(
        &self,
        atx: CoordInt,
        aty: CoordInt,
        coords: &[CoordPair],
        sensor: F,
        exclude_blocked: bool,
    ) -> SimFloat
    where
        F: Fn(&LabCell) -> SimFloat,
    {
        if coords.is_empty() {
            return SimFloat::NAN;
        }

        let mut accum = 0.0;
        let mut hits = 0.0;
        for p in coords {
            let x = p.x + atx;
            let y = p.y + aty;
            let Some(cell) = self.safe_front_cell_at(x, y) else {
                continue;
            };
            if exclude_blocked && self.meta_at(x, y).blocked {
                continue;
            }
            hits += 1.0;
            accum += sensor(cell);
        }

        if hits == 0.0 {
            return SimFloat::NAN;
        }
        accum / hits
    }

    /// Average of `sensor(cell) · (p − centre)/|p − centre|` over the
    /// coordinates, yielding the direction the quantity increases in.
    /// Returns `(NaN, NaN)` when no cell was sampled.
    pub fn measure_stamp_gradient<F>(
        &self,
        atx: CoordInt,
        aty: CoordInt,
        coords: &[CoordPair],
        sensor: F,
        exclude_blocked: bool,
    ) -> [SimFloat; 2]
    where
        F: Fn(&LabCell) -> SimFloat,
    {
        let centre = SimFloat::from(SUBDIVISION_COUNT as i16) / 2.0;
        let mut accum = [0.0f32; 2];
        let mut hits = 0.0f32;

        for p in coords {
            if p.x == 0 && p.y == 0 {
                continue;
            }
            let x = p.x + atx;
            let y = p.y + aty;

            let mut dx = p.x as SimFloat - centre;
            let mut dy = p.y as SimFloat - centre;
            let norm = (dx * dx + dy * dy).sqrt();
            if norm > 0.0 {
                dx /= norm;
                dy /= norm;
            }

            let Some(cell) = self.safe_front_cell_at(x, y) else {
                continue;
            };
            if exclude_blocked && self.meta_at(x, y).blocked {
                continue;
            }

            hits += 1.0;
            let value = sensor(cell);
            accum[0] += value * dx;
            accum[1] += value * dy;
        }

        if hits == 0.0 {
            return [SimFloat::NAN, SimFloat::NAN];
        }
        [accum[0] / hits, accum[1] / hits]
    }
}

impl Drop for LabSim {
    fn drop(&mut self) {
        // Reclaim the in-flight frame so the job never outlives the
        // grid it belongs to.
        self.wait_for_frame();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maniaclab_core::consts::{DEFAULT_PRESSURE, DEFAULT_TEMPERATURE};
    use maniaclab_core::stamp::CellStamp;
    use maniaclab_core::ObjectArena;

    fn sim(width: CoordInt, height: CoordInt) -> LabSim {
        LabSim::new(width, height, SimulationConfig::default())
    }

    fn total_pressure(sim: &mut LabSim) -> f64 {
        let mut total = 0.0;
        for y in 0..sim.height() {
            for x in 0..sim.width() {
                total += f64::from(sim.writable_cell_at(x, y).air_pressure);
            }
        }
        total
    }

    fn plus_stamp() -> Stamp {
        Stamp::new(&CellStamp::from_blocking([
            false, false, false, false, false, //
            false, false, true, false, false, //
            false, true, true, true, false, //
            false, false, true, false, false, //
            false, false, false, false, false,
        ]))
    }

    fn some_object_id() -> ObjectId {
        ObjectArena::new().insert(())
    }

    #[test]
    fn cells_start_at_configured_defaults() {
        let sim = sim(10, 10);
        let cell = sim.front_cell_at(3, 7);
        assert_eq!(cell.air_pressure, DEFAULT_PRESSURE);
        assert!((cell.temperature() - DEFAULT_TEMPERATURE).abs() < 1e-3);
        assert_eq!(cell.fog_density, 0.0);
    }

    #[test]
    fn safe_accessors_reject_out_of_range() {
        let mut sim = sim(4, 4);
        assert!(sim.safe_front_cell_at(-1, 0).is_none());
        assert!(sim.safe_front_cell_at(0, 4).is_none());
        assert!(sim.safe_writable_cell_at(4, 0).is_none());
        assert!(sim.safe_writable_cell_at(2, 2).is_some());
    }

    #[test]
    fn homogeneous_grid_conserves_pressure_over_frames() {
        let mut sim = sim(30, 30);
        let initial = total_pressure(&mut sim);
        for _ in 0..20 {
            sim.start_frame();
            sim.wait_for_frame();
        }
        let final_total = total_pressure(&mut sim);
        assert!(
            (initial - final_total).abs() < 1e-3 * 900.0,
            "pressure drifted: {initial} -> {final_total}"
        );
    }

    #[test]
    fn single_step_spreads_a_pressure_spike() {
        let mut sim = sim(10, 10);
        *sim.writable_cell_at(5, 5) = LabCell::with_air(2.0, DEFAULT_TEMPERATURE, 0.0);

        sim.start_frame();
        sim.wait_for_frame();

        let centre = sim.writable_cell_at(5, 5).air_pressure;
        assert!(centre < 2.0, "spike did not decay: {centre}");

        let lost = 2.0 - centre;
        let mut gained = 0.0;
        for (nx, ny) in [(5, 4), (5, 6), (4, 5), (6, 5)] {
            gained += sim.writable_cell_at(nx, ny).air_pressure - DEFAULT_PRESSURE;
        }
        assert!(
            (lost - gained).abs() < 1e-4,
            "neighbours gained {gained}, centre lost {lost}"
        );
    }

    #[test]
    fn frame_does_not_touch_its_read_source() {
        let mut sim = sim(12, 12);
        *sim.writable_cell_at(6, 6) = LabCell::with_air(3.0, DEFAULT_TEMPERATURE, 0.5);

        let snapshot: Vec<LabCell> = (0..12)
            .flat_map(|y| (0..12).map(move |x| (x, y)))
            .map(|(x, y)| *sim.writable_cell_at(x, y))
            .collect();

        sim.start_frame();
        sim.wait_for_frame();

        // The buffer we mutated became the frame's read source; it must
        // come back bit-identical.
        for (i, expected) in snapshot.iter().enumerate() {
            let x = (i % 12) as CoordInt;
            let y = (i / 12) as CoordInt;
            assert_eq!(sim.front_cell_at(x, y), expected, "front changed at ({x}, {y})");
        }
    }

    #[test]
    #[should_panic(expected = "in-flight frame")]
    fn mutation_during_frame_panics() {
        let mut sim = sim(20, 20);
        sim.start_frame();
        sim.set_blocked(0, 0, true);
    }

    #[test]
    #[should_panic(expected = "frame in flight")]
    fn double_start_panics() {
        let mut sim = sim(20, 20);
        sim.start_frame();
        sim.start_frame();
    }

    #[test]
    fn hot_cell_average_decays_monotonically() {
        let mut sim = sim(15, 15);
        let spot = [CoordPair::new(0, 0)];
        {
            let cell = sim.writable_cell_at(7, 7);
            cell.heat_energy = 10_000.0;
        }

        let mut last = f32::INFINITY;
        for _ in 0..10 {
            sim.start_frame();
            sim.wait_for_frame();
            let avg = sim.measure_stamp_avg(7, 7, &spot, |c| c.heat_energy, false);
            assert!(avg <= last, "hot cell heated up: {avg} > {last}");
            last = avg;
        }
    }

    #[test]
    fn place_object_blocks_and_conserves_displaced_air() {
        let mut sim = sim(20, 20);
        let before = total_pressure(&mut sim);

        let stamp = plus_stamp();
        sim.place_object(8, 8, some_object_id(), 2.0, 300.0, &stamp);

        for p in stamp.occupied() {
            let meta = sim.meta_at(8 + p.x, 8 + p.y);
            assert!(meta.blocked);
            assert!(meta.owner.is_some());
            let cell = *sim.writable_cell_at(8 + p.x, 8 + p.y);
            assert_eq!(cell.air_pressure, 0.0);
            assert_eq!(cell.heat_energy, 600.0);
            assert_eq!(cell.heat_capacity, 2.0);
        }

        // The displaced air went to the border; nothing vanished.
        let after = total_pressure(&mut sim);
        assert!(
            (before - after).abs() < 1e-4,
            "air lost while stamping: {before} -> {after}"
        );
    }

    #[test]
    fn clear_cells_unblocks_and_zeroes() {
        let mut sim = sim(20, 20);
        let stamp = plus_stamp();
        sim.place_object(5, 5, some_object_id(), 1.0, 300.0, &stamp);
        sim.clear_cells(5, 5, &stamp);
        for p in stamp.occupied() {
            assert!(!sim.meta_at(5 + p.x, 5 + p.y).blocked);
            assert_eq!(sim.writable_cell_at(5 + p.x, 5 + p.y).air_pressure, 0.0);
        }
    }

    #[test]
    fn move_stamp_carries_cells_along() {
        let mut sim = sim(30, 30);
        let stamp = plus_stamp();
        let id = some_object_id();
        sim.place_object(5, 5, id, 2.0, 400.0, &stamp);
        sim.move_stamp(5, 5, 6, 5, &stamp, Some(CoordPair::new(1, 0)));

        for p in stamp.occupied() {
            // Old cells are unblocked except where the new footprint
            // overlaps them.
            assert_eq!(
                sim.meta_at(5 + p.x, 5 + p.y).blocked,
                stamp.blocks(p.x - 1, p.y)
            );
            let meta = sim.meta_at(6 + p.x, 5 + p.y);
            assert!(meta.blocked);
            assert_eq!(meta.owner, Some(id));
            assert_eq!(sim.writable_cell_at(6 + p.x, 5 + p.y).heat_energy, 800.0);
        }
    }

    #[test]
    fn temperature_stamp_respects_capacity() {
        let mut sim = sim(20, 20);
        let stamp = plus_stamp();
        sim.apply_temperature_stamp(5, 5, &stamp, 500.0);
        // Unblocked cells have capacity == pressure == 1.
        assert_eq!(sim.writable_cell_at(7, 7).heat_energy, 500.0);
    }

    #[test]
    fn fog_stamp_clamps_to_unity() {
        let mut sim = sim(20, 20);
        let stamp = plus_stamp();
        sim.apply_fog_effect_stamp(5, 5, &stamp, 0.7);
        sim.apply_fog_effect_stamp(5, 5, &stamp, 0.7);
        assert_eq!(sim.writable_cell_at(7, 7).fog_density, 1.0);
    }

    #[test]
    fn flow_stamp_blends() {
        let mut sim = sim(20, 20);
        let stamp = plus_stamp();
        sim.apply_flow_stamp(5, 5, &stamp, [10.0, 0.0], 0.5);
        assert_eq!(sim.writable_cell_at(7, 7).flow, [5.0, 0.0]);
    }

    #[test]
    fn pressure_stamp_updates_capacity_cache() {
        let mut sim = sim(20, 20);
        let stamp = plus_stamp();
        sim.apply_pressure_stamp(5, 5, &stamp, 3.0);
        let cell = *sim.writable_cell_at(7, 7);
        assert_eq!(cell.air_pressure, 3.0);
        assert_eq!(cell.heat_capacity, 3.0);
    }

    #[test]
    fn reset_skips_blocked_cells() {
        let mut sim = sim(20, 20);
        let stamp = plus_stamp();
        let id = some_object_id();
        sim.place_object(5, 5, id, 2.0, 300.0, &stamp);
        sim.reset_unblocked_cells(DEFAULT_PRESSURE, DEFAULT_TEMPERATURE, 0.0);

        assert_eq!(sim.writable_cell_at(7, 7).heat_energy, 600.0);
        assert_eq!(sim.writable_cell_at(0, 0).air_pressure, DEFAULT_PRESSURE);
    }

    #[test]
    fn measure_avg_skips_blocked_when_asked() {
        let mut sim = sim(20, 20);
        let stamp = plus_stamp();
        sim.place_object(5, 5, some_object_id(), 2.0, 300.0, &stamp);
        // Frame swap publishes the placement to the front buffer.
        sim.start_frame();
        sim.wait_for_frame();

        let coords: Vec<CoordPair> = stamp.occupied().to_vec();
        let include = sim.measure_stamp_avg(5, 5, &coords, |c| c.air_pressure, false);
        let exclude = sim.measure_stamp_avg(5, 5, &coords, |c| c.air_pressure, true);
        assert_eq!(include, 0.0);
        assert!(exclude.is_nan(), "all sampled cells are blocked");
    }

    #[test]
    fn fog_diffusion_is_gated_by_config() {
        let mut off = sim(10, 10);
        off.writable_cell_at(5, 5).fog_density = 1.0;
        off.start_frame();
        off.wait_for_frame();
        // Without the flag, fog only travels with bulk air flow, and a
        // uniform grid has none.
        assert_eq!(off.writable_cell_at(5, 5).fog_density, 1.0);

        let config = SimulationConfig {
            fog_diffusion: true,
            ..SimulationConfig::default()
        };
        let mut on = LabSim::new(10, 10, config);
        on.writable_cell_at(5, 5).fog_density = 1.0;
        on.start_frame();
        on.wait_for_frame();
        assert!(on.writable_cell_at(5, 5).fog_density < 1.0);
        assert!(on.writable_cell_at(5, 4).fog_density > 0.0);
    }

    #[test]
    fn measure_avg_of_empty_coords_is_nan() {
        let sim = sim(5, 5);
        assert!(sim.measure_stamp_avg(2, 2, &[], |c| c.air_pressure, false).is_nan());
    }

    #[test]
    fn gradient_points_towards_higher_pressure() {
        let mut sim = sim(20, 20);
        // Pressure rises with x across the border ring of the footprint.
        for y in 0..20 {
            for x in 0..20 {
                let cell = sim.writable_cell_at(x, y);
                cell.air_pressure = x as SimFloat;
                cell.refresh_heat_capacity();
            }
        }
        sim.start_frame();
        sim.wait_for_frame();
        // The frame swap published the ramp as the measurement source.
        let stamp = plus_stamp();
        let grad = sim.measure_stamp_gradient(8, 8, stamp.border(), |c| c.air_pressure, false);
        assert!(grad[0] > 0.0, "gradient x should be positive: {:?}", grad);
        assert!(grad[1].abs() < grad[0], "gradient should be x-dominated: {:?}", grad);
    }
}
