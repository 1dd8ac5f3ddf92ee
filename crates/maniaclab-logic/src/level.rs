//! The object world: cells, placement, the tick loop, and explosions.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use maniaclab_core::consts::{
    EXPLOSION_BLOCK_LIFETIME, EXPLOSION_TRIGGER_TIMEOUT, SUBDIVISION_COUNT, TIME_SLICE,
};
use maniaclab_core::{CoordInt, CoordPair, ObjectArena, ObjectId, SimFloat, Stamp, TickCounter};
use maniaclab_sim::{LabCell, LabSim, SimulationConfig};

use crate::object::GameObject;
use crate::objects::explosion;
use crate::particles::{ParticleSystem, ParticleType};
use crate::timer::{Timer, TimerQueue};

/// One cell of the game grid.
///
/// `here` is the owning reference of the resident object;
/// `reserved_by` is a non-owning back-reference of an object moving
/// through or out of the cell.
#[derive(Clone, Copy, Debug, Default)]
pub struct LevelCell {
    /// Resident object.
    pub here: Option<ObjectId>,
    /// Object holding a movement reservation on this cell.
    pub reserved_by: Option<ObjectId>,
}

/// Callback sink for player death and object spawn events.
pub type ObjectEventHandler = Box<dyn FnMut(ObjectId)>;

/// The game world: a grid of cells, the objects living in them, the
/// embedded fluid automaton, particles, and timers.
pub struct Level {
    pub(crate) rng: ChaCha8Rng,
    width: CoordInt,
    height: CoordInt,
    pub(crate) cells: Vec<LevelCell>,
    pub(crate) objects: ObjectArena<GameObject>,
    pub(crate) physics: LabSim,
    player: Option<ObjectId>,
    on_player_death: Option<ObjectEventHandler>,
    on_object_spawn: Option<ObjectEventHandler>,
    pub(crate) particles: ParticleSystem,
    ticks: TickCounter,
    pub(crate) timers: TimerQueue,
}

impl Level {
    /// Create an empty level with an entropy-seeded RNG.
    pub fn new(width: CoordInt, height: CoordInt) -> Self {
        Self::with_seed(width, height, rand::thread_rng().gen())
    }

    /// Create an empty level with a deterministic RNG seed.
    pub fn with_seed(width: CoordInt, height: CoordInt, seed: u64) -> Self {
        assert!(
            width > 0 && height > 0,
            "level dimensions must be positive, got {width}x{height}"
        );
        let cell_count = (width as usize) * (height as usize);
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            width,
            height,
            cells: vec![LevelCell::default(); cell_count],
            objects: ObjectArena::new(),
            physics: LabSim::new(
                width * SUBDIVISION_COUNT,
                height * SUBDIVISION_COUNT,
                SimulationConfig::default(),
            ),
            player: None,
            on_player_death: None,
            on_object_spawn: None,
            particles: ParticleSystem::new(),
            ticks: 0,
            timers: TimerQueue::new(),
        }
    }

    /// Game grid width.
    pub fn width(&self) -> CoordInt {
        self.width
    }

    /// Game grid height.
    pub fn height(&self) -> CoordInt {
        self.height
    }

    /// Current tick.
    pub fn get_ticks(&self) -> TickCounter {
        self.ticks
    }

    /// The embedded fluid automaton.
    pub fn physics(&mut self) -> &mut LabSim {
        &mut self.physics
    }

    /// The particle system.
    pub fn particles(&mut self) -> &mut ParticleSystem {
        &mut self.particles
    }

    /// The object arena.
    pub fn objects(&self) -> &ObjectArena<GameObject> {
        &self.objects
    }

    /// The player's handle, if one was placed and is still alive.
    pub fn player(&self) -> Option<ObjectId> {
        self.player
    }

    /// Cell at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics when the coordinates are out of range.
    pub fn get_cell(&self, x: CoordInt, y: CoordInt) -> &LevelCell {
        &self.cells[self.cell_index(x, y)]
    }

    pub(crate) fn cell_mut(&mut self, x: CoordInt, y: CoordInt) -> &mut LevelCell {
        let index = self.cell_index(x, y);
        &mut self.cells[index]
    }

    fn cell_index(&self, x: CoordInt, y: CoordInt) -> usize {
        assert!(
            x >= 0 && x < self.width && y >= 0 && y < self.height,
            "cell ({x}, {y}) outside the {}x{} level",
            self.width,
            self.height
        );
        (x + y * self.width) as usize
    }

    /// Physics-grid coordinates of a continuous game position.
    pub fn get_physics_coords(&self, x: SimFloat, y: SimFloat) -> CoordPair {
        CoordPair::new(
            (x * SUBDIVISION_COUNT as SimFloat).round() as CoordInt,
            (y * SUBDIVISION_COUNT as SimFloat).round() as CoordInt,
        )
    }

    /// Install a handler for the player-death event.
    pub fn on_player_death(&mut self, handler: ObjectEventHandler) {
        self.on_player_death = Some(handler);
    }

    /// Install a handler for the object-spawn event.
    pub fn on_object_spawn(&mut self, handler: ObjectEventHandler) {
        self.on_object_spawn = Some(handler);
    }

    /// Schedule a timer. Timers due at or before the current tick fire
    /// during the next [`update`](Self::update).
    pub fn add_timer(&mut self, timer: Timer) {
        self.timers.push(timer);
    }

    // ── tick loop ───────────────────────────────────────────────────

    /// Advance the world one tick.
    pub fn update(&mut self) {
        self.ticks += 1;

        self.physics.wait_for_frame();

        while let Some(timer) = self.timers.pop_due(self.ticks) {
            timer.fire(self);
        }

        // Bottom-to-top, so an object falling into the row below is not
        // revisited within the same tick.
        for y in (0..self.height).rev() {
            for x in 0..self.width {
                let Some(id) = self.get_cell(x, y).here else {
                    continue;
                };
                self.update_object(id);
            }
        }

        let ignitions =
            self.particles
                .update(TIME_SLICE as f32, &mut self.physics, &mut self.rng);
        for id in ignitions {
            self.ignition_touch(id);
        }

        self.physics.start_frame();
    }

    // ── placement and cleanup ───────────────────────────────────────

    /// Put an object into the level at `(x, y)` with the given initial
    /// stamp temperature, resolving any occupancy conflict first: a
    /// reserver moving out of the cell is fast-forwarded, and an
    /// existing resident is destroyed.
    pub fn place_object(
        &mut self,
        obj: GameObject,
        x: CoordInt,
        y: CoordInt,
        initial_temperature: SimFloat,
    ) -> ObjectId {
        self.physics.wait_for_frame();

        if let Some(reserver) = self.get_cell(x, y).reserved_by {
            debug!(%reserver, x, y, "fast-forwarding reserver before placement");
            self.fast_forward_movement(reserver);
            debug_assert!(self.get_cell(x, y).reserved_by.is_none());
        }
        if let Some(resident) = self.get_cell(x, y).here {
            let mid_move = self
                .objects
                .get(resident)
                .is_some_and(|o| o.movement.is_some());
            if mid_move {
                self.fast_forward_movement(resident);
            }
        }
        self.cleanup_cell(x, y);

        let mut obj = obj;
        obj.x = x as SimFloat;
        obj.y = y as SimFloat;
        obj.cell = CoordPair::new(x, y);
        obj.phy = self.get_physics_coords(obj.x, obj.y);

        let info = obj.info;
        let heat_capacity = obj.heat_capacity;
        let phy = obj.phy;
        let id = self.objects.insert(obj);

        self.physics.place_object(
            phy.x,
            phy.y,
            id,
            heat_capacity,
            initial_temperature,
            &info.stamp,
        );
        self.cell_mut(x, y).here = Some(id);

        if let Some(mut handler) = self.on_object_spawn.take() {
            handler(id);
            self.on_object_spawn = Some(handler);
        }

        id
    }

    /// Place the player object. Does nothing and returns `None` when a
    /// player already exists.
    pub fn place_player(&mut self, player: GameObject, x: CoordInt, y: CoordInt) -> Option<ObjectId> {
        if self.player.is_some() {
            return None;
        }
        let id = self.place_object(player, x, y, 1.0);
        self.player = Some(id);
        Some(id)
    }

    /// Destroy the resident of `(x, y)`: fires the player-death event
    /// if it is the player, releases any movement reservations it
    /// holds, clears its stamp from the fluid, and drops it.
    pub fn cleanup_cell(&mut self, x: CoordInt, y: CoordInt) {
        let Some(id) = self.get_cell(x, y).here else {
            return;
        };

        if self.player == Some(id) {
            self.player = None;
            debug!(%id, "player died");
            if let Some(mut handler) = self.on_player_death.take() {
                handler(id);
                self.on_player_death = Some(handler);
            }
        }

        // A mid-movement resident still holds reservations; release
        // them so no stale back-reference survives the object.
        let movement = self.objects.get(id).and_then(|o| o.movement);
        if let Some(movement) = movement {
            match movement {
                crate::movement::Movement::Straight(m) => {
                    self.cell_mut(m.from.x, m.from.y).reserved_by = None;
                }
                crate::movement::Movement::Roll(m) => {
                    self.cell_mut(m.via.x, m.via.y).reserved_by = None;
                    self.cell_mut(m.from.x, m.from.y).reserved_by = None;
                }
            }
        }

        if let Some(obj) = self.objects.get(id) {
            let phy = obj.phy;
            let info = obj.info;
            self.physics.clear_cells(phy.x, phy.y, &info.stamp);
        }

        self.cell_mut(x, y).here = None;
        self.objects.remove(id);
    }

    /// Whether `(x, y)` and the cell below it are both free and
    /// unreserved, i.e. a round object can roll through. Returns the
    /// two cell coordinates.
    pub fn get_fall_channel(&self, x: CoordInt, y: CoordInt) -> Option<(CoordPair, CoordPair)> {
        let aside = self.get_cell(x, y);
        if aside.here.is_some() || aside.reserved_by.is_some() {
            return None;
        }
        let aside_below = self.get_cell(x, y + 1);
        if aside_below.here.is_some() || aside_below.reserved_by.is_some() {
            return None;
        }
        Some((CoordPair::new(x, y), CoordPair::new(x, y + 1)))
    }

    // ── explosions ──────────────────────────────────────────────────

    /// Schedule an explosion at `(x, y)`: after
    /// `EXPLOSION_TRIGGER_TIMEOUT` ticks the cell's resident is
    /// explosion-touched and, if the cell ends up empty, an explosion
    /// block appears. Spawns a handful of fire particles right away.
    ///
    /// Cells whose resident is indestructible are left alone.
    pub fn add_explosion(&mut self, x: CoordInt, y: CoordInt) {
        let shielded = self
            .get_cell(x, y)
            .here
            .and_then(|id| self.objects.get(id))
            .is_some_and(|obj| !obj.info.is_destructible);
        if shielded {
            return;
        }

        self.timers.push(Timer::new(
            self.ticks + EXPLOSION_TRIGGER_TIMEOUT,
            x,
            y,
            Box::new(move |level| {
                if let Some(id) = level.get_cell(x, y).here {
                    level.explosion_touch(id);
                }
                if level.get_cell(x, y).here.is_none() {
                    let block = explosion::explosion_object(level.get_ticks());
                    level.place_object(block, x, y, 1.0);
                }
            }),
        ));

        let rng = &mut self.rng;
        self.particles.spawn_generator(6, |_, part| {
            part.kind = ParticleType::Fire;
            let offs_x = rng.gen_range(-0.2f32..0.2);
            let offs_y = rng.gen_range(-0.2f32..0.2);
            part.x = x as f32 + 0.5 + offs_x;
            part.y = y as f32 + 0.5 + offs_y;
            part.vx = offs_x / 2.0;
            part.vy = offs_y / 2.0;
            part.ax = 0.0;
            part.ay = 0.0;
            part.phi = rng.gen_range(0.0..std::f32::consts::TAU);
            part.vphi = rng.gen_range(-std::f32::consts::TAU / 10.0..std::f32::consts::TAU / 10.0);
            part.aphi = 0.0;
            part.lifetime = (EXPLOSION_BLOCK_LIFETIME + EXPLOSION_TRIGGER_TIMEOUT) as f32
                * TIME_SLICE as f32;
        });
    }

    /// Apply [`add_explosion`](Self::add_explosion) over a rectangle
    /// centred at `(x0, y0)`, clamped to the level bounds.
    pub fn add_large_explosion(
        &mut self,
        x0: CoordInt,
        y0: CoordInt,
        xradius: CoordInt,
        yradius: CoordInt,
    ) {
        let min_x = if x0 > xradius - 1 { x0 - xradius } else { x0 };
        let min_y = if y0 > yradius - 1 { y0 - yradius } else { y0 };
        let max_x = if x0 < self.width - xradius { x0 + xradius } else { x0 };
        let max_y = if y0 < self.height - yradius { y0 + yradius } else { y0 };

        debug!(x0, y0, xradius, yradius, "large explosion");
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                self.add_explosion(x, y);
            }
        }
    }

    /// Like [`add_large_explosion`](Self::add_large_explosion), with a
    /// ring of outward-flying fire particles per affected cell.
    pub fn add_large_particle_explosion(
        &mut self,
        x0: CoordInt,
        y0: CoordInt,
        xradius: CoordInt,
        yradius: CoordInt,
    ) {
        const SPAWN_MAP: [CoordPair; 8] = [
            CoordPair::new(1, 1),
            CoordPair::new(1, 0),
            CoordPair::new(1, -1),
            CoordPair::new(0, -1),
            CoordPair::new(-1, -1),
            CoordPair::new(-1, 0),
            CoordPair::new(-1, 1),
            CoordPair::new(0, 1),
        ];

        let min_x = if x0 > xradius - 1 { x0 - xradius } else { x0 };
        let min_y = if y0 > yradius - 1 { y0 - yradius } else { y0 };
        let max_x = if x0 < self.width - xradius { x0 + xradius } else { x0 };
        let max_y = if y0 < self.height - yradius { y0 + yradius } else { y0 };

        for x in min_x..=max_x {
            let dx = (x - x0) as f32 / (xradius + 1) as f32;
            for y in min_y..=max_y {
                let dy = (y - y0) as f32 / (yradius + 1) as f32;

                let rng = &mut self.rng;
                self.particles.spawn_generator(8, |i, part| {
                    part.kind = ParticleType::Fire;
                    let spawn = SPAWN_MAP[i % 8];
                    let offs_x = dx / 2.0 + spawn.x as f32 / 4.0;
                    let offs_y = dy / 2.0 + spawn.y as f32 / 4.0;
                    part.x = x0 as f32 + 0.5 + offs_x;
                    part.y = y0 as f32 + 0.5 + offs_y;
                    part.vx = dx * (xradius + 1) as f32 + offs_x;
                    part.vy = dy * (yradius + 1) as f32 + offs_y;
                    part.ax = 0.0;
                    part.ay = 0.0;
                    part.phi = rng.gen_range(0.0..std::f32::consts::TAU);
                    part.vphi =
                        rng.gen_range(-std::f32::consts::TAU / 10.0..std::f32::consts::TAU / 10.0);
                    part.aphi = 0.0;
                    part.lifetime =
                        (EXPLOSION_BLOCK_LIFETIME + EXPLOSION_TRIGGER_TIMEOUT) as f32 / 100.0;
                });

                let shielded = self
                    .get_cell(x, y)
                    .here
                    .and_then(|id| self.objects.get(id))
                    .is_some_and(|obj| !obj.info.is_destructible);
                if shielded {
                    continue;
                }

                self.timers.push(Timer::new(
                    self.ticks + EXPLOSION_TRIGGER_TIMEOUT,
                    x,
                    y,
                    Box::new(move |level| {
                        if let Some(id) = level.get_cell(x, y).here {
                            level.explosion_touch(id);
                        }
                        if level.get_cell(x, y).here.is_none() {
                            let block = explosion::explosion_object(level.get_ticks());
                            level.place_object(block, x, y, 1.0);
                        }
                    }),
                ));
            }
        }
    }

    // ── fluid readback ──────────────────────────────────────────────

    /// Average `sensor` over the object's footprint cells.
    pub fn measure_object_avg<F>(&self, id: ObjectId, sensor: F) -> SimFloat
    where
        F: Fn(&LabCell) -> SimFloat,
    {
        let Some(obj) = self.objects.get(id) else {
            return SimFloat::NAN;
        };
        self.physics.measure_stamp_avg(
            obj.phy.x,
            obj.phy.y,
            obj.info.stamp.occupied(),
            sensor,
            false,
        )
    }

    /// Average `sensor` over a stamp placed at physics coordinates
    /// `(x, y)`.
    pub fn measure_stamp_avg<F>(&self, x: CoordInt, y: CoordInt, stamp: &Stamp, sensor: F) -> SimFloat
    where
        F: Fn(&LabCell) -> SimFloat,
    {
        self.physics
            .measure_stamp_avg(x, y, stamp.occupied(), sensor, false)
    }

    /// Average `sensor` over the border of the resident of game cell
    /// `(x, y)`. Returns 0 for an empty cell.
    pub fn measure_border_avg<F>(
        &self,
        x: CoordInt,
        y: CoordInt,
        sensor: F,
        exclude_blocked: bool,
    ) -> SimFloat
    where
        F: Fn(&LabCell) -> SimFloat,
    {
        let Some(id) = self.get_cell(x, y).here else {
            return 0.0;
        };
        let Some(obj) = self.objects.get(id) else {
            return 0.0;
        };
        let coords = self.get_physics_coords(x as SimFloat, y as SimFloat);
        self.physics.measure_stamp_avg(
            coords.x,
            coords.y,
            obj.info.stamp.border(),
            sensor,
            exclude_blocked,
        )
    }

    /// Gradient of `sensor` over the object's border ring.
    pub fn measure_object_gradient<F>(
        &self,
        id: ObjectId,
        sensor: F,
        exclude_blocked: bool,
    ) -> [SimFloat; 2]
    where
        F: Fn(&LabCell) -> SimFloat,
    {
        let Some(obj) = self.objects.get(id) else {
            return [SimFloat::NAN, SimFloat::NAN];
        };
        self.physics.measure_stamp_gradient(
            obj.phy.x,
            obj.phy.y,
            obj.info.stamp.border(),
            sensor,
            exclude_blocked,
        )
    }
}
