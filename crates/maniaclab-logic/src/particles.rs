//! Chunk-allocated particles riding on top of the fluid.
//!
//! Particles live in fixed-size chunks drawn from a free list; the
//! active set is a separate index list, so `update` never allocates
//! per particle. Fire particles heat the cell under them, spawn
//! secondary sparks, and reflect off blocked cells.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use maniaclab_core::consts::{FIRE_PARTICLE_TEMPERATURE_RISE, SUBDIVISION_COUNT};
use maniaclab_core::ObjectId;
use maniaclab_sim::LabSim;

/// Particles per allocation chunk.
pub const CHUNK_SIZE: usize = 1024;

/// Kind of a physics particle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParticleType {
    /// Primary fire particle; heats cells and spawns sparks.
    #[default]
    Fire,
    /// Spark shed by a fire particle.
    FireSecondary,
}

/// One particle slot.
#[derive(Clone, Copy, Debug, Default)]
pub struct Particle {
    /// Whether the slot is in use.
    pub alive: bool,
    /// Seconds lived so far.
    pub age: f32,
    /// Seconds until expiry.
    pub lifetime: f32,
    /// Position in game-cell units.
    pub x: f32,
    /// Position in game-cell units.
    pub y: f32,
    /// Velocity.
    pub vx: f32,
    /// Velocity.
    pub vy: f32,
    /// Acceleration.
    pub ax: f32,
    /// Acceleration.
    pub ay: f32,
    /// Rotation angle.
    pub phi: f32,
    /// Angular velocity.
    pub vphi: f32,
    /// Angular acceleration.
    pub aphi: f32,
    /// Secondary-spawn counter.
    pub ctr: u32,
    /// Particle kind.
    pub kind: ParticleType,
}

/// Explicit Euler with a half-step on the position.
fn update_coord(dt: f32, pos: &mut f32, vel: &mut f32, acc: f32) {
    *pos += *vel * dt + acc * dt / 2.0;
    *vel += acc * dt;
}

/// Fixed-chunk particle allocator with free and active index lists.
///
/// Every allocated slot is either on the free list or in the active
/// list, never both.
#[derive(Default)]
pub struct ParticleSystem {
    chunks: Vec<Box<[Particle; CHUNK_SIZE]>>,
    free: Vec<u32>,
    active: Vec<u32>,
}

impl ParticleSystem {
    /// Create an empty system; chunks are allocated on demand.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live particles.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Iterate over the live particles.
    pub fn iter_active(&self) -> impl Iterator<Item = &Particle> {
        self.active.iter().map(move |&slot| self.get(slot))
    }

    fn get(&self, slot: u32) -> &Particle {
        &self.chunks[slot as usize / CHUNK_SIZE][slot as usize % CHUNK_SIZE]
    }

    fn get_mut(&mut self, slot: u32) -> &mut Particle {
        &mut self.chunks[slot as usize / CHUNK_SIZE][slot as usize % CHUNK_SIZE]
    }

    fn grow(&mut self) {
        let base = (self.chunks.len() * CHUNK_SIZE) as u32;
        self.chunks
            .push(Box::new([Particle::default(); CHUNK_SIZE]));
        for i in (0..CHUNK_SIZE as u32).rev() {
            self.free.push(base + i);
        }
    }

    fn allocate(&mut self) -> u32 {
        if self.free.is_empty() {
            self.grow();
        }
        let slot = self.free.pop().expect("free list refilled by grow");
        let part = self.get_mut(slot);
        *part = Particle {
            alive: true,
            ..Particle::default()
        };
        slot
    }

    /// Allocate one particle and mark it active. The caller fills in
    /// the kinematic state.
    pub fn spawn(&mut self) -> &mut Particle {
        let slot = self.allocate();
        self.active.push(slot);
        self.get_mut(slot)
    }

    /// Allocate `n` particles, initialise each through `generator`, and
    /// admit those with a positive lifetime.
    pub fn spawn_generator<F>(&mut self, n: usize, mut generator: F)
    where
        F: FnMut(usize, &mut Particle),
    {
        for i in 0..n {
            let slot = self.allocate();
            generator(i, self.get_mut(slot));
            if self.get(slot).lifetime > 0.0 {
                self.active.push(slot);
            } else {
                self.get_mut(slot).alive = false;
                self.free.push(slot);
            }
        }
    }

    /// Advance all particles by `dt` seconds against the fluid grid.
    ///
    /// Returns the owners of blocked cells that were hit by fire
    /// particles this step, for ignition notification.
    pub fn update(&mut self, dt: f32, physics: &mut LabSim, rng: &mut ChaCha8Rng) -> Vec<ObjectId> {
        const FIRE_FLOW_INFLUENCE: f32 = 1e-1;
        const FIRE_SECONDARY_FLOW_INFLUENCE: f32 = 5e-1;

        let width_phy = physics.width();
        let height_phy = physics.height();
        let mut ignitions = Vec::new();

        let mut i = 0;
        while i < self.active.len() {
            let slot = self.active[i];
            let mut part = *self.get(slot);

            part.age += dt;
            if part.age > part.lifetime {
                self.get_mut(slot).alive = false;
                self.active.swap_remove(i);
                self.free.push(slot);
                continue;
            }

            update_coord(dt, &mut part.x, &mut part.vx, part.ax);
            update_coord(dt, &mut part.y, &mut part.vy, part.ay);
            update_coord(dt, &mut part.phi, &mut part.vphi, part.aphi);

            if part.kind == ParticleType::Fire {
                let old_ctr = part.ctr;
                let new_ctr = (part.age * 25.0) as u32;
                part.ctr = new_ctr;

                for _ in old_ctr..new_ctr {
                    let jitter_x = rng.gen::<f32>();
                    let jitter_y = rng.gen::<f32>();
                    let lifetime = 4.0 + rng.gen::<f32>() * 2.0 - 1.0;
                    let phi = rng.gen_range(0.0..std::f32::consts::TAU);
                    let spark = self.spawn();
                    spark.kind = ParticleType::FireSecondary;
                    spark.lifetime = lifetime;
                    spark.x = part.x - jitter_x * part.vx * 0.01;
                    spark.y = part.y - jitter_y * part.vy * 0.01;
                    spark.vx = part.vx * 0.1;
                    spark.vy = part.vy * 0.1;
                    spark.ax = 0.0;
                    spark.ay = -0.2;
                    spark.phi = phi;
                    spark.vphi = part.vphi;
                    spark.aphi = 0.0;
                }
            }

            let px = (part.x * SUBDIVISION_COUNT as f32).round() as i32;
            let py = (part.y * SUBDIVISION_COUNT as f32).round() as i32;
            if px < 0 || py < 0 || px >= width_phy || py >= height_phy {
                *self.get_mut(slot) = part;
                i += 1;
                continue;
            }

            let meta = *physics.meta_at(px, py);
            let cell = physics.writable_cell_at(px, py);

            match part.kind {
                ParticleType::Fire => {
                    if !meta.blocked {
                        part.vx = part.vx * (1.0 - FIRE_FLOW_INFLUENCE)
                            - cell.flow[0] * FIRE_FLOW_INFLUENCE;
                        part.vy = part.vy * (1.0 - FIRE_FLOW_INFLUENCE)
                            - cell.flow[1] * FIRE_FLOW_INFLUENCE;
                    }

                    cell.heat_energy += FIRE_PARTICLE_TEMPERATURE_RISE * cell.heat_capacity;

                    if meta.blocked {
                        if let Some(owner) = meta.owner {
                            ignitions.push(owner);
                        }
                    }
                }
                ParticleType::FireSecondary => {
                    if !meta.blocked {
                        part.vx = part.vx * (1.0 - FIRE_SECONDARY_FLOW_INFLUENCE)
                            - cell.flow[0] * FIRE_SECONDARY_FLOW_INFLUENCE;
                        part.vy = part.vy * (1.0 - FIRE_SECONDARY_FLOW_INFLUENCE)
                            - cell.flow[1] * FIRE_SECONDARY_FLOW_INFLUENCE;
                    }
                }
            }

            if meta.blocked {
                handle_collision(physics, &mut part, rng);
            }

            *self.get_mut(slot) = part;
            i += 1;
        }

        ignitions
    }
}

/// Back a particle out of a blocked cell along its incoming ray and
/// reflect its velocity, damped and with a little jitter.
fn handle_collision(physics: &LabSim, part: &mut Particle, rng: &mut ChaCha8Rng) {
    let speed = (part.vx * part.vx + part.vy * part.vy).sqrt();
    if speed < 1e-12 {
        return;
    }
    let step_x = -part.vx / speed;
    let step_y = -part.vy / speed;

    let mut pos_x = part.x * SUBDIVISION_COUNT as f32;
    let mut pos_y = part.y * SUBDIVISION_COUNT as f32;

    let mut in_grid = true;
    for _ in 0..10 {
        pos_x += step_x;
        pos_y += step_y;
        let cx = pos_x.round() as i32;
        let cy = pos_y.round() as i32;

        if physics.safe_front_cell_at(cx, cy).is_none() {
            in_grid = false;
            break;
        }
        if physics.meta_at(cx, cy).blocked {
            continue;
        }
        break;
    }

    part.x = pos_x / SUBDIVISION_COUNT as f32;
    part.y = pos_y / SUBDIVISION_COUNT as f32;

    if !in_grid {
        // Out of the game area; nothing left to bounce off.
        return;
    }

    // Reflect across the incoming direction.
    let normal_x = -step_x;
    let normal_y = -step_y;
    let along = part.vx * normal_x + part.vy * normal_y;
    let reflected_x = part.vx - 2.0 * along * normal_x;
    let reflected_y = part.vy - 2.0 * along * normal_y;
    let magnitude = (reflected_x * reflected_x + reflected_y * reflected_y).sqrt();

    part.vx = reflected_x * 0.4 + (rng.gen::<f32>() * 2.0 - 1.0) * magnitude * 0.3;
    part.vy = reflected_y * 0.4 + (rng.gen::<f32>() * 2.0 - 1.0) * magnitude * 0.3;
}

#[cfg(test)]
mod tests {
    use super::*;
    use maniaclab_sim::SimulationConfig;
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    fn physics() -> LabSim {
        LabSim::new(50, 50, SimulationConfig::default())
    }

    #[test]
    fn spawned_particles_with_lifetime_become_active() {
        let mut system = ParticleSystem::new();
        system.spawn_generator(4, |i, part| {
            part.lifetime = if i % 2 == 0 { 1.0 } else { 0.0 };
        });
        assert_eq!(system.active_count(), 2);
    }

    #[test]
    fn expired_particles_return_to_the_free_list() {
        let mut system = ParticleSystem::new();
        let mut physics = physics();
        let mut rng = rng();
        system.spawn_generator(3, |_, part| {
            part.kind = ParticleType::FireSecondary;
            part.lifetime = 0.05;
            part.x = 2.0;
            part.y = 2.0;
        });
        assert_eq!(system.active_count(), 3);

        // Two 0.04 s steps push every particle past its lifetime.
        system.update(0.04, &mut physics, &mut rng);
        system.update(0.04, &mut physics, &mut rng);
        assert_eq!(system.active_count(), 0);

        // Slots are reusable afterwards.
        system.spawn_generator(3, |_, part| part.lifetime = 1.0);
        assert_eq!(system.active_count(), 3);
    }

    #[test]
    fn kinematics_integrate_position_and_velocity() {
        let mut system = ParticleSystem::new();
        let mut physics = physics();
        let mut rng = rng();
        system.spawn_generator(1, |_, part| {
            part.kind = ParticleType::FireSecondary;
            part.lifetime = 10.0;
            part.x = 5.0;
            part.y = 5.0;
            part.vx = 1.0;
            part.ay = 0.0;
        });

        system.update(1.0, &mut physics, &mut rng);

        let part = system.iter_active().next().unwrap();
        assert!(part.x > 5.0, "particle did not move: {}", part.x);
    }

    #[test]
    fn fire_particles_heat_their_cell() {
        let mut system = ParticleSystem::new();
        let mut physics = physics();
        let mut rng = rng();
        system.spawn_generator(1, |_, part| {
            part.kind = ParticleType::Fire;
            part.lifetime = 10.0;
            part.x = 5.0;
            part.y = 5.0;
        });

        let phy_x = 25;
        let phy_y = 25;
        let before = physics.writable_cell_at(phy_x, phy_y).heat_energy;
        system.update(0.004, &mut physics, &mut rng);
        let after = physics.writable_cell_at(phy_x, phy_y).heat_energy;

        let capacity = physics.writable_cell_at(phy_x, phy_y).heat_capacity;
        assert!(
            (after - before - FIRE_PARTICLE_TEMPERATURE_RISE * capacity).abs() < 1e-4,
            "expected one heat deposit, got {before} -> {after}"
        );
    }

    #[test]
    fn fire_particles_shed_sparks_as_they_age() {
        let mut system = ParticleSystem::new();
        let mut physics = physics();
        let mut rng = rng();
        system.spawn_generator(1, |_, part| {
            part.kind = ParticleType::Fire;
            part.lifetime = 10.0;
            part.x = 5.0;
            part.y = 5.0;
        });

        // 0.1 s of age crosses two spawn-counter increments (age·25).
        for _ in 0..25 {
            system.update(0.004, &mut physics, &mut rng);
        }

        let sparks = system
            .iter_active()
            .filter(|p| p.kind == ParticleType::FireSecondary)
            .count();
        assert!(sparks >= 2, "expected sparks, got {sparks}");
    }
}
