//! Snow particle simulation.
//!
//! Particles fall under a global fall factor plus a seeded wind drift and a
//! low-frequency sway. On reaching the floor they leave an impact puff and
//! either settle for a while or respawn at once. Each step produces a
//! `(x, y, z, seed)` stream of the particles inside the view frustum.

use std::f32::consts::TAU;

use cgmath::{Matrix4, Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data_structures::frustum::Frustum;

/// Height above the floor at which impacted particles rest.
pub const SETTLE_EPSILON: f32 = 0.01;
/// Upper bound on live impact puffs; the oldest are dropped first.
pub const MAX_PUFFS: usize = 4096;
/// Respawn height jitter above `spawnHeight`.
pub const SPAWN_JITTER: f32 = 20.0;

/// How the floor is detected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroundPolicy {
    /// Compare the next height against `floorY`.
    #[default]
    Analytic,
    /// Intersect the `prev -> next` segment with the finite ground plane,
    /// falling back to the analytic clamp when the segment misses it.
    RayTested,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SnowSettings {
    pub enabled: bool,
    pub count: usize,
    /// Global multiplier on every particle's fall speed.
    pub fall_speed: f32,
    pub wind_speed: f32,
    pub wind_direction_deg: f32,
    pub floor_y: f32,
    pub spawn_height: f32,
    pub spawn_radius: f32,
    /// Particles rest on the floor for this long. Ignored without `settle`.
    pub settle_duration: f32,
    pub settle: bool,
    pub ground_policy: GroundPolicy,
    pub frustum_cull: bool,
    pub particle_size: f32,
    pub puff_lifetime: f32,
    pub seed: u64,
}

impl Default for SnowSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            count: 20_000,
            fall_speed: 1.0,
            wind_speed: 1.5,
            wind_direction_deg: 30.0,
            floor_y: 0.0,
            spawn_height: 40.0,
            spawn_radius: 80.0,
            settle_duration: 2.0,
            settle: true,
            ground_policy: GroundPolicy::Analytic,
            frustum_cull: true,
            particle_size: 0.08,
            puff_lifetime: 0.6,
            seed: 0x5EED,
        }
    }
}

impl SnowSettings {
    /// Settings with non-finite heights replaced by their defaults and
    /// negative durations and sizes clamped to zero.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let finite_or = |value: f32, fallback: f32| if value.is_finite() { value } else { fallback };
        Self {
            fall_speed: finite_or(self.fall_speed, defaults.fall_speed),
            wind_speed: finite_or(self.wind_speed, 0.0),
            wind_direction_deg: finite_or(self.wind_direction_deg, defaults.wind_direction_deg),
            floor_y: finite_or(self.floor_y, defaults.floor_y),
            spawn_height: finite_or(self.spawn_height, defaults.spawn_height),
            spawn_radius: finite_or(self.spawn_radius, 0.0).max(0.0),
            settle_duration: finite_or(self.settle_duration, 0.0).max(0.0),
            particle_size: finite_or(self.particle_size, 0.0).max(0.0),
            puff_lifetime: finite_or(self.puff_lifetime, 0.0).max(0.0),
            ..self.clone()
        }
    }

    /// Unit wind direction in the XZ plane.
    pub fn wind_direction(&self) -> Vector3<f32> {
        let radians = self.wind_direction_deg.to_radians();
        Vector3::new(radians.cos(), 0.0, radians.sin())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub position: Point3<f32>,
    pub prev_position: Point3<f32>,
    /// Per-particle variation in `[0, 1]`.
    pub seed: f32,
    pub fall_speed: f32,
    pub settled: bool,
    pub settle_timer: f32,
}

impl Particle {
    pub fn at(position: Point3<f32>, seed: f32, fall_speed: f32) -> Self {
        Self {
            position,
            prev_position: position,
            seed,
            fall_speed,
            settled: false,
            settle_timer: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImpactPuff {
    pub position: Point3<f32>,
    pub age: f32,
    pub lifetime: f32,
}

impl ImpactPuff {
    /// Normalised age in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        if self.lifetime > 0.0 {
            (self.age / self.lifetime).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

/// Square horizontal plane centered at the origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundPlane {
    pub y: f32,
    pub half_extent: f32,
}

impl GroundPlane {
    /// Where the segment `from -> to` crosses the plane, if it does inside
    /// the plane's extent.
    pub fn intersect_segment(&self, from: Point3<f32>, to: Point3<f32>) -> Option<Point3<f32>> {
        if from.y < self.y || to.y > self.y {
            return None;
        }
        let dy = from.y - to.y;
        let t = if dy > f32::EPSILON { (from.y - self.y) / dy } else { 0.0 };
        let hit = from + (to - from) * t.clamp(0.0, 1.0);
        (hit.x.abs() <= self.half_extent && hit.z.abs() <= self.half_extent)
            .then(|| Point3::new(hit.x, self.y, hit.z))
    }
}

#[derive(Debug)]
pub struct SnowSimulator {
    settings: SnowSettings,
    ground: GroundPlane,
    particles: Vec<Particle>,
    puffs: Vec<ImpactPuff>,
    rng: StdRng,
    time: f32,
    instances: Vec<[f32; 4]>,
    puff_instances: Vec<[f32; 4]>,
}

impl SnowSimulator {
    pub fn new(settings: SnowSettings, ground_half_extent: f32) -> Self {
        let mut simulator = Self::with_particles(settings, ground_half_extent, Vec::new());
        simulator.resize(simulator.settings.count);
        simulator
    }

    /// A simulator over a given particle set. The set is used as is; later
    /// respawns draw from the seeded generator.
    pub fn with_particles(settings: SnowSettings, ground_half_extent: f32, particles: Vec<Particle>) -> Self {
        let settings = settings.sanitized();
        Self {
            rng: StdRng::seed_from_u64(settings.seed),
            ground: GroundPlane {
                y: settings.floor_y,
                half_extent: ground_half_extent,
            },
            settings,
            particles,
            puffs: Vec::new(),
            time: 0.0,
            instances: Vec::new(),
            puff_instances: Vec::new(),
        }
    }

    pub fn settings(&self) -> &SnowSettings {
        &self.settings
    }

    /// Apply new settings. A changed count grows or shrinks the population;
    /// existing particles keep their state.
    pub fn set_settings(&mut self, settings: SnowSettings) {
        let settings = settings.sanitized();
        let count = settings.count;
        self.ground.y = settings.floor_y;
        self.settings = settings;
        if count != self.particles.len() {
            self.resize(count);
        }
    }

    /// Respawn every particle with the initial height spread.
    pub fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.settings.seed);
        self.particles.clear();
        self.puffs.clear();
        self.time = 0.0;
        self.resize(self.settings.count);
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn puffs(&self) -> &[ImpactPuff] {
        &self.puffs
    }

    /// Visible `(x, y, z, seed)` records from the last step.
    pub fn instances(&self) -> &[[f32; 4]] {
        &self.instances
    }

    /// `(x, y, z, age / lifetime)` per live puff.
    pub fn puff_instances(&self) -> &[[f32; 4]] {
        &self.puff_instances
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Velocity of `particle` at simulation time `t`.
    pub fn velocity(&self, particle: &Particle, t: f32) -> Vector3<f32> {
        let mut v = Vector3::new(0.0, -particle.fall_speed * self.settings.fall_speed, 0.0)
            + self.settings.wind_direction() * self.settings.wind_speed * (0.5 + 0.5 * particle.seed);
        v.x += (particle.position.x * 0.1 + t * 2.0).sin() * 0.1 * (0.3 + 0.7 * particle.seed);
        v
    }

    /// Advance by `dt`. With a `view_proj`, the instance stream only keeps
    /// particles inside its frustum (when frustum culling is on).
    pub fn step(&mut self, dt: f32, view_proj: Option<&Matrix4<f32>>) {
        if self.settings.enabled {
            self.time += dt;
            self.age_puffs(dt);

            for i in 0..self.particles.len() {
                self.step_particle(i, dt);
            }

            if self.puffs.len() > MAX_PUFFS {
                let excess = self.puffs.len() - MAX_PUFFS;
                self.puffs.drain(..excess);
            }
        }
        self.rebuild_instances(view_proj);
    }

    fn step_particle(&mut self, i: usize, dt: f32) {
        let t = self.time;
        let velocity = self.velocity(&self.particles[i], t);
        let floor = self.settings.floor_y;

        let particle = &mut self.particles[i];
        particle.prev_position = particle.position;

        if particle.settled {
            particle.settle_timer -= dt;
            if particle.settle_timer <= 0.0 {
                self.respawn(i);
            }
            return;
        }

        let next = particle.position + velocity * dt;
        if next.y > floor {
            particle.position = next;
            return;
        }

        let landing = match self.settings.ground_policy {
            GroundPolicy::RayTested => self.ground.intersect_segment(particle.prev_position, next),
            GroundPolicy::Analytic => None,
        }
        .unwrap_or(Point3::new(next.x, floor, next.z));
        let rest = Point3::new(landing.x, floor + SETTLE_EPSILON, landing.z);

        self.puffs.push(ImpactPuff {
            position: rest,
            age: 0.0,
            lifetime: self.settings.puff_lifetime,
        });

        if self.settings.settle {
            let particle = &mut self.particles[i];
            particle.position = rest;
            particle.settled = true;
            particle.settle_timer = self.settings.settle_duration;
        } else {
            self.respawn(i);
        }
    }

    fn age_puffs(&mut self, dt: f32) {
        for puff in &mut self.puffs {
            puff.age += dt;
        }
        self.puffs.retain(|puff| puff.age < puff.lifetime);
    }

    fn respawn(&mut self, i: usize) {
        let height = self.settings.spawn_height + self.rng.gen_range(0.0..SPAWN_JITTER);
        self.particles[i] = self.spawn_at_height(height);
    }

    fn spawn_at_height(&mut self, height: f32) -> Particle {
        let radius = self.settings.spawn_radius.max(0.0) * self.rng.gen_range(0.0f32..1.0).sqrt();
        let angle = self.rng.gen_range(0.0..TAU);
        let seed = self.rng.gen_range(0.0..=1.0);
        let fall_speed = self.rng.gen_range(0.5..2.0);
        Particle::at(
            Point3::new(radius * angle.cos(), height, radius * angle.sin()),
            seed,
            fall_speed,
        )
    }

    fn resize(&mut self, count: usize) {
        if count < self.particles.len() {
            self.particles.truncate(count);
            return;
        }
        let low = self.settings.floor_y;
        let high = self.settings.spawn_height + SPAWN_JITTER;
        self.particles.reserve(count - self.particles.len());
        while self.particles.len() < count {
            // A floor above the spawn band leaves no range to spread over.
            let height = if high > low { self.rng.gen_range(low..high) } else { low };
            let particle = self.spawn_at_height(height);
            self.particles.push(particle);
        }
    }

    fn rebuild_instances(&mut self, view_proj: Option<&Matrix4<f32>>) {
        let frustum = view_proj
            .filter(|_| self.settings.frustum_cull)
            .map(Frustum::from_view_proj);
        self.instances.clear();
        if self.settings.enabled {
            self.instances.extend(
                self.particles
                    .iter()
                    .filter(|p| frustum.as_ref().is_none_or(|f| f.contains_point(p.position)))
                    .map(|p| [p.position.x, p.position.y, p.position.z, p.seed]),
            );
        }
        self.puff_instances.clear();
        self.puff_instances.extend(
            self.puffs
                .iter()
                .map(|p| [p.position.x, p.position.y, p.position.z, p.progress()]),
        );
    }
}
