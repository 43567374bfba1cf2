//! Fixed-size particle pool advected through a [`VectorField`].
//!
//! The pool is allocated once per viewport and never grows. Each call to
//! [`ParticleSystem::step`] walks every particle in order:
//!
//! 1. Sample the field at the particle. Non-finite velocity recycles.
//! 2. Move by `velocity * speed * speed_scale`. Non-finite or out-of-bounds
//!    positions recycle.
//! 3. Increment age. Exceeding `max_life` recycles.
//! 4. Write the new position at the trail head.
//!
//! A recycled particle skips the remaining steps for that frame and starts
//! its next life with a collapsed trail.

use glam::Vec2;

use crate::field::VectorField;
use crate::lifecycle::{ExpireReason, LifecycleConfig, ParticleState};
use crate::particle::Particle;
use crate::scene::Viewport;
use crate::spawn::SpawnContext;

/// Counters from a single [`ParticleSystem::step`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Particles that advanced and kept their life.
    pub advanced: usize,
    /// Recycled because the sampled velocity was not finite.
    pub non_finite_velocity: usize,
    /// Recycled because the new position was not finite.
    pub non_finite_position: usize,
    /// Recycled for leaving the viewport margin.
    pub out_of_bounds: usize,
    /// Recycled for exceeding their lifetime.
    pub aged: usize,
}

impl StepStats {
    /// Total recycles this step.
    pub fn recycled(&self) -> usize {
        self.non_finite_velocity + self.non_finite_position + self.out_of_bounds + self.aged
    }

    fn record(&mut self, reason: ExpireReason) {
        match reason {
            ExpireReason::NonFiniteVelocity => self.non_finite_velocity += 1,
            ExpireReason::NonFinitePosition => self.non_finite_position += 1,
            ExpireReason::OutOfBounds => self.out_of_bounds += 1,
            ExpireReason::Aged => self.aged += 1,
        }
    }

    /// Add another step's counters.
    pub fn accumulate(&mut self, other: StepStats) {
        self.advanced += other.advanced;
        self.non_finite_velocity += other.non_finite_velocity;
        self.non_finite_position += other.non_finite_position;
        self.out_of_bounds += other.out_of_bounds;
        self.aged += other.aged;
    }
}

/// The particle pool plus the RNG and lifecycle rules that drive it.
#[derive(Clone, Debug)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
    lifecycle: LifecycleConfig,
    spawner: SpawnContext,
    trail_len: usize,
}

impl ParticleSystem {
    /// Allocate `count` particles with staggered ages.
    pub fn new(
        count: usize,
        trail_len: usize,
        lifecycle: LifecycleConfig,
        viewport: Viewport,
        seed: Option<u64>,
    ) -> Self {
        let mut system = Self {
            particles: Vec::with_capacity(count),
            lifecycle,
            spawner: SpawnContext::new(viewport, seed),
            trail_len: trail_len.max(1),
        };
        system.populate(count);
        system
    }

    /// Rebuild the whole pool for a new viewport.
    pub fn resize(&mut self, viewport: Viewport) {
        let count = self.particles.len();
        self.spawner.viewport = viewport;
        self.populate(count);
    }

    fn populate(&mut self, count: usize) {
        self.particles.clear();
        for _ in 0..count {
            let particle = self.spawner.spawn_staggered(&self.lifecycle, self.trail_len);
            self.particles.push(particle);
        }
    }

    /// Advance every particle one frame.
    pub fn step(&mut self, field: &VectorField, speed_scale: f32) -> StepStats {
        let viewport = self.spawner.viewport;
        let mut stats = StepStats::default();

        for particle in &mut self.particles {
            match advance(particle, field, speed_scale, &self.lifecycle, viewport) {
                ParticleState::Active => stats.advanced += 1,
                ParticleState::Expired(reason) => {
                    stats.record(reason);
                    self.spawner.respawn(particle, &self.lifecycle);
                }
            }
        }

        stats
    }

    /// Recycle a single particle immediately.
    pub fn recycle(&mut self, index: usize) {
        if let Some(particle) = self.particles.get_mut(index) {
            self.spawner.respawn(particle, &self.lifecycle);
        }
    }

    /// All particles.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Mutable access to the pool, for seeding specific states.
    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Number of particles.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Trail length shared by every particle.
    pub fn trail_len(&self) -> usize {
        self.trail_len
    }

    /// Lifecycle rules.
    pub fn lifecycle(&self) -> &LifecycleConfig {
        &self.lifecycle
    }

    /// Viewport particles spawn into.
    pub fn viewport(&self) -> Viewport {
        self.spawner.viewport
    }
}

/// One advection step for one particle. Leaves the particle untouched past
/// the first failing check.
fn advance(
    particle: &mut Particle,
    field: &VectorField,
    speed_scale: f32,
    lifecycle: &LifecycleConfig,
    viewport: Viewport,
) -> ParticleState {
    let velocity = field.sample(particle.position);
    let state = lifecycle.check_velocity(velocity);
    if state.is_expired() {
        return state;
    }
    particle.velocity = velocity;

    let position: Vec2 = particle.position + velocity * particle.speed * speed_scale;
    particle.position = position;
    let state = lifecycle.check_position(position, viewport);
    if state.is_expired() {
        return state;
    }

    particle.age += 1.0;
    let state = lifecycle.check_age(particle.age, particle.max_life);
    if state.is_expired() {
        return state;
    }

    particle.trail.push(position);
    ParticleState::Active
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldConfig;

    fn viewport() -> Viewport {
        Viewport::new(200.0, 100.0, 1.0)
    }

    fn uniform_field(dir: Vec2) -> VectorField {
        let mut field = VectorField::new(FieldConfig::new(10.0), viewport());
        field.fill(dir);
        field
    }

    fn system(count: usize) -> ParticleSystem {
        ParticleSystem::new(count, 8, LifecycleConfig::new(), viewport(), Some(99))
    }

    // ========== Pool Tests ==========

    #[test]
    fn test_pool_size_is_fixed() {
        let mut sys = system(50);
        let field = uniform_field(Vec2::X);
        for _ in 0..300 {
            sys.step(&field, 2.0);
        }
        assert_eq!(sys.len(), 50);
        assert!(sys.particles().iter().all(|p| p.trail.len() == 8));
    }

    #[test]
    fn test_initial_ages_are_staggered() {
        let sys = system(100);
        assert!(sys.particles().iter().all(|p| p.age < p.max_life));
        assert!(sys.particles().iter().any(|p| p.age > 1.0));
    }

    #[test]
    fn test_resize_respawns_inside_new_viewport() {
        let mut sys = system(40);
        sys.resize(Viewport::new(30.0, 20.0, 1.0));
        assert_eq!(sys.len(), 40);
        for p in sys.particles() {
            assert!(p.position.x < 30.0 && p.position.y < 20.0);
        }
    }

    // ========== Step Tests ==========

    #[test]
    fn test_step_moves_along_field() {
        let mut sys = system(1);
        let field = uniform_field(Vec2::X);
        {
            let p = &mut sys.particles_mut()[0];
            p.respawn(Vec2::new(100.0, 50.0), 1.0, 500.0);
        }
        let stats = sys.step(&field, 1.0);
        assert_eq!(stats.advanced, 1);
        let p = &sys.particles()[0];
        assert!((p.position.x - 101.0).abs() < 1e-5);
        assert!((p.position.y - 50.0).abs() < 1e-5);
        assert_eq!(p.age, 1.0);
        assert_eq!(p.trail.head(), p.position);
        assert_eq!(p.trail.tail(), Vec2::new(100.0, 50.0));
    }

    #[test]
    fn test_nan_position_recycles_within_one_step() {
        let mut sys = system(1);
        let field = uniform_field(Vec2::X);
        sys.particles_mut()[0].position = Vec2::new(f32::NAN, 10.0);
        let stats = sys.step(&field, 1.0);
        assert_eq!(stats.recycled(), 1);
        let p = &sys.particles()[0];
        assert!(p.position.is_finite());
        assert!(p.position.x >= 0.0 && p.position.x < 200.0);
        assert!(p.position.y >= 0.0 && p.position.y < 100.0);
        assert_eq!(p.age, 0.0);
    }

    #[test]
    fn test_out_of_bounds_recycles() {
        let mut sys = system(1);
        let field = uniform_field(Vec2::X);
        sys.particles_mut()[0].respawn(Vec2::new(219.5, 50.0), 1.0, 500.0);
        let stats = sys.step(&field, 1.0);
        assert_eq!(stats.out_of_bounds, 1);
        assert!(sys.particles()[0].position.x < 200.0);
    }

    #[test]
    fn test_age_never_exceeds_max_life() {
        let mut sys = system(64);
        let field = uniform_field(Vec2::new(0.0, 0.0001));
        let mut prev: Vec<f32> = sys.particles().iter().map(|p| p.age).collect();
        for _ in 0..400 {
            sys.step(&field, 0.01);
            for (p, before) in sys.particles().iter().zip(&prev) {
                assert!(p.age <= p.max_life);
                assert!(p.age == 0.0 || p.age == before + 1.0);
            }
            prev = sys.particles().iter().map(|p| p.age).collect();
        }
    }

    #[test]
    fn test_recycle_index() {
        let mut sys = system(3);
        sys.particles_mut()[1].age = 42.0;
        sys.recycle(1);
        sys.recycle(99);
        assert_eq!(sys.particles()[1].age, 0.0);
    }

    #[test]
    fn test_stats_accumulate() {
        let mut total = StepStats::default();
        total.accumulate(StepStats { advanced: 3, aged: 1, ..Default::default() });
        total.accumulate(StepStats { advanced: 2, out_of_bounds: 4, ..Default::default() });
        assert_eq!(total.advanced, 5);
        assert_eq!(total.recycled(), 5);
    }
}
