//! Random spawn helpers for the particle pool.
//!
//! Wraps the pool's RNG so every spawn draws position, speed and lifetime the
//! same way, whether at startup or on recycle.

use glam::Vec2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::lifecycle::LifecycleConfig;
use crate::particle::Particle;
use crate::scene::Viewport;

/// RNG plus the ranges a spawn draws from.
#[derive(Clone, Debug)]
pub struct SpawnContext {
    /// Area new particles are placed in.
    pub viewport: Viewport,
    rng: SmallRng,
}

impl SpawnContext {
    /// Create a context seeded from `seed`, or from OS entropy when `None`.
    pub fn new(viewport: Viewport, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self { viewport, rng }
    }

    // ========== Random primitives ==========

    /// Random f32 in `[0, 1)`.
    #[inline]
    pub fn random(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Random f32 in the range. Returns `range.start` for empty ranges.
    #[inline]
    pub fn random_range(&mut self, range: std::ops::Range<f32>) -> f32 {
        if range.end > range.start {
            self.rng.gen_range(range)
        } else {
            range.start
        }
    }

    // ========== Particle helpers ==========

    /// Uniform point in `[0, width) x [0, height)`.
    pub fn random_in_viewport(&mut self) -> Vec2 {
        Vec2::new(
            self.random() * self.viewport.width,
            self.random() * self.viewport.height,
        )
    }

    /// Fresh particle at a random position with random speed and lifetime.
    pub fn spawn(&mut self, lifecycle: &LifecycleConfig, trail_len: usize) -> Particle {
        let position = self.random_in_viewport();
        let speed = self.random_range(lifecycle.speed.clone());
        let max_life = self.random_range(lifecycle.lifetime.clone());
        Particle::new(position, speed, max_life, trail_len)
    }

    /// Fresh particle whose age is already partway through its life.
    ///
    /// Used at startup so the population does not expire in lockstep.
    pub fn spawn_staggered(&mut self, lifecycle: &LifecycleConfig, trail_len: usize) -> Particle {
        let mut particle = self.spawn(lifecycle, trail_len);
        particle.age = self.random() * particle.max_life;
        particle
    }

    /// Recycle `particle` in place with new random state.
    pub fn respawn(&mut self, particle: &mut Particle, lifecycle: &LifecycleConfig) {
        let position = self.random_in_viewport();
        let speed = self.random_range(lifecycle.speed.clone());
        let max_life = self.random_range(lifecycle.lifetime.clone());
        particle.respawn(position, speed, max_life);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> SpawnContext {
        SpawnContext::new(Viewport::new(300.0, 200.0, 1.0), Some(17))
    }

    #[test]
    fn test_spawn_within_ranges() {
        let mut ctx = ctx();
        let lifecycle = LifecycleConfig::new();
        for _ in 0..500 {
            let p = ctx.spawn(&lifecycle, 8);
            assert!((0.0..300.0).contains(&p.position.x));
            assert!((0.0..200.0).contains(&p.position.y));
            assert!((0.6..2.0).contains(&p.speed));
            assert!((90.0..150.0).contains(&p.max_life));
            assert_eq!(p.age, 0.0);
            assert_eq!(p.trail.len(), 8);
        }
    }

    #[test]
    fn test_staggered_age_below_lifetime() {
        let mut ctx = ctx();
        let lifecycle = LifecycleConfig::new();
        let ages: Vec<f32> = (0..200)
            .map(|_| {
                let p = ctx.spawn_staggered(&lifecycle, 4);
                assert!(p.age >= 0.0 && p.age < p.max_life);
                p.age
            })
            .collect();
        let distinct = ages.windows(2).filter(|w| w[0] != w[1]).count();
        assert!(distinct > 150);
    }

    #[test]
    fn test_seeded_contexts_agree() {
        let lifecycle = LifecycleConfig::new();
        let mut a = ctx();
        let mut b = ctx();
        for _ in 0..20 {
            assert_eq!(a.spawn(&lifecycle, 2), b.spawn(&lifecycle, 2));
        }
    }

    #[test]
    fn test_respawn_collapses_trail() {
        let mut ctx = ctx();
        let lifecycle = LifecycleConfig::new();
        let mut p = ctx.spawn(&lifecycle, 6);
        p.age = 33.0;
        p.trail.push(Vec2::new(-500.0, -500.0));
        ctx.respawn(&mut p, &lifecycle);
        assert_eq!(p.age, 0.0);
        assert!(p.trail.iter().all(|q| q == p.position));
    }

    #[test]
    fn test_empty_range_returns_start() {
        let mut ctx = ctx();
        assert_eq!(ctx.random_range(3.0..3.0), 3.0);
    }
}
