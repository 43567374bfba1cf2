//! Particle state and its circular trail.
//!
//! A [`Particle`] is plain data. Derived values (head, tail, hue direction,
//! stroke width) are free functions taking the particle by reference, so no
//! state hides behind accessors.

use glam::Vec2;

/// Fixed-length ring of recent positions.
///
/// `head` indexes the newest slot; the slot after it (wrapping) is the oldest.
#[derive(Clone, Debug, PartialEq)]
pub struct Trail {
    points: Vec<Vec2>,
    head: usize,
}

impl Trail {
    /// Create a trail of `len` slots, all at `position`.
    pub fn new(len: usize, position: Vec2) -> Self {
        let len = len.max(1);
        Self {
            points: vec![position; len],
            head: len - 1,
        }
    }

    /// Advance the head one slot and write `position` there.
    pub fn push(&mut self, position: Vec2) {
        self.head = (self.head + 1) % self.points.len();
        self.points[self.head] = position;
    }

    /// Overwrite every slot with `position`.
    pub fn reset(&mut self, position: Vec2) {
        self.points.fill(position);
        self.head = self.points.len() - 1;
    }

    /// Newest position.
    #[inline]
    pub fn head(&self) -> Vec2 {
        self.points[self.head]
    }

    /// Oldest position.
    #[inline]
    pub fn tail(&self) -> Vec2 {
        self.points[(self.head + 1) % self.points.len()]
    }

    /// Index of the newest slot.
    #[inline]
    pub fn head_index(&self) -> usize {
        self.head
    }

    /// Number of slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; a trail has at least one slot.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Positions from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = Vec2> + '_ {
        let start = (self.head + 1) % self.points.len();
        self.points[start..]
            .iter()
            .chain(self.points[..start].iter())
            .copied()
    }
}

/// One advected tracer.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    /// Current position in viewport units.
    pub position: Vec2,
    /// Per-particle speed multiplier, fixed until the next recycle.
    pub speed: f32,
    /// Frames since spawn.
    pub age: f32,
    /// Age at which the particle is recycled.
    pub max_life: f32,
    /// Field direction sampled on the last step.
    pub velocity: Vec2,
    /// Recent positions.
    pub trail: Trail,
}

impl Particle {
    /// Create a particle at `position` with a trail collapsed onto it.
    pub fn new(position: Vec2, speed: f32, max_life: f32, trail_len: usize) -> Self {
        Self {
            position,
            speed,
            age: 0.0,
            max_life,
            velocity: Vec2::ZERO,
            trail: Trail::new(trail_len, position),
        }
    }

    /// Put the particle back at the start of a fresh life.
    pub fn respawn(&mut self, position: Vec2, speed: f32, max_life: f32) {
        self.position = position;
        self.speed = speed;
        self.age = 0.0;
        self.max_life = max_life;
        self.velocity = Vec2::ZERO;
        self.trail.reset(position);
    }
}

/// Newest trail position.
#[inline]
pub fn head(p: &Particle) -> Vec2 {
    p.trail.head()
}

/// Oldest trail position.
#[inline]
pub fn tail(p: &Particle) -> Vec2 {
    p.trail.tail()
}

/// Travel direction mapped to `[0, 1]`: `(atan2(vy, vx) + π) / 2π`.
#[inline]
pub fn heading(p: &Particle) -> f32 {
    let angle = p.velocity.y.atan2(p.velocity.x);
    (angle + std::f32::consts::PI) / std::f32::consts::TAU
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Trail Tests ==========

    #[test]
    fn test_trail_new_collapsed() {
        let trail = Trail::new(4, Vec2::new(1.0, 2.0));
        assert_eq!(trail.len(), 4);
        assert_eq!(trail.head(), Vec2::new(1.0, 2.0));
        assert_eq!(trail.tail(), Vec2::new(1.0, 2.0));
        assert_eq!(trail.head_index(), 3);
    }

    #[test]
    fn test_trail_push_wraps() {
        let mut trail = Trail::new(3, Vec2::ZERO);
        trail.push(Vec2::new(1.0, 0.0));
        assert_eq!(trail.head_index(), 0);
        trail.push(Vec2::new(2.0, 0.0));
        trail.push(Vec2::new(3.0, 0.0));
        trail.push(Vec2::new(4.0, 0.0));
        assert_eq!(trail.head_index(), 0);
        assert_eq!(trail.head(), Vec2::new(4.0, 0.0));
        assert_eq!(trail.tail(), Vec2::new(2.0, 0.0));
    }

    #[test]
    fn test_trail_iter_oldest_first() {
        let mut trail = Trail::new(3, Vec2::ZERO);
        for i in 1..=4 {
            trail.push(Vec2::new(i as f32, 0.0));
        }
        let xs: Vec<f32> = trail.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_trail_reset() {
        let mut trail = Trail::new(3, Vec2::ZERO);
        trail.push(Vec2::ONE);
        trail.reset(Vec2::new(5.0, 5.0));
        assert!(trail.iter().all(|p| p == Vec2::new(5.0, 5.0)));
    }

    #[test]
    fn test_trail_zero_len_clamped() {
        let trail = Trail::new(0, Vec2::ZERO);
        assert_eq!(trail.len(), 1);
    }

    // ========== Accessor Tests ==========

    #[test]
    fn test_heading_range() {
        let mut p = Particle::new(Vec2::ZERO, 1.0, 100.0, 4);
        p.velocity = Vec2::new(1.0, 0.0);
        assert!((heading(&p) - 0.5).abs() < 1e-6);
        p.velocity = Vec2::new(-1.0, -1e-9);
        assert!(heading(&p) < 0.01);
        p.velocity = Vec2::new(0.0, 1.0);
        assert!((heading(&p) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_respawn_resets_state() {
        let mut p = Particle::new(Vec2::ZERO, 1.0, 100.0, 5);
        p.age = 40.0;
        p.trail.push(Vec2::ONE);
        p.velocity = Vec2::X;
        p.respawn(Vec2::new(9.0, 9.0), 1.5, 120.0);
        assert_eq!(p.age, 0.0);
        assert_eq!(p.speed, 1.5);
        assert_eq!(p.max_life, 120.0);
        assert_eq!(p.velocity, Vec2::ZERO);
        assert!(p.trail.iter().all(|q| q == Vec2::new(9.0, 9.0)));
        assert_eq!(head(&p), tail(&p));
    }
}
