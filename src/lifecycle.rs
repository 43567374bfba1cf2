//! Particle lifecycle: configuration and the per-step state check.
//!
//! Particles are never deallocated. Each step a particle is either
//! [`ParticleState::Active`] and keeps advecting, or
//! [`ParticleState::Expired`] and is recycled in place on the same frame.
//!
//! # Transitions
//!
//! | From | To | When |
//! |------|----|------|
//! | Active | Expired | sampled velocity is not finite |
//! | Active | Expired | new position is not finite |
//! | Active | Expired | position leaves the viewport by more than `bounds_margin` |
//! | Active | Expired | age exceeds the particle's `max_life` |
//! | Expired | Active | immediately, via respawn |
//!
//! # Example
//!
//! ```ignore
//! let lifecycle = LifecycleConfig::new()
//!     .with_lifetime(60.0..120.0)
//!     .with_speed(0.5..1.5);
//! ```

use std::ops::Range;

use glam::Vec2;

use crate::scene::Viewport;

/// Why a particle left the active state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExpireReason {
    /// The field sample at the particle was NaN or infinite.
    NonFiniteVelocity,
    /// The advected position was NaN or infinite.
    NonFinitePosition,
    /// The particle drifted past the viewport margin.
    OutOfBounds,
    /// The particle outlived its lifetime.
    Aged,
}

/// Result of a lifecycle check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParticleState {
    /// Keep advecting.
    Active,
    /// Recycle now.
    Expired(ExpireReason),
}

impl ParticleState {
    /// Whether the particle should be recycled.
    #[inline]
    pub fn is_expired(&self) -> bool {
        matches!(self, ParticleState::Expired(_))
    }
}

/// Lifetime, speed and boundary settings for the particle pool.
#[derive(Clone, Debug, PartialEq)]
pub struct LifecycleConfig {
    /// Lifetime in frames, drawn uniformly per spawn.
    pub lifetime: Range<f32>,

    /// Per-particle speed multiplier, drawn uniformly per spawn.
    pub speed: Range<f32>,

    /// How far outside the viewport a particle may travel before recycling.
    pub bounds_margin: f32,

    /// Global speed scale at silence.
    pub speed_base: f32,

    /// Additional global speed scale per unit of normalized level.
    pub speed_level_gain: f32,
}

impl LifecycleConfig {
    /// Default lifecycle: 90-150 frame lifetimes, speed 0.6-2.0, margin 20.
    pub fn new() -> Self {
        Self {
            lifetime: 90.0..150.0,
            speed: 0.6..2.0,
            bounds_margin: 20.0,
            speed_base: 0.6,
            speed_level_gain: 1.6,
        }
    }

    /// Set the lifetime range in frames.
    ///
    /// Empty or inverted ranges collapse to a one-frame-wide range at `start`.
    pub fn with_lifetime(mut self, lifetime: Range<f32>) -> Self {
        self.lifetime = non_empty(lifetime, 1.0);
        self
    }

    /// Set the per-particle speed multiplier range.
    pub fn with_speed(mut self, speed: Range<f32>) -> Self {
        self.speed = non_empty(speed, 0.01);
        self
    }

    /// Set the boundary margin.
    pub fn with_bounds_margin(mut self, margin: f32) -> Self {
        self.bounds_margin = margin.max(0.0);
        self
    }

    /// Set the global speed curve: `base + level * gain`.
    pub fn with_speed_scale(mut self, base: f32, level_gain: f32) -> Self {
        self.speed_base = base;
        self.speed_level_gain = level_gain;
        self
    }

    /// Global speed multiplier for a normalized overall level.
    #[inline]
    pub fn speed_scale(&self, level_norm: f32) -> f32 {
        self.speed_base + level_norm * self.speed_level_gain
    }

    /// Whether `position` is inside the viewport expanded by the margin.
    #[inline]
    pub fn in_bounds(&self, position: Vec2, viewport: Viewport) -> bool {
        let m = self.bounds_margin;
        position.x >= -m
            && position.x <= viewport.width + m
            && position.y >= -m
            && position.y <= viewport.height + m
    }

    /// Check the sampled velocity before moving.
    #[inline]
    pub fn check_velocity(&self, velocity: Vec2) -> ParticleState {
        if velocity.is_finite() {
            ParticleState::Active
        } else {
            ParticleState::Expired(ExpireReason::NonFiniteVelocity)
        }
    }

    /// Check a freshly advected position.
    pub fn check_position(&self, position: Vec2, viewport: Viewport) -> ParticleState {
        if !position.is_finite() {
            ParticleState::Expired(ExpireReason::NonFinitePosition)
        } else if !self.in_bounds(position, viewport) {
            ParticleState::Expired(ExpireReason::OutOfBounds)
        } else {
            ParticleState::Active
        }
    }

    /// Check age after it was incremented.
    #[inline]
    pub fn check_age(&self, age: f32, max_life: f32) -> ParticleState {
        if age > max_life {
            ParticleState::Expired(ExpireReason::Aged)
        } else {
            ParticleState::Active
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty(range: Range<f32>, min_width: f32) -> Range<f32> {
    if range.end > range.start {
        range
    } else {
        range.start..range.start + min_width
    }
}
