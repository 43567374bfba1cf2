//! Draws particle trails onto a [`Canvas`].
//!
//! Each frame starts with a translucent background fill so earlier frames
//! linger, then every trail is stroked with the configured blend mode. A
//! trail's color comes from its heading through the gradient, optionally
//! replaced by the region tint, then scaled by a treble-driven brightness.
//! Alpha ramps from transparent at the tail to most opaque at the head.

use glam::Vec3;

use crate::audio::AudioFeatures;
use crate::canvas::{Canvas, Stroke};
use crate::particle::{self, Particle};
use crate::scene::Viewport;
use crate::visuals::VisualConfig;

/// Stateless trail renderer.
#[derive(Debug, Clone, Default)]
pub struct TrailRenderer {
    config: VisualConfig,
}

impl TrailRenderer {
    /// Create a renderer.
    pub fn new(config: VisualConfig) -> Self {
        Self { config }
    }

    /// Visual settings.
    pub fn config(&self) -> &VisualConfig {
        &self.config
    }

    /// Paint the opaque background. Used once after allocation.
    pub fn clear(&self, canvas: &mut Canvas) {
        canvas.clear(self.config.background);
    }

    /// Fade the previous frame, then stroke every trail.
    pub fn draw(
        &self,
        canvas: &mut Canvas,
        particles: &[Particle],
        features: &AudioFeatures,
        viewport: Viewport,
    ) {
        canvas.fill(self.config.background, self.config.fade_alpha);

        let brightness = self.config.brightness_for(features.treble_norm());
        let alpha = |t: f32| self.config.alpha_at(t, brightness);

        for p in particles {
            let stroke = self.stroke_for(p, viewport, brightness);
            canvas.stroke(p.trail.iter(), &stroke, alpha, self.config.blend_mode);
        }
    }

    /// Stroke parameters for one particle.
    pub fn stroke_for(&self, p: &Particle, viewport: Viewport, brightness: f32) -> Stroke {
        Stroke {
            from: particle::tail(p),
            to: particle::head(p),
            color: self.color_for(p, viewport, brightness),
            width: self.config.line_width(p.speed),
        }
    }

    /// Trail color before alpha.
    pub fn color_for(&self, p: &Particle, viewport: Viewport, brightness: f32) -> Vec3 {
        let base = self.config.gradient.sample(particle::heading(p));
        let tinted = match &self.config.region_tint {
            Some(tint) => tint.apply(particle::head(p), viewport, base),
            None => base,
        };
        (tinted * brightness).min(Vec3::ONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visuals::{rgb, RegionTint};
    use glam::Vec2;

    fn viewport() -> Viewport {
        Viewport::new(100.0, 100.0, 1.0)
    }

    fn moving_particle(at: Vec2, velocity: Vec2) -> Particle {
        let mut p = Particle::new(at, 1.0, 100.0, 10);
        p.velocity = velocity;
        for i in 1..10 {
            p.trail.push(at + velocity * i as f32);
        }
        p
    }

    // ========== Color Tests ==========

    #[test]
    fn test_color_follows_heading() {
        let r = TrailRenderer::default();
        // velocity (-1, -0) sits at the start of the gradient
        let p = moving_particle(Vec2::new(10.0, 80.0), Vec2::new(-1.0, -1e-7));
        let c = r.color_for(&p, viewport(), 1.0);
        assert!((c - rgb(18, 40, 110)).abs().max_element() < 1e-3);
    }

    #[test]
    fn test_region_tint_overrides_gradient() {
        let r = TrailRenderer::default();
        let p = moving_particle(Vec2::new(80.0, 5.0), Vec2::new(1.0, 0.0));
        let c = r.color_for(&p, viewport(), 1.0);
        assert!((c - RegionTint::warm().color).abs().max_element() < 1e-6);
    }

    #[test]
    fn test_brightness_scales_and_saturates() {
        let r = TrailRenderer::default();
        let p = moving_particle(Vec2::new(10.0, 80.0), Vec2::new(0.0, 1.0));
        let dim = r.color_for(&p, viewport(), 0.7);
        let bright = r.color_for(&p, viewport(), 1.5);
        assert!(bright.max_element() <= 1.0);
        assert!(bright.x >= dim.x);
    }

    #[test]
    fn test_stroke_spans_tail_to_head() {
        let r = TrailRenderer::default();
        let p = moving_particle(Vec2::new(10.0, 50.0), Vec2::new(1.0, 0.0));
        let s = r.stroke_for(&p, viewport(), 1.0);
        assert_eq!(s.from, Vec2::new(10.0, 50.0));
        assert_eq!(s.to, Vec2::new(19.0, 50.0));
        assert!((s.width - 1.0).abs() < 1e-6);
    }

    // ========== Draw Tests ==========

    #[test]
    fn test_draw_lights_trail_pixels() {
        let r = TrailRenderer::default();
        let mut canvas = Canvas::new(viewport());
        r.clear(&mut canvas);
        let before = canvas.pixel(18, 50).unwrap();
        let p = moving_particle(Vec2::new(10.0, 50.0), Vec2::new(1.0, 0.0));
        r.draw(&mut canvas, &[p], &AudioFeatures::SILENT, viewport());
        let after = canvas.pixel(18, 50).unwrap();
        assert!(after.max_element() > before.max_element());
    }

    #[test]
    fn test_collapsed_trail_only_fades() {
        let r = TrailRenderer::default();
        let mut canvas = Canvas::new(viewport());
        r.clear(&mut canvas);
        let p = Particle::new(Vec2::new(50.0, 50.0), 1.0, 100.0, 10);
        r.draw(&mut canvas, &[p], &AudioFeatures::SILENT, viewport());
        let bg = r.config().background;
        assert!(canvas.pixels().iter().all(|c| (*c - bg).abs().max_element() < 1e-6));
    }
}
