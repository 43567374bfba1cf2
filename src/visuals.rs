//! Visual configuration for trail rendering.
//!
//! Controls how particles look, separate from the field and lifecycle rules
//! that control how they move.
//!
//! Colors are `Vec3` in display (sRGB-encoded) space with components in
//! `0.0..=1.0`, the same space the canvas composites in.
//!
//! # Usage
//!
//! ```ignore
//! Visualizer::new()
//!     .with_visuals(|v| {
//!         v.blend_mode(BlendMode::Additive);
//!         v.fade(0.2);
//!         v.region_tint(None);
//!     })
//!     .run()?;
//! ```

use glam::{Vec2, Vec3};

use crate::scene::Viewport;

/// Build a color from 8-bit channels.
#[inline]
pub fn rgb(r: u8, g: u8, b: u8) -> Vec3 {
    Vec3::new(r as f32, g as f32, b as f32) / 255.0
}

/// Piecewise-linear color ramp over `t` in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    stops: Vec<(f32, Vec3)>,
}

impl Gradient {
    /// Build a gradient from `(position, color)` stops.
    ///
    /// Stops are sorted by position. An empty list yields a white gradient.
    pub fn new(mut stops: Vec<(f32, Vec3)>) -> Self {
        if stops.is_empty() {
            stops.push((0.0, Vec3::ONE));
        }
        stops.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { stops }
    }

    /// Deep blue, cyan, warm gold, near-white with breaks at 0.45 and 0.75.
    pub fn flow() -> Self {
        Self::new(vec![
            (0.0, rgb(18, 40, 110)),
            (0.45, rgb(90, 200, 255)),
            (0.75, rgb(255, 220, 120)),
            (1.0, rgb(255, 245, 230)),
        ])
    }

    /// Color at `t`. Values outside the stop range take the end colors.
    pub fn sample(&self, t: f32) -> Vec3 {
        let first = self.stops[0];
        if t.is_nan() || t <= first.0 {
            return first.1;
        }
        for pair in self.stops.windows(2) {
            let (t0, c0) = pair[0];
            let (t1, c1) = pair[1];
            if t < t1 {
                let u = (t - t0) / (t1 - t0);
                return c0.lerp(c1, u);
            }
        }
        self.stops[self.stops.len() - 1].1
    }

    /// The stops, sorted.
    pub fn stops(&self) -> &[(f32, Vec3)] {
        &self.stops
    }
}

impl Default for Gradient {
    fn default() -> Self {
        Self::flow()
    }
}

/// Rectangular screen region whose trails are drawn in a fixed color.
///
/// The region spans from `min_x` (fraction of width) to the right edge and
/// from the top edge down to `max_y` (fraction of height).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionTint {
    /// Left boundary as a fraction of viewport width (exclusive).
    pub min_x: f32,
    /// Bottom boundary as a fraction of viewport height (exclusive).
    pub max_y: f32,
    /// Override color.
    pub color: Vec3,
}

impl RegionTint {
    /// Warm highlight in the upper right.
    pub fn warm() -> Self {
        Self {
            min_x: 0.65,
            max_y: 0.3,
            color: rgb(255, 215, 110),
        }
    }

    /// Whether a trail head at `point` falls inside the region.
    #[inline]
    pub fn contains(&self, point: Vec2, viewport: Viewport) -> bool {
        point.x > viewport.width * self.min_x && point.y < viewport.height * self.max_y
    }

    /// `color` or the override if `point` is inside the region.
    #[inline]
    pub fn apply(&self, point: Vec2, viewport: Viewport, color: Vec3) -> Vec3 {
        if self.contains(point, viewport) {
            self.color
        } else {
            color
        }
    }
}

/// Blend mode for trail strokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Source-over alpha blending.
    Alpha,

    /// Colors add and saturate. Overlapping trails glow.
    #[default]
    Additive,
}

/// Configuration for trail visuals.
///
/// Built using the closure passed to `Visualizer::with_visuals`.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualConfig {
    /// Background color for the initial clear and per-frame fade.
    pub background: Vec3,
    /// Opacity of the per-frame background fill. Lower values leave longer
    /// persistence.
    pub fade_alpha: f32,
    /// Blend mode for strokes.
    pub blend_mode: BlendMode,
    /// Heading to color ramp.
    pub gradient: Gradient,
    /// Optional region override.
    pub region_tint: Option<RegionTint>,
    /// Brightness at silence.
    pub brightness_base: f32,
    /// Additional brightness per unit of normalized treble.
    pub brightness_treble_gain: f32,
    /// Stroke alpha along the tail-to-head gradient, before brightness.
    pub alpha_stops: [(f32, f32); 3],
    /// Stroke width for a particle at speed 2.
    pub line_width_base: f32,
    /// Additional width as speed drops to 0.
    pub line_width_gain: f32,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            background: rgb(5, 10, 20),
            fade_alpha: 0.28,
            blend_mode: BlendMode::Additive,
            gradient: Gradient::flow(),
            region_tint: Some(RegionTint::warm()),
            brightness_base: 0.7,
            brightness_treble_gain: 0.8,
            alpha_stops: [(0.0, 0.0), (0.6, 0.25), (1.0, 0.9)],
            line_width_base: 0.7,
            line_width_gain: 0.6,
        }
    }
}

impl VisualConfig {
    /// Create a new visual config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the blend mode.
    pub fn blend_mode(&mut self, mode: BlendMode) -> &mut Self {
        self.blend_mode = mode;
        self
    }

    /// Set the background color.
    pub fn background(&mut self, color: Vec3) -> &mut Self {
        self.background = color;
        self
    }

    /// Set the per-frame fade opacity.
    pub fn fade(&mut self, alpha: f32) -> &mut Self {
        self.fade_alpha = alpha.clamp(0.0, 1.0);
        self
    }

    /// Replace the heading gradient.
    pub fn gradient(&mut self, gradient: Gradient) -> &mut Self {
        self.gradient = gradient;
        self
    }

    /// Set or clear the region tint.
    pub fn region_tint(&mut self, tint: Option<RegionTint>) -> &mut Self {
        self.region_tint = tint;
        self
    }

    /// Set the brightness curve: `base + treble * gain`.
    pub fn brightness(&mut self, base: f32, treble_gain: f32) -> &mut Self {
        self.brightness_base = base;
        self.brightness_treble_gain = treble_gain;
        self
    }

    /// Brightness multiplier for a normalized treble value.
    #[inline]
    pub fn brightness_for(&self, treble_norm: f32) -> f32 {
        self.brightness_base + treble_norm * self.brightness_treble_gain
    }

    /// Stroke width for a particle speed multiplier.
    #[inline]
    pub fn line_width(&self, speed: f32) -> f32 {
        self.line_width_base + (1.0 - speed / 2.0) * self.line_width_gain
    }

    /// Stroke alpha at gradient offset `t`, scaled by brightness and clamped
    /// to `[0, 1]`.
    pub fn alpha_at(&self, t: f32, brightness: f32) -> f32 {
        let stops = &self.alpha_stops;
        let raw = if t <= stops[0].0 {
            stops[0].1
        } else if t < stops[1].0 {
            let u = (t - stops[0].0) / (stops[1].0 - stops[0].0);
            stops[0].1 + (stops[1].1 - stops[0].1) * u
        } else if t < stops[2].0 {
            let u = (t - stops[1].0) / (stops[2].0 - stops[1].0);
            stops[1].1 + (stops[2].1 - stops[1].1) * u
        } else {
            stops[2].1
        };
        (raw * brightness).clamp(0.0, 1.0)
    }
}
