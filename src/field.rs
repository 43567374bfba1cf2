//! 2D flow field: a grid of unit direction vectors covering the viewport.
//!
//! The field is rebuilt from scratch every frame. Each cell gets a base
//! direction from [`Perlin`] noise (sampled at the cell's grid index and the
//! current time) plus a rotational pull from each [`Attractor`]. The sum is
//! normalized so particle speed never depends on field magnitude.
//!
//! Particles read the field through [`VectorField::sample`], which clamps to
//! the grid and bilinearly interpolates the four surrounding cells.
//!
//! # Layout
//!
//! Cell `(col, row)` sits at `(col * cell_size, row * cell_size)` in viewport
//! units. The grid has `ceil(width / cell_size)` columns and
//! `ceil(height / cell_size)` rows, never fewer than one of each.
//!
//! # Example
//!
//! ```ignore
//! let mut field = VectorField::new(FieldConfig::default(), Viewport::new(800.0, 600.0, 1.0));
//! field.build(&noise, elapsed_secs, features.bass_norm());
//! let v = field.sample(Vec2::new(120.0, 45.5));
//! ```

use std::f32::consts::TAU;

use glam::Vec2;

use crate::noise::Perlin;
use crate::scene::Viewport;

/// Tuning for the field builder.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldConfig {
    /// Cell edge length in viewport units.
    pub cell_size: f32,

    /// Multiplier from grid index to noise space.
    pub noise_scale: f32,

    /// Multiplier from seconds to the noise z axis.
    pub time_scale: f32,

    /// Noise value `n` in `[0, 1]` maps to angle `n * angle_span`.
    pub angle_span: f32,

    /// Distances to an attractor are clamped to at least this value.
    pub attractor_min_distance: f32,

    /// Swirl magnitude numerator: `strength / distance`.
    pub attractor_strength: f32,

    /// Swirl boost at silence.
    pub swirl_base: f32,

    /// Additional swirl boost per unit of normalized bass.
    pub swirl_bass_gain: f32,
}

impl FieldConfig {
    /// Create a field configuration with the given cell size.
    ///
    /// Other defaults:
    /// - `noise_scale`: 0.007
    /// - `time_scale`: 0.15
    /// - `angle_span`: 4π (two full turns across the noise range)
    /// - `attractor_min_distance`: 40
    /// - `attractor_strength`: 120
    /// - `swirl_base`: 0.9, `swirl_bass_gain`: 1.6
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(1.0),
            noise_scale: 0.007,
            time_scale: 0.15,
            angle_span: 2.0 * TAU,
            attractor_min_distance: 40.0,
            attractor_strength: 120.0,
            swirl_base: 0.9,
            swirl_bass_gain: 1.6,
        }
    }

    /// Set the noise spatial scale.
    pub fn with_noise_scale(mut self, scale: f32) -> Self {
        self.noise_scale = scale;
        self
    }

    /// Set how fast the noise drifts over time.
    pub fn with_time_scale(mut self, scale: f32) -> Self {
        self.time_scale = scale;
        self
    }

    /// Set attractor strength and minimum distance.
    pub fn with_attractors(mut self, strength: f32, min_distance: f32) -> Self {
        self.attractor_strength = strength;
        self.attractor_min_distance = min_distance.max(f32::EPSILON);
        self
    }

    /// Set the swirl boost curve: `base + bass * gain`.
    pub fn with_swirl(mut self, base: f32, bass_gain: f32) -> Self {
        self.swirl_base = base;
        self.swirl_bass_gain = bass_gain;
        self
    }

    /// Swirl multiplier for a normalized bass value.
    #[inline]
    pub fn swirl_boost(&self, bass_norm: f32) -> f32 {
        self.swirl_base + bass_norm * self.swirl_bass_gain
    }

    /// Grid dimensions `(cols, rows)` for a viewport.
    pub fn grid_size(&self, width: f32, height: f32) -> (usize, usize) {
        let cols = (width / self.cell_size).ceil();
        let rows = (height / self.cell_size).ceil();
        (to_count(cols), to_count(rows))
    }
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self::new(14.0)
    }
}

fn to_count(v: f32) -> usize {
    if v.is_finite() && v >= 1.0 {
        v as usize
    } else {
        1
    }
}

/// A fixed point that swirls nearby field vectors around itself.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Attractor {
    /// Position in viewport units.
    pub position: Vec2,
}

impl Attractor {
    /// Fractional viewport positions of the default five attractors.
    pub const LAYOUT: [(f32, f32); 5] = [
        (0.25, 0.35),
        (0.65, 0.30),
        (0.75, 0.70),
        (0.35, 0.65),
        (0.85, 0.20),
    ];

    /// Create an attractor at `position`.
    pub fn new(position: Vec2) -> Self {
        Self { position }
    }

    /// The default layout scaled to a viewport.
    pub fn layout(width: f32, height: f32) -> Vec<Attractor> {
        Self::LAYOUT
            .iter()
            .map(|&(fx, fy)| Attractor::new(Vec2::new(width * fx, height * fy)))
            .collect()
    }

    /// Rotational contribution at `point`.
    ///
    /// Perpendicular to the displacement from the attractor, with magnitude
    /// `strength / max(distance, min_distance) * boost`.
    #[inline]
    pub fn swirl_at(&self, point: Vec2, config: &FieldConfig, boost: f32) -> Vec2 {
        let d = point - self.position;
        let dist = d.length().max(config.attractor_min_distance);
        let swirl = (config.attractor_strength / dist) * boost;
        d.perp() / dist * swirl
    }
}

/// Grid of unit direction vectors over the viewport.
#[derive(Clone, Debug)]
pub struct VectorField {
    config: FieldConfig,
    cols: usize,
    rows: usize,
    cells: Vec<Vec2>,
    attractors: Vec<Attractor>,
}

impl VectorField {
    /// Allocate a field for the viewport with the default attractor layout.
    ///
    /// Cells start pointing along +x until the first [`build`](Self::build).
    pub fn new(config: FieldConfig, viewport: Viewport) -> Self {
        let (cols, rows) = config.grid_size(viewport.width, viewport.height);
        Self {
            cells: vec![Vec2::X; cols * rows],
            attractors: Attractor::layout(viewport.width, viewport.height),
            config,
            cols,
            rows,
        }
    }

    /// Reallocate the grid and re-derive attractors for a new viewport.
    pub fn resize(&mut self, viewport: Viewport) {
        let (cols, rows) = self.config.grid_size(viewport.width, viewport.height);
        self.cols = cols;
        self.rows = rows;
        self.cells = vec![Vec2::X; cols * rows];
        self.attractors = Attractor::layout(viewport.width, viewport.height);
    }

    /// Replace the attractor set.
    pub fn set_attractors(&mut self, attractors: Vec<Attractor>) {
        self.attractors = attractors;
    }

    /// Overwrite every cell from noise at `time` seconds plus attractor swirl.
    pub fn build(&mut self, noise: &Perlin, time: f32, bass_norm: f32) {
        let config = &self.config;
        let boost = config.swirl_boost(bass_norm);
        let z = (time * config.time_scale) as f64;
        let scale = config.noise_scale as f64;

        for row in 0..self.rows {
            for col in 0..self.cols {
                let n = noise.sample(col as f64 * scale, row as f64 * scale, z) as f32;
                let angle = n * config.angle_span;
                let mut v = Vec2::new(angle.cos(), angle.sin());

                let point = Vec2::new(col as f32, row as f32) * config.cell_size;
                for attractor in &self.attractors {
                    v += attractor.swirl_at(point, config, boost);
                }

                self.cells[row * self.cols + col] = cell_direction(v);
            }
        }
    }

    /// Set every cell to `direction`, normalized.
    pub fn fill(&mut self, direction: Vec2) {
        self.cells.fill(cell_direction(direction));
    }

    /// Bilinearly interpolated direction at a continuous viewport point.
    ///
    /// The grid coordinate is clamped to the cell range first, so points
    /// outside the grid return boundary values instead of extrapolating.
    /// Non-finite input yields non-finite output.
    pub fn sample(&self, point: Vec2) -> Vec2 {
        let gx = clamp_coord(point.x / self.config.cell_size, self.cols);
        let gy = clamp_coord(point.y / self.config.cell_size, self.rows);

        let x0 = cell_index(gx, self.cols);
        let y0 = cell_index(gy, self.rows);
        let x1 = (x0 + 1).min(self.cols - 1);
        let y1 = (y0 + 1).min(self.rows - 1);
        let fx = gx - x0 as f32;
        let fy = gy - y0 as f32;

        let v00 = self.cells[y0 * self.cols + x0];
        let v10 = self.cells[y0 * self.cols + x1];
        let v01 = self.cells[y1 * self.cols + x0];
        let v11 = self.cells[y1 * self.cols + x1];

        let top = v00.lerp(v10, fx);
        let bottom = v01.lerp(v11, fx);
        top.lerp(bottom, fy)
    }

    /// Stored vector at a cell, if in range.
    pub fn get(&self, col: usize, row: usize) -> Option<Vec2> {
        if col < self.cols && row < self.rows {
            Some(self.cells[row * self.cols + col])
        } else {
            None
        }
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Vec2] {
        &self.cells
    }

    /// Current attractors.
    pub fn attractors(&self) -> &[Attractor] {
        &self.attractors
    }

    /// Builder configuration.
    pub fn config(&self) -> &FieldConfig {
        &self.config
    }
}

/// Unit direction of a summed cell vector. A vanishing or non-finite sum
/// points along +x.
#[inline]
fn cell_direction(sum: Vec2) -> Vec2 {
    sum.try_normalize().unwrap_or(Vec2::X)
}

/// Clamp a grid coordinate to `[0, count - 1]`, passing NaN through.
#[inline]
fn clamp_coord(g: f32, count: usize) -> f32 {
    if g.is_nan() {
        g
    } else {
        g.clamp(0.0, (count - 1) as f32)
    }
}

#[inline]
fn cell_index(g: f32, count: usize) -> usize {
    // NaN and negatives saturate to 0
    (g.floor() as usize).min(count - 1)
}
