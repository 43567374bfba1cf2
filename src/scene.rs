//! The flow scene: every piece of per-run state behind one value.
//!
//! [`FlowScene`] owns the noise table, field grid, particle pool, latest
//! audio features and the canvas. The host calls [`FlowScene::frame`] once
//! per display refresh and [`FlowScene::resize`] when the viewport changes.
//! Nothing is global; two scenes never share state.
//!
//! # Frame pipeline
//!
//! ```text
//! SpectrumFrame -> AudioFeatures -> VectorField::build -> ParticleSystem::step -> TrailRenderer::draw
//! ```

use glam::Vec2;

use crate::audio::{AudioFeatures, SpectrumFrame};
use crate::canvas::Canvas;
use crate::field::{FieldConfig, VectorField};
use crate::lifecycle::LifecycleConfig;
use crate::noise::Perlin;
use crate::renderer::TrailRenderer;
use crate::system::{ParticleSystem, StepStats};
use crate::visuals::VisualConfig;

/// Logical drawing area plus the device pixel ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Width in logical units.
    pub width: f32,
    /// Height in logical units.
    pub height: f32,
    /// Device pixels per logical unit, capped at [`Viewport::MAX_SCALE`].
    pub scale_factor: f32,
}

impl Viewport {
    /// Highest device pixel ratio the canvas is allocated at.
    pub const MAX_SCALE: f32 = 2.0;

    /// Create a viewport. Non-finite or negative sizes become zero and an
    /// invalid scale becomes 1.
    pub fn new(width: f32, height: f32, scale_factor: f32) -> Self {
        let scale_factor = if scale_factor.is_finite() && scale_factor > 0.0 {
            scale_factor.min(Self::MAX_SCALE)
        } else {
            1.0
        };
        Self {
            width: non_negative(width),
            height: non_negative(height),
            scale_factor,
        }
    }

    /// Build from a window's physical size and its OS scale factor.
    ///
    /// The logical size uses the real scale factor; only the canvas
    /// resolution is capped.
    pub fn from_physical(width: u32, height: u32, scale_factor: f64) -> Self {
        let os_scale = if scale_factor.is_finite() && scale_factor > 0.0 {
            scale_factor as f32
        } else {
            1.0
        };
        Self::new(width as f32 / os_scale, height as f32 / os_scale, os_scale)
    }

    /// Canvas size in device pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            (self.width * self.scale_factor).floor() as u32,
            (self.height * self.scale_factor).floor() as u32,
        )
    }

    /// Center point.
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width, self.height) * 0.5
    }

    /// Whether the viewport has no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

fn non_negative(v: f32) -> f32 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

/// Everything needed to build a [`FlowScene`].
#[derive(Clone, Debug, PartialEq)]
pub struct SceneConfig {
    /// Number of particles in the pool.
    pub particle_count: usize,
    /// Positions kept per trail.
    pub trail_length: usize,
    /// Seed for the noise table and particle RNG. `None` uses entropy.
    pub seed: Option<u64>,
    /// Field builder settings.
    pub field: FieldConfig,
    /// Particle lifecycle settings.
    pub lifecycle: LifecycleConfig,
    /// Trail visuals.
    pub visuals: VisualConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            particle_count: 6200,
            trail_length: 120,
            seed: None,
            field: FieldConfig::default(),
            lifecycle: LifecycleConfig::default(),
            visuals: VisualConfig::default(),
        }
    }
}

impl SceneConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the particle count.
    pub fn with_particles(mut self, count: usize) -> Self {
        self.particle_count = count;
        self
    }

    /// Set the trail length (at least 1).
    pub fn with_trail_length(mut self, length: usize) -> Self {
        self.trail_length = length.max(1);
        self
    }

    /// Fix the seed for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Replace the field settings.
    pub fn with_field(mut self, field: FieldConfig) -> Self {
        self.field = field;
        self
    }

    /// Replace the lifecycle settings.
    pub fn with_lifecycle(mut self, lifecycle: LifecycleConfig) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// Replace the visual settings.
    pub fn with_visuals(mut self, visuals: VisualConfig) -> Self {
        self.visuals = visuals;
        self
    }
}

/// Explicit context for one running visualization.
#[derive(Debug)]
pub struct FlowScene {
    viewport: Viewport,
    noise: Perlin,
    field: VectorField,
    system: ParticleSystem,
    renderer: TrailRenderer,
    canvas: Canvas,
    features: AudioFeatures,
    frames: u64,
}

impl FlowScene {
    /// Allocate everything for `viewport` and paint the opaque background.
    pub fn new(config: SceneConfig, viewport: Viewport) -> Self {
        let noise = match config.seed {
            Some(seed) => Perlin::with_seed(seed),
            None => Perlin::new(),
        };
        // Keep the particle stream independent of the noise table
        let particle_seed = config.seed.map(|s| s ^ 0x9E37_79B9_7F4A_7C15);

        let field = VectorField::new(config.field, viewport);
        let system = ParticleSystem::new(
            config.particle_count,
            config.trail_length,
            config.lifecycle,
            viewport,
            particle_seed,
        );
        let renderer = TrailRenderer::new(config.visuals);
        let mut canvas = Canvas::new(viewport);
        renderer.clear(&mut canvas);

        log::info!(
            "scene: {} particles, trail {}, grid {}x{}, canvas {}x{}",
            system.len(),
            system.trail_len(),
            field.cols(),
            field.rows(),
            canvas.width(),
            canvas.height()
        );

        Self {
            viewport,
            noise,
            field,
            system,
            renderer,
            canvas,
            features: AudioFeatures::SILENT,
            frames: 0,
        }
    }

    /// Run one frame at `time` seconds with the given spectrum.
    pub fn frame(&mut self, time: f32, spectrum: &SpectrumFrame) -> StepStats {
        self.features = spectrum.features();
        self.field
            .build(&self.noise, time, self.features.bass_norm());

        let speed_scale = self
            .system
            .lifecycle()
            .speed_scale(self.features.level_norm());
        let stats = self.system.step(&self.field, speed_scale);

        self.renderer.draw(
            &mut self.canvas,
            self.system.particles(),
            &self.features,
            self.viewport,
        );
        self.frames += 1;
        log::trace!(
            "frame {}: advanced {}, recycled {}",
            self.frames,
            stats.advanced,
            stats.recycled()
        );
        stats
    }

    /// Reallocate the grid, particle pool and canvas for a new viewport.
    pub fn resize(&mut self, viewport: Viewport) {
        if viewport == self.viewport {
            return;
        }
        self.viewport = viewport;
        self.field.resize(viewport);
        self.system.resize(viewport);
        self.canvas.resize(viewport);
        self.renderer.clear(&mut self.canvas);
        log::info!(
            "resize: {}x{} @{}x, grid {}x{}",
            viewport.width,
            viewport.height,
            viewport.scale_factor,
            self.field.cols(),
            self.field.rows()
        );
    }

    /// Meter value for UI display, in `[0.05, 1.0]`.
    pub fn meter_level(&self) -> f32 {
        self.features.meter()
    }

    /// Features used for the last frame.
    pub fn features(&self) -> &AudioFeatures {
        &self.features
    }

    /// Current viewport.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// The vector field as of the last frame.
    pub fn field(&self) -> &VectorField {
        &self.field
    }

    /// The particle pool.
    pub fn system(&self) -> &ParticleSystem {
        &self.system
    }

    /// Mutable particle pool.
    pub fn system_mut(&mut self) -> &mut ParticleSystem {
        &mut self.system
    }

    /// The canvas as of the last frame.
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Frames drawn since creation.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}
