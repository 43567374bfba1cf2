//! # flowfield - audio-reactive particle flow fields
//!
//! Thousands of trailing particles drift through a vector field built from
//! 3D gradient noise and five swirl attractors. Live audio pushes the swirl
//! with bass, the speed with overall level and the brightness with treble.
//!
//! ## Quick Start
//!
//! ```ignore
//! use flowfield::prelude::*;
//!
//! fn main() -> Result<(), SimulationError> {
//!     Visualizer::new()
//!         .with_particles(6200)
//!         .with_trail_length(120)
//!         .with_microphone(true)
//!         .run()
//! }
//! ```
//!
//! ## Frame Pipeline
//!
//! Each frame runs on one thread, in order:
//!
//! 1. [`AudioHub::poll`] reads the newest samples without blocking and
//!    produces a [`SpectrumFrame`] of byte magnitudes.
//! 2. [`AudioFeatures::extract`] reduces it to bass, mid, treble and level.
//! 3. [`VectorField::build`] rewrites every cell from noise plus attractor
//!    swirl and normalizes it.
//! 4. [`ParticleSystem::step`] samples the field bilinearly, moves each
//!    particle and recycles the ones that expire.
//! 5. [`TrailRenderer`] fades the [`Canvas`] and strokes every trail.
//!
//! [`FlowScene`] ties these together for callers that only need
//! `frame` and `resize`.
//!
//! ## Headless Use
//!
//! ```ignore
//! let mut scene = FlowScene::new(SceneConfig::new().with_seed(1), Viewport::new(800.0, 600.0, 1.0));
//! let stats = flowfield::export::render_frames(&mut scene, 240);
//! flowfield::export::write_png(scene.canvas(), "flow.png".as_ref())?;
//! ```
//!
//! ## Feature Overview
//!
//! | Module | Provides |
//! |--------|----------|
//! | [`noise`] | Seedable 3D gradient noise in `[0, 1]` |
//! | [`field`] | Grid builder, attractors, bilinear sampler |
//! | [`audio`] | Microphone and file sources, FFT analyser, banded features |
//! | [`system`] | Particle pool, advection, recycling |
//! | [`renderer`] | Gradient-colored trail strokes |
//! | [`export`] | Fixed-step offline render to PNG |

pub mod audio;
pub mod canvas;
pub mod error;
pub mod export;
pub mod field;
mod gpu;
pub mod lifecycle;
pub mod noise;
pub mod particle;
pub mod renderer;
pub mod scene;
mod simulation;
pub mod spawn;
pub mod system;
pub mod time;
pub mod visuals;
mod window;

pub use audio::{
    AudioFeatures, AudioHub, AudioSource, AudioStatus, SpectrumAnalyser, SpectrumFrame,
};
pub use canvas::{Canvas, Stroke};
pub use error::{AudioError, ExportError, GpuError, SimulationError};
pub use field::{Attractor, FieldConfig, VectorField};
pub use glam::{Vec2, Vec3};
pub use lifecycle::{ExpireReason, LifecycleConfig, ParticleState};
pub use noise::Perlin;
pub use particle::{Particle, Trail};
pub use renderer::TrailRenderer;
pub use scene::{FlowScene, SceneConfig, Viewport};
pub use simulation::Visualizer;
pub use spawn::SpawnContext;
pub use system::{ParticleSystem, StepStats};
pub use time::Clock;
pub use visuals::{BlendMode, Gradient, RegionTint, VisualConfig};

/// Convenient re-exports for common usage.
///
/// # Usage
///
/// ```ignore
/// use flowfield::prelude::*;
/// ```
///
/// This imports:
/// - [`Visualizer`] - the window/export builder
/// - [`FlowScene`], [`SceneConfig`], [`Viewport`] - headless scene control
/// - [`FieldConfig`], [`LifecycleConfig`], [`VisualConfig`] - tuning
/// - [`SpectrumFrame`], [`AudioFeatures`] - audio input types
/// - [`Vec2`], [`Vec3`] - glam vector types
pub mod prelude {
    pub use crate::audio::{AudioFeatures, AudioHub, AudioSource, AudioStatus, SpectrumFrame};
    pub use crate::error::{AudioError, ExportError, GpuError, SimulationError};
    pub use crate::field::{Attractor, FieldConfig};
    pub use crate::lifecycle::LifecycleConfig;
    pub use crate::scene::{FlowScene, SceneConfig, Viewport};
    pub use crate::simulation::Visualizer;
    pub use crate::time::Clock;
    pub use crate::visuals::{rgb, BlendMode, Gradient, RegionTint, VisualConfig};
    pub use crate::{Vec2, Vec3};
}
