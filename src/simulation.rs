//! Visualizer builder and runner.
//!
//! [`Visualizer`] collects configuration with `with_*` calls, then either
//! opens a window with [`run`](Visualizer::run) or renders offline with
//! [`export`](Visualizer::export).
//!
//! # Example
//!
//! ```ignore
//! use flowfield::prelude::*;
//!
//! Visualizer::new()
//!     .with_particles(4000)
//!     .with_visuals(|v| {
//!         v.blend_mode(BlendMode::Additive).fade(0.2);
//!     })
//!     .with_microphone(true)
//!     .run()?;
//! ```

use std::path::{Path, PathBuf};

use winit::event_loop::{ControlFlow, EventLoop};

use crate::audio::AudioSource;
use crate::error::{ExportError, SimulationError};
use crate::export::{self, ExportSummary};
use crate::field::FieldConfig;
use crate::lifecycle::LifecycleConfig;
use crate::scene::{SceneConfig, Viewport};
use crate::visuals::VisualConfig;
use crate::window::App;

/// Builder for a flow-field visualization.
#[derive(Debug, Clone)]
pub struct Visualizer {
    scene: SceneConfig,
    size: (u32, u32),
    audio: Option<AudioSource>,
}

impl Visualizer {
    /// Defaults: 6200 particles, 120-slot trails, 1280x720 window, no audio.
    pub fn new() -> Self {
        Self {
            scene: SceneConfig::default(),
            size: (1280, 720),
            audio: None,
        }
    }

    /// Set the number of particles.
    pub fn with_particles(mut self, count: usize) -> Self {
        self.scene = self.scene.with_particles(count);
        self
    }

    /// Set the number of positions kept per trail.
    pub fn with_trail_length(mut self, length: usize) -> Self {
        self.scene = self.scene.with_trail_length(length);
        self
    }

    /// Fix the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.scene = self.scene.with_seed(seed);
        self
    }

    /// Replace the field settings.
    pub fn with_field(mut self, field: FieldConfig) -> Self {
        self.scene = self.scene.with_field(field);
        self
    }

    /// Replace the lifecycle settings.
    pub fn with_lifecycle(mut self, lifecycle: LifecycleConfig) -> Self {
        self.scene = self.scene.with_lifecycle(lifecycle);
        self
    }

    /// Adjust the visual settings in place.
    pub fn with_visuals<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut VisualConfig),
    {
        f(&mut self.scene.visuals);
        self
    }

    /// Open the default microphone as soon as the window is up.
    ///
    /// Replaces a file set with [`with_audio_file`](Self::with_audio_file).
    pub fn with_microphone(mut self, enabled: bool) -> Self {
        if enabled {
            self.audio = Some(AudioSource::Microphone);
        } else if self.audio == Some(AudioSource::Microphone) {
            self.audio = None;
        }
        self
    }

    /// Play an audio file as soon as the window is up.
    ///
    /// Replaces the microphone set with [`with_microphone`](Self::with_microphone).
    pub fn with_audio_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.audio = Some(AudioSource::File(path.into()));
        self
    }

    /// Window size in logical units. Also the export size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    /// The scene configuration built so far.
    pub fn scene_config(&self) -> &SceneConfig {
        &self.scene
    }

    /// Logical window size.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Audio source opened on start, if any.
    pub fn audio_source(&self) -> Option<&AudioSource> {
        self.audio.as_ref()
    }

    /// Open a window and run until it is closed.
    pub fn run(self) -> Result<(), SimulationError> {
        log::info!(
            "starting: {} particles, trail {}, {}x{}, audio {}",
            self.scene.particle_count,
            self.scene.trail_length,
            self.size.0,
            self.size.1,
            self.audio
                .as_ref()
                .map_or_else(|| "off".to_owned(), |source| source.to_string())
        );

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = App::new(self.scene, self.size, self.audio);
        event_loop.run_app(&mut app)?;

        match app.take_error() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Render `frames` silent frames at 1x scale and save a PNG.
    pub fn export(
        self,
        path: impl AsRef<Path>,
        frames: u32,
    ) -> Result<ExportSummary, ExportError> {
        let viewport = Viewport::new(self.size.0 as f32, self.size.1 as f32, 1.0);
        export::export_png(self.scene, viewport, frames, path)
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}
