//! The interactive window loop.
//!
//! [`App`] implements winit's [`ApplicationHandler`]. On every
//! `RedrawRequested` it polls audio, runs one scene frame and presents the
//! canvas, then asks for the next redraw.
//!
//! | Key | Action |
//! |-----|--------|
//! | `M` | toggle microphone |
//! | `Space` | pause / resume audio; replays a finished file |
//! | `Esc` | quit |

use std::sync::Arc;
use std::time::{Duration, Instant};

use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use crate::audio::{AudioHub, AudioSource};
use crate::error::SimulationError;
use crate::gpu::Presenter;
use crate::scene::{FlowScene, SceneConfig, Viewport};
use crate::system::StepStats;
use crate::time::Clock;

const TITLE: &str = "flowfield";
const REPORT_INTERVAL: Duration = Duration::from_secs(1);
const TITLE_INTERVAL: Duration = Duration::from_millis(500);

/// Window-loop state. Everything but the config is created on `resumed`.
pub(crate) struct App {
    config: SceneConfig,
    size: (u32, u32),
    start_audio: Option<AudioSource>,
    window: Option<Arc<Window>>,
    presenter: Option<Presenter>,
    scene: Option<FlowScene>,
    audio: AudioHub,
    clock: Clock,
    stats: StepStats,
    last_report: Instant,
    last_title: Instant,
    error: Option<SimulationError>,
}

impl App {
    pub(crate) fn new(
        config: SceneConfig,
        size: (u32, u32),
        start_audio: Option<AudioSource>,
    ) -> Self {
        let now = Instant::now();
        Self {
            config,
            size,
            start_audio,
            window: None,
            presenter: None,
            scene: None,
            audio: AudioHub::default(),
            clock: Clock::new(),
            stats: StepStats::default(),
            last_report: now,
            last_title: now,
            error: None,
        }
    }

    /// Error that ended the loop, if any.
    pub(crate) fn take_error(&mut self) -> Option<SimulationError> {
        self.error.take()
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), SimulationError> {
        let attrs = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(LogicalSize::new(self.size.0, self.size.1));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let presenter = pollster::block_on(Presenter::new(window.clone()))?;

        let inner = window.inner_size();
        let viewport = Viewport::from_physical(inner.width, inner.height, window.scale_factor());
        self.scene = Some(FlowScene::new(self.config.clone(), viewport));

        if let Some(source) = self.start_audio.take() {
            self.audio.request(source);
        }

        self.presenter = Some(presenter);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        let Some(window) = &self.window else {
            return;
        };
        if let Some(presenter) = &mut self.presenter {
            presenter.resize(width, height);
        }
        if let Some(scene) = &mut self.scene {
            scene.resize(Viewport::from_physical(width, height, window.scale_factor()));
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        match &event.logical_key {
            Key::Named(NamedKey::Escape) => event_loop.exit(),
            Key::Named(NamedKey::Space) => {
                let status = self.audio.toggle_pause();
                log::info!("audio {status}");
            }
            Key::Character(c) if c.as_str().eq_ignore_ascii_case("m") => {
                self.audio.toggle_microphone();
            }
            _ => {}
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(scene), Some(presenter)) = (&mut self.scene, &mut self.presenter) else {
            return;
        };

        let time = self.clock.tick();
        let spectrum = self.audio.poll();
        let stats = scene.frame(time, spectrum);
        self.stats.accumulate(stats);

        match presenter.present(scene.canvas()) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                presenter.reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("surface out of memory");
                event_loop.exit();
            }
            Err(e) => log::warn!("render error: {:?}", e),
        }

        self.report();
    }

    fn report(&mut self) {
        let now = Instant::now();

        if now.duration_since(self.last_report) >= REPORT_INTERVAL {
            log::debug!(
                "{:.1} fps, advanced {}, recycled {} (velocity {}, position {}, bounds {}, age {})",
                self.clock.fps(),
                self.stats.advanced,
                self.stats.recycled(),
                self.stats.non_finite_velocity,
                self.stats.non_finite_position,
                self.stats.out_of_bounds,
                self.stats.aged
            );
            self.stats = StepStats::default();
            self.last_report = now;
        }

        if now.duration_since(self.last_title) >= TITLE_INTERVAL {
            if let (Some(window), Some(scene)) = (&self.window, &self.scene) {
                window.set_title(&format!(
                    "{TITLE} | {:.0} fps | audio: {} | meter {:.2}",
                    self.clock.fps(),
                    self.audio.status(),
                    scene.meter_level()
                ));
            }
            self.last_title = now;
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            log::error!("{e}");
            self.error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                self.resize(physical_size.width, physical_size.height);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(event_loop, &event);
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.audio.stop();
    }
}
