//! Headless rendering to PNG.
//!
//! Runs a scene on a fixed 1/60 s clock with silent audio, then writes the
//! final canvas. No window or GPU is involved, so this works on CI machines.

use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};

use crate::audio::{SpectrumFrame, DEFAULT_FFT_SIZE};
use crate::canvas::Canvas;
use crate::error::ExportError;
use crate::scene::{FlowScene, SceneConfig, Viewport};
use crate::system::StepStats;
use crate::time::Clock;

/// Step used for offline renders.
pub const EXPORT_STEP: f32 = 1.0 / 60.0;

/// What an export produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    /// File written.
    pub path: PathBuf,
    /// Frames simulated before the capture.
    pub frames: u32,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Particle statistics summed over every frame.
    pub stats: StepStats,
}

/// Advance `scene` by `frames` fixed steps with no audio.
pub fn render_frames(scene: &mut FlowScene, frames: u32) -> StepStats {
    let mut clock = Clock::fixed(EXPORT_STEP);
    let spectrum = SpectrumFrame::silent(DEFAULT_FFT_SIZE / 2);
    let mut total = StepStats::default();
    for _ in 0..frames {
        let time = clock.tick();
        total.accumulate(scene.frame(time, &spectrum));
    }
    total
}

/// Encode `canvas` as PNG at `path`, creating parent directories.
pub fn write_png(canvas: &Canvas, path: &Path) -> Result<(), ExportError> {
    let (width, height) = (canvas.width(), canvas.height());
    if width == 0 || height == 0 {
        return Err(ExportError::EmptyFrame { width, height });
    }

    let image = RgbaImage::from_raw(width, height, canvas.to_rgba8())
        .ok_or(ExportError::EmptyFrame { width, height })?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Build a scene for `viewport`, run it for `frames` and save the result.
pub fn export_png(
    config: SceneConfig,
    viewport: Viewport,
    frames: u32,
    path: impl AsRef<Path>,
) -> Result<ExportSummary, ExportError> {
    let path = path.as_ref();
    let (width, height) = viewport.pixel_size();
    if width == 0 || height == 0 {
        return Err(ExportError::EmptyFrame { width, height });
    }

    let mut scene = FlowScene::new(config, viewport);
    let stats = render_frames(&mut scene, frames);
    write_png(scene.canvas(), path)?;

    log::info!(
        "exported {} frames to {} ({}x{}, {} recycled)",
        frames,
        path.display(),
        width,
        height,
        stats.recycled()
    );

    Ok(ExportSummary {
        path: path.to_path_buf(),
        frames,
        width,
        height,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SceneConfig {
        SceneConfig::new()
            .with_particles(300)
            .with_trail_length(16)
            .with_seed(11)
    }

    #[test]
    fn test_render_frames_counts_every_particle() {
        let mut scene = FlowScene::new(config(), Viewport::new(120.0, 80.0, 1.0));
        let stats = render_frames(&mut scene, 30);
        assert_eq!(scene.frames(), 30);
        assert_eq!(stats.advanced + stats.recycled(), 300 * 30);
    }

    #[test]
    fn test_export_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("flow.png");
        let summary = export_png(config(), Viewport::new(64.0, 48.0, 2.0), 20, &path).unwrap();

        assert_eq!((summary.width, summary.height), (128, 96));
        assert_eq!(summary.frames, 20);
        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (128, 96));
        assert!(decoded.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn test_export_rejects_empty_viewport() {
        let dir = tempfile::tempdir().unwrap();
        let err = export_png(config(), Viewport::new(0.0, 10.0, 1.0), 1, dir.path().join("x.png"))
            .unwrap_err();
        assert!(matches!(err, ExportError::EmptyFrame { width: 0, .. }));
        assert!(!dir.path().join("x.png").exists());
    }
}
