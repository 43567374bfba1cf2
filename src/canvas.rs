//! Software framebuffer the renderer draws into.
//!
//! Pixels are `Vec3` in display space, `0.0..=1.0` per channel. Drawing takes
//! viewport units and scales them by the device pixel ratio, so callers never
//! deal with physical pixels.
//!
//! Strokes are rasterized by walking each polyline segment in sub-pixel steps
//! and depositing `alpha * width * step` of coverage, split bilinearly over
//! the four nearest pixel centers. A one-unit-wide line therefore contributes
//! about one unit of coverage per pixel it crosses.

use glam::{Vec2, Vec3};
use rayon::prelude::*;

use crate::scene::Viewport;
use crate::visuals::BlendMode;

/// Distance between coverage samples along a segment, in pixels.
const STEP: f32 = 0.5;

/// Upper bound on samples per segment so runaway segments stay cheap.
const MAX_SAMPLES: usize = 4096;

/// Linear-gradient stroke parameters.
///
/// Alpha along the path comes from projecting each point onto the
/// `from -> to` line and mapping the offset through the caller's alpha ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    /// Gradient start (offset 0), viewport units.
    pub from: Vec2,
    /// Gradient end (offset 1), viewport units.
    pub to: Vec2,
    /// Stroke color before alpha.
    pub color: Vec3,
    /// Line width, viewport units.
    pub width: f32,
}

impl Stroke {
    /// Gradient offset of `point`, clamped to `[0, 1]`. `None` for a
    /// zero-length or non-finite gradient.
    pub fn offset(&self, point: Vec2) -> Option<f32> {
        let d = self.to - self.from;
        let len_sq = d.length_squared();
        if len_sq <= 0.0 || !len_sq.is_finite() {
            return None;
        }
        Some(((point - self.from).dot(d) / len_sq).clamp(0.0, 1.0))
    }
}

/// RGB framebuffer in device pixels.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: u32,
    height: u32,
    scale: f32,
    pixels: Vec<Vec3>,
}

impl Canvas {
    /// Allocate a black canvas sized for `viewport`.
    pub fn new(viewport: Viewport) -> Self {
        let (width, height) = viewport.pixel_size();
        Self {
            width,
            height,
            scale: viewport.scale_factor,
            pixels: vec![Vec3::ZERO; width as usize * height as usize],
        }
    }

    /// Reallocate for a new viewport. Contents are discarded.
    pub fn resize(&mut self, viewport: Viewport) {
        *self = Self::new(viewport);
    }

    /// Overwrite every pixel with an opaque color.
    pub fn clear(&mut self, color: Vec3) {
        self.pixels.fill(color);
    }

    /// Composite a translucent full-frame fill (source-over).
    pub fn fill(&mut self, color: Vec3, alpha: f32) {
        let a = alpha.clamp(0.0, 1.0);
        self.pixels
            .par_iter_mut()
            .for_each(|p| *p = p.lerp(color, a));
    }

    /// Draw a polyline through `path` with a linear alpha gradient.
    ///
    /// Zero-length gradients paint nothing.
    pub fn stroke<I, F>(&mut self, path: I, stroke: &Stroke, alpha: F, blend: BlendMode)
    where
        I: IntoIterator<Item = Vec2>,
        F: Fn(f32) -> f32,
    {
        if stroke.offset(stroke.from).is_none() || stroke.width.is_nan() || stroke.width <= 0.0 {
            return;
        }

        let width_px = stroke.width * self.scale;
        // Wider lines are spread across parallel sample rows
        let lanes = width_px.ceil().max(1.0) as usize;
        let lane_weight = width_px / lanes as f32;

        let mut points = path.into_iter();
        let Some(mut prev) = points.next() else {
            return;
        };

        for next in points {
            let seg = next - prev;
            let len_px = seg.length() * self.scale;
            if len_px.is_finite() && len_px > 0.0 {
                let samples = ((len_px / STEP).ceil() as usize).clamp(1, MAX_SAMPLES);
                let step_px = len_px / samples as f32;
                let normal = seg.perp().normalize_or_zero();

                for i in 0..samples {
                    let point = prev + seg * ((i as f32 + 0.5) / samples as f32);
                    let Some(t) = stroke.offset(point) else {
                        continue;
                    };
                    let coverage = alpha(t).clamp(0.0, 1.0) * lane_weight * step_px;
                    if coverage <= 0.0 {
                        continue;
                    }
                    for lane in 0..lanes {
                        let shift = (lane as f32 + 0.5) - lanes as f32 * 0.5;
                        let at = point * self.scale + normal * shift;
                        self.deposit(at, stroke.color, coverage, blend);
                    }
                }
            }
            prev = next;
        }
    }

    /// Split `amount` of coverage over the four pixels around `at`.
    fn deposit(&mut self, at: Vec2, color: Vec3, amount: f32, blend: BlendMode) {
        let fx = at.x - 0.5;
        let fy = at.y - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let wx = fx - x0;
        let wy = fy - y0;

        let corners = [
            (x0, y0, (1.0 - wx) * (1.0 - wy)),
            (x0 + 1.0, y0, wx * (1.0 - wy)),
            (x0, y0 + 1.0, (1.0 - wx) * wy),
            (x0 + 1.0, y0 + 1.0, wx * wy),
        ];
        for (x, y, w) in corners {
            if x < 0.0 || y < 0.0 || x >= self.width as f32 || y >= self.height as f32 {
                continue;
            }
            let idx = y as usize * self.width as usize + x as usize;
            let a = (amount * w).min(1.0);
            let dst = &mut self.pixels[idx];
            *dst = composite(*dst, color, a, blend);
        }
    }

    /// Width in device pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in device pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Device pixels per viewport unit.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Pixel at device coordinates.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Vec3> {
        if x < self.width && y < self.height {
            Some(self.pixels[y as usize * self.width as usize + x as usize])
        } else {
            None
        }
    }

    /// All pixels, row-major.
    pub fn pixels(&self) -> &[Vec3] {
        &self.pixels
    }

    /// Pack into opaque RGBA8, row-major.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels
            .par_iter()
            .flat_map_iter(|p| {
                let c = (p.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
                [c.x as u8, c.y as u8, c.z as u8, 255]
            })
            .collect()
    }
}

#[inline]
fn composite(dst: Vec3, src: Vec3, a: f32, blend: BlendMode) -> Vec3 {
    match blend {
        BlendMode::Alpha => dst.lerp(src, a),
        BlendMode::Additive => (dst + src * a).min(Vec3::ONE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas(w: f32, h: f32, scale: f32) -> Canvas {
        Canvas::new(Viewport::new(w, h, scale))
    }

    fn total(canvas: &Canvas) -> f32 {
        canvas.pixels().iter().map(|p| p.x + p.y + p.z).sum()
    }

    // ========== Fill Tests ==========

    #[test]
    fn test_canvas_dimensions_scale_with_dpr() {
        let c = canvas(100.0, 50.0, 2.0);
        assert_eq!((c.width(), c.height()), (200, 100));
        assert_eq!(c.pixels().len(), 20_000);
    }

    #[test]
    fn test_clear_then_fade_converges_to_background() {
        let mut c = canvas(4.0, 4.0, 1.0);
        c.clear(Vec3::ONE);
        let bg = Vec3::new(0.02, 0.04, 0.08);
        for _ in 0..60 {
            c.fill(bg, 0.28);
        }
        let p = c.pixel(1, 1).unwrap();
        assert!((p - bg).abs().max_element() < 1e-4);
    }

    #[test]
    fn test_fill_single_step() {
        let mut c = canvas(2.0, 2.0, 1.0);
        c.clear(Vec3::ONE);
        c.fill(Vec3::ZERO, 0.25);
        assert!((c.pixel(0, 0).unwrap().x - 0.75).abs() < 1e-6);
    }

    // ========== Stroke Tests ==========

    #[test]
    fn test_zero_length_gradient_paints_nothing() {
        let mut c = canvas(20.0, 20.0, 1.0);
        let p = Vec2::new(10.0, 10.0);
        let stroke = Stroke { from: p, to: p, color: Vec3::ONE, width: 1.0 };
        c.stroke([p, p, Vec2::new(15.0, 10.0)], &stroke, |_| 1.0, BlendMode::Additive);
        assert_eq!(total(&c), 0.0);
    }

    #[test]
    fn test_stroke_paints_along_path() {
        let mut c = canvas(20.0, 20.0, 1.0);
        let stroke = Stroke {
            from: Vec2::new(2.0, 10.0),
            to: Vec2::new(18.0, 10.0),
            color: Vec3::ONE,
            width: 1.0,
        };
        c.stroke([stroke.from, stroke.to], &stroke, |_| 1.0, BlendMode::Additive);
        assert!(c.pixel(10, 9).unwrap().x > 0.0 || c.pixel(10, 10).unwrap().x > 0.0);
        assert_eq!(c.pixel(10, 2).unwrap(), Vec3::ZERO);
    }

    #[test]
    fn test_alpha_gradient_fades_toward_tail() {
        let mut c = canvas(40.0, 10.0, 1.0);
        let stroke = Stroke {
            from: Vec2::new(0.0, 5.0),
            to: Vec2::new(40.0, 5.0),
            color: Vec3::ONE,
            width: 1.0,
        };
        c.stroke([stroke.from, stroke.to], &stroke, |t| t, BlendMode::Additive);
        let column = |x: u32| (0..10).map(|y| c.pixel(x, y).unwrap().x).sum::<f32>();
        assert!(column(35) > column(5));
    }

    #[test]
    fn test_additive_saturates() {
        let mut c = canvas(10.0, 10.0, 1.0);
        let stroke = Stroke {
            from: Vec2::new(0.0, 5.0),
            to: Vec2::new(10.0, 5.0),
            color: Vec3::ONE,
            width: 1.0,
        };
        for _ in 0..50 {
            c.stroke([stroke.from, stroke.to], &stroke, |_| 1.0, BlendMode::Additive);
        }
        assert!(c.pixels().iter().all(|p| p.max_element() <= 1.0));
    }

    #[test]
    fn test_offscreen_stroke_is_ignored() {
        let mut c = canvas(10.0, 10.0, 1.0);
        let stroke = Stroke {
            from: Vec2::new(-50.0, -50.0),
            to: Vec2::new(-40.0, -50.0),
            color: Vec3::ONE,
            width: 1.0,
        };
        c.stroke([stroke.from, stroke.to], &stroke, |_| 1.0, BlendMode::Alpha);
        assert_eq!(total(&c), 0.0);
    }

    #[test]
    fn test_composite_modes() {
        let dst = Vec3::splat(0.5);
        let src = Vec3::splat(0.8);
        assert!((composite(dst, src, 0.5, BlendMode::Alpha).x - 0.65).abs() < 1e-6);
        assert!((composite(dst, src, 0.5, BlendMode::Additive).x - 0.9).abs() < 1e-6);
    }

    // ========== Encode Tests ==========

    #[test]
    fn test_to_rgba8() {
        let mut c = canvas(2.0, 1.0, 1.0);
        c.clear(Vec3::new(1.0, 0.5, 0.0));
        assert_eq!(c.to_rgba8(), vec![255, 128, 0, 255, 255, 128, 0, 255]);
    }
}
