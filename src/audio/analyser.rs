//! Byte magnitude spectrum from raw samples.
//!
//! Mirrors a browser analyser node: the newest `fft_size` samples are
//! Blackman-windowed, transformed, scaled by `1 / fft_size`, smoothed over
//! time, converted to decibels and mapped linearly from
//! `[min_db, max_db]` onto `0..=255`.

use std::f32::consts::TAU;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Default transform size, giving 128 bins.
pub const DEFAULT_FFT_SIZE: usize = 256;

/// Default smoothing time constant.
pub const DEFAULT_SMOOTHING: f32 = 0.8;

/// Default decibel floor.
pub const DEFAULT_MIN_DB: f32 = -100.0;

/// Default decibel ceiling.
pub const DEFAULT_MAX_DB: f32 = -30.0;

/// Windowed FFT with temporal smoothing.
pub struct SpectrumAnalyser {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
}

impl SpectrumAnalyser {
    /// Create an analyser. `fft_size` is rounded up to a power of two, at least 32.
    pub fn new(fft_size: usize) -> Self {
        let size = fft_size.max(32).next_power_of_two();
        let fft = FftPlanner::new().plan_fft_forward(size);
        Self {
            fft,
            window: blackman(size),
            buffer: vec![Complex::new(0.0, 0.0); size],
            smoothed: vec![0.0; size / 2],
            smoothing: DEFAULT_SMOOTHING,
            min_db: DEFAULT_MIN_DB,
            max_db: DEFAULT_MAX_DB,
        }
    }

    /// Set the smoothing time constant, clamped to `[0, 1)`.
    pub fn with_smoothing(mut self, smoothing: f32) -> Self {
        self.smoothing = smoothing.clamp(0.0, 0.999);
        self
    }

    /// Set the decibel range mapped onto `0..=255`.
    pub fn with_db_range(mut self, min_db: f32, max_db: f32) -> Self {
        if max_db > min_db {
            self.min_db = min_db;
            self.max_db = max_db;
        }
        self
    }

    /// Transform size.
    pub fn fft_size(&self) -> usize {
        self.window.len()
    }

    /// Number of output bins (`fft_size / 2`).
    pub fn bin_count(&self) -> usize {
        self.smoothed.len()
    }

    /// Forget smoothing history.
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
    }

    /// Analyse the newest `fft_size` samples into `out`.
    ///
    /// Shorter input is zero-padded at the front. `out` is resized to
    /// [`bin_count`](Self::bin_count).
    pub fn process(&mut self, samples: &[f32], out: &mut Vec<u8>) {
        let n = self.fft_size();
        let take = samples.len().min(n);
        let recent = &samples[samples.len() - take..];
        let pad = n - take;

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let s = if i < pad { 0.0 } else { recent[i - pad] };
            let s = if s.is_finite() { s } else { 0.0 };
            *slot = Complex::new(s * self.window[i], 0.0);
        }
        self.fft.process(&mut self.buffer);

        let scale = 1.0 / n as f32;
        let tau = self.smoothing;
        let range = self.max_db - self.min_db;
        out.resize(self.smoothed.len(), 0);

        for (k, (smoothed, byte)) in self.smoothed.iter_mut().zip(out.iter_mut()).enumerate() {
            let magnitude = self.buffer[k].norm() * scale;
            *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;
            *byte = to_byte(*smoothed, self.min_db, range);
        }
    }
}

impl std::fmt::Debug for SpectrumAnalyser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumAnalyser")
            .field("fft_size", &self.fft_size())
            .field("smoothing", &self.smoothing)
            .field("min_db", &self.min_db)
            .field("max_db", &self.max_db)
            .finish_non_exhaustive()
    }
}

fn to_byte(magnitude: f32, min_db: f32, range: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = (255.0 / range) * (db - min_db);
    scaled.clamp(0.0, 255.0) as u8
}

fn blackman(n: usize) -> Vec<f32> {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;
    (0..n)
        .map(|i| {
            let x = i as f32 / n as f32;
            A0 - A1 * (TAU * x).cos() + A2 * (2.0 * TAU * x).cos()
        })
        .collect()
}
