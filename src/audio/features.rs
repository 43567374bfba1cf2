//! Banded features reduced from a byte magnitude spectrum.
//!
//! Bins are split into fixed index bands (not frequency bands): bass is bins
//! `[0, 10)`, mid `[10, 100)`, treble `[100, end)`. Each band value is the
//! plain mean of its bins, so all features stay on the `0..=255` byte scale.
//! An inactive source yields [`AudioFeatures::SILENT`] whatever the bins hold.

use std::ops::Range;

/// Bass band bin range.
pub const BASS_BINS: Range<usize> = 0..10;

/// Mid band bin range.
pub const MID_BINS: Range<usize> = 10..100;

/// First treble bin. Treble runs to the end of the spectrum.
pub const TREBLE_START: usize = 100;

/// Meter value when nothing is playing.
pub const METER_FLOOR: f32 = 0.05;

/// Four scalar features on the `0..=255` scale.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AudioFeatures {
    /// Mean of the bass bins.
    pub bass: f32,
    /// Mean of the mid bins.
    pub mid: f32,
    /// Mean of the treble bins.
    pub treble: f32,
    /// Mean of every bin.
    pub level: f32,
}

impl AudioFeatures {
    /// All four features at zero.
    pub const SILENT: Self = Self {
        bass: 0.0,
        mid: 0.0,
        treble: 0.0,
        level: 0.0,
    };

    /// Reduce a spectrum. Returns [`SILENT`](Self::SILENT) when `active` is false.
    pub fn extract(bins: &[u8], active: bool) -> Self {
        if !active {
            return Self::SILENT;
        }
        Self {
            bass: band_mean(bins, BASS_BINS.start, BASS_BINS.end),
            mid: band_mean(bins, MID_BINS.start, MID_BINS.end),
            treble: band_mean(bins, TREBLE_START, bins.len()),
            level: band_mean(bins, 0, bins.len()),
        }
    }

    /// Bass in `[0, 1]`.
    #[inline]
    pub fn bass_norm(&self) -> f32 {
        self.bass / 255.0
    }

    /// Mid in `[0, 1]`.
    #[inline]
    pub fn mid_norm(&self) -> f32 {
        self.mid / 255.0
    }

    /// Treble in `[0, 1]`.
    #[inline]
    pub fn treble_norm(&self) -> f32 {
        self.treble / 255.0
    }

    /// Overall level in `[0, 1]`.
    #[inline]
    pub fn level_norm(&self) -> f32 {
        self.level / 255.0
    }

    /// UI meter in `[0.05, 1.0]`. Silent features read as the floor.
    pub fn meter(&self) -> f32 {
        METER_FLOOR + self.level_norm().clamp(0.0, 1.0) * (1.0 - METER_FLOOR)
    }
}

/// Mean of `bins[start..end]` with `end` clamped to the slice length.
///
/// The divisor is at least one, so empty or out-of-range bands read as zero.
pub fn band_mean(bins: &[u8], start: usize, end: usize) -> f32 {
    let end = end.min(bins.len());
    let start = start.min(end);
    let sum: u32 = bins[start..end].iter().map(|&b| b as u32).sum();
    sum as f32 / (end - start).max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Extraction Tests ==========

    #[test]
    fn test_zero_spectrum_is_silent() {
        let f = AudioFeatures::extract(&[0u8; 128], true);
        assert_eq!(f, AudioFeatures::SILENT);
    }

    #[test]
    fn test_inactive_ignores_stale_bins() {
        let f = AudioFeatures::extract(&[200u8; 128], false);
        assert_eq!(f, AudioFeatures::SILENT);
    }

    #[test]
    fn test_band_means() {
        let mut bins = vec![0u8; 128];
        bins[..10].fill(100);
        bins[10..100].fill(50);
        bins[100..].fill(10);
        let f = AudioFeatures::extract(&bins, true);
        assert_eq!(f.bass, 100.0);
        assert_eq!(f.mid, 50.0);
        assert_eq!(f.treble, 10.0);
        let expected = (100.0 * 10.0 + 50.0 * 90.0 + 10.0 * 28.0) / 128.0;
        assert!((f.level - expected).abs() < 1e-4);
    }

    #[test]
    fn test_short_spectrum_treble_is_zero() {
        let f = AudioFeatures::extract(&[255u8; 50], true);
        assert_eq!(f.bass, 255.0);
        assert_eq!(f.mid, 255.0);
        assert_eq!(f.treble, 0.0);
        assert_eq!(f.level, 255.0);
    }

    #[test]
    fn test_empty_spectrum() {
        assert_eq!(AudioFeatures::extract(&[], true), AudioFeatures::SILENT);
    }

    // ========== Meter Tests ==========

    #[test]
    fn test_meter_range() {
        assert_eq!(AudioFeatures::SILENT.meter(), METER_FLOOR);
        let loud = AudioFeatures { level: 255.0, ..AudioFeatures::SILENT };
        assert!((loud.meter() - 1.0).abs() < 1e-6);
        let half = AudioFeatures { level: 127.5, ..AudioFeatures::SILENT };
        assert!((half.meter() - 0.525).abs() < 1e-6);
    }

    #[test]
    fn test_normalized_accessors() {
        let f = AudioFeatures { bass: 255.0, mid: 51.0, treble: 0.0, level: 25.5 };
        assert_eq!(f.bass_norm(), 1.0);
        assert!((f.mid_norm() - 0.2).abs() < 1e-6);
        assert_eq!(f.treble_norm(), 0.0);
        assert!((f.level_norm() - 0.1).abs() < 1e-6);
    }
}
