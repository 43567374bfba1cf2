//! Classic lattice-gradient noise.
//!
//! [`Perlin`] is the base signal for the flow field: a smooth, deterministic
//! scalar over 3D space that the field builder turns into a direction per cell.
//! The third axis is used as time, so the field drifts continuously.
//!
//! # Properties
//!
//! - Output lies in `[0, 1]`.
//! - Continuous and smooth along every axis (quintic fade curve).
//! - Periodic with period 256 along every axis.
//! - Deterministic for a given permutation table. The table is shuffled once
//!   when the generator is created; use [`Perlin::with_seed`] for reproducible
//!   output across runs.
//!
//! # Example
//!
//! ```ignore
//! use flowfield::noise::Perlin;
//!
//! let noise = Perlin::with_seed(7);
//! let n = noise.sample(0.3, 1.7, 0.0);
//! assert!((0.0..=1.0).contains(&n));
//! ```

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Number of distinct lattice hashes. Also the noise period.
pub const PERIOD: usize = 256;

/// 3D gradient noise backed by a shuffled permutation table.
#[derive(Clone)]
pub struct Perlin {
    /// `PERIOD` shuffled values, duplicated so `perm[i + 1]` never wraps.
    perm: [u8; PERIOD * 2],
}

impl Perlin {
    /// Create a generator with a table shuffled from OS entropy.
    pub fn new() -> Self {
        Self::from_rng(&mut SmallRng::from_entropy())
    }

    /// Create a generator whose table is fully determined by `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(&mut SmallRng::seed_from_u64(seed))
    }

    /// Create a generator by shuffling with the given RNG (Fisher-Yates).
    pub fn from_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut base = [0u8; PERIOD];
        for (i, slot) in base.iter_mut().enumerate() {
            *slot = i as u8;
        }
        for i in (1..PERIOD).rev() {
            let j = rng.gen_range(0..=i);
            base.swap(i, j);
        }

        let mut perm = [0u8; PERIOD * 2];
        for (i, slot) in perm.iter_mut().enumerate() {
            *slot = base[i & (PERIOD - 1)];
        }
        Self { perm }
    }

    /// Sample the noise at `(x, y, z)`. Returns a value in `[0, 1]`.
    pub fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        let (xi, xf) = lattice(x);
        let (yi, yf) = lattice(y);
        let (zi, zf) = lattice(z);

        let u = fade(xf);
        let v = fade(yf);
        let w = fade(zf);

        let p = &self.perm;
        let a = p[xi] as usize + yi;
        let aa = p[a] as usize + zi;
        let ab = p[a + 1] as usize + zi;
        let b = p[xi + 1] as usize + yi;
        let ba = p[b] as usize + zi;
        let bb = p[b + 1] as usize + zi;

        let x1 = lerp(grad(p[aa], xf, yf, zf), grad(p[ba], xf - 1.0, yf, zf), u);
        let x2 = lerp(
            grad(p[ab], xf, yf - 1.0, zf),
            grad(p[bb], xf - 1.0, yf - 1.0, zf),
            u,
        );
        let y1 = lerp(x1, x2, v);

        let x3 = lerp(
            grad(p[aa + 1], xf, yf, zf - 1.0),
            grad(p[ba + 1], xf - 1.0, yf, zf - 1.0),
            u,
        );
        let x4 = lerp(
            grad(p[ab + 1], xf, yf - 1.0, zf - 1.0),
            grad(p[bb + 1], xf - 1.0, yf - 1.0, zf - 1.0),
            u,
        );
        let y2 = lerp(x3, x4, v);

        ((lerp(y1, y2, w) + 1.0) * 0.5).clamp(0.0, 1.0)
    }
}

impl Default for Perlin {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Perlin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Perlin")
            .field("head", &&self.perm[..8])
            .finish_non_exhaustive()
    }
}

/// Split a coordinate into its wrapped lattice cell and fractional offset.
///
/// Uses `floor`, so negative coordinates land in the cell below.
#[inline]
fn lattice(t: f64) -> (usize, f64) {
    let floor = t.floor();
    let cell = (floor as i64).rem_euclid(PERIOD as i64) as usize;
    (cell, t - floor)
}

/// Quintic smoothing curve `6t^5 - 15t^4 + 10t^3`.
#[inline]
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Dot product of the offset with one of 12 edge gradients picked by `hash`.
#[inline]
fn grad(hash: u8, x: f64, y: f64, z: f64) -> f64 {
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let v = if h < 4 {
        y
    } else if h == 12 || h == 14 {
        x
    } else {
        z
    };
    let u = if h & 1 == 0 { u } else { -u };
    let v = if h & 2 == 0 { v } else { -v };
    u + v
}
