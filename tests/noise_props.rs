//! Property tests for the noise function and the field sampler.

use flowfield::{FieldConfig, Perlin, Vec2, VectorField, Viewport};
use proptest::prelude::*;

fn coord() -> impl Strategy<Value = f64> {
    -2000.0f64..2000.0
}

proptest! {
    #[test]
    fn test_noise_in_unit_range(x in coord(), y in coord(), z in coord(), seed in any::<u64>()) {
        let n = Perlin::with_seed(seed).sample(x, y, z);
        prop_assert!((0.0..=1.0).contains(&n), "noise({x}, {y}, {z}) = {n}");
    }

    #[test]
    fn test_noise_on_lattice_in_unit_range(x in -600i32..600, y in -600i32..600, z in -600i32..600) {
        let n = Perlin::with_seed(1).sample(x as f64, y as f64, z as f64);
        prop_assert!((0.0..=1.0).contains(&n));
    }

    #[test]
    fn test_noise_period_256(x in -500.0f64..500.0, y in -500.0f64..500.0, z in -500.0f64..500.0, axis in 0usize..3) {
        let noise = Perlin::with_seed(77);
        let mut shifted = [x, y, z];
        shifted[axis] += 256.0;
        let a = noise.sample(x, y, z);
        let b = noise.sample(shifted[0], shifted[1], shifted[2]);
        prop_assert!((a - b).abs() < 1e-9, "{a} vs {b}");
    }

    #[test]
    fn test_noise_is_continuous(x in coord(), y in coord(), z in coord()) {
        let noise = Perlin::with_seed(3);
        let a = noise.sample(x, y, z);
        let b = noise.sample(x + 1e-4, y - 1e-4, z + 1e-4);
        prop_assert!((a - b).abs() < 1e-2, "{a} vs {b}");
    }

    #[test]
    fn test_sampler_clamps_outside_points(px in -1000.0f32..1500.0, py in -1000.0f32..1500.0, t in 0.0f32..100.0) {
        let viewport = Viewport::new(300.0, 200.0, 1.0);
        let mut field = VectorField::new(FieldConfig::default(), viewport);
        field.build(&Perlin::with_seed(9), t, 0.25);

        let cs = field.config().cell_size;
        let max_x = (field.cols() - 1) as f32 * cs;
        let max_y = (field.rows() - 1) as f32 * cs;
        let clamped = Vec2::new(px.clamp(0.0, max_x), py.clamp(0.0, max_y));

        let v = field.sample(Vec2::new(px, py));
        let expected = field.sample(clamped);
        prop_assert!((v - expected).length() < 1e-5, "{v:?} vs {expected:?}");
        prop_assert!(v.is_finite());
    }
}
