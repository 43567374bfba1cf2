//! Integration tests for the flow pipeline.
//!
//! These drive the public API the way a host does: build a field, step a
//! particle pool, run whole scene frames, and check the behavioral contracts
//! of each stage.

use flowfield::audio::AudioFeatures;
use flowfield::{
    FieldConfig, FlowScene, LifecycleConfig, ParticleSystem, Perlin, SceneConfig, SpectrumFrame,
    Vec2, VectorField, Viewport,
};

fn viewport() -> Viewport {
    Viewport::new(320.0, 240.0, 1.0)
}

fn built_field(seed: u64, time: f32, bass: f32) -> VectorField {
    let mut field = VectorField::new(FieldConfig::default(), viewport());
    field.build(&Perlin::with_seed(seed), time, bass);
    field
}

// ============================================================================
// Field Tests
// ============================================================================

#[test]
fn test_built_vectors_are_unit_length() {
    for (time, bass) in [(0.0, 0.0), (3.7, 0.5), (120.0, 1.0)] {
        let field = built_field(42, time, bass);
        for v in field.cells() {
            assert!((v.length() - 1.0).abs() < 1e-5, "{v:?} at t={time}");
        }
    }
}

#[test]
fn test_sample_at_vertex_returns_cell() {
    let field = built_field(5, 1.25, 0.3);
    let cs = field.config().cell_size;
    for (col, row) in [(0, 0), (3, 7), (10, 4), (field.cols() - 1, field.rows() - 1)] {
        let point = Vec2::new(col as f32 * cs, row as f32 * cs);
        assert_eq!(field.sample(point), field.get(col, row).unwrap());
    }
}

#[test]
fn test_sample_outside_returns_boundary_cell() {
    let field = built_field(5, 0.5, 0.0);
    let last_col = field.cols() - 1;
    let last_row = field.rows() - 1;
    assert_eq!(field.sample(Vec2::new(-500.0, -500.0)), field.get(0, 0).unwrap());
    assert_eq!(
        field.sample(Vec2::new(1.0e6, 1.0e6)),
        field.get(last_col, last_row).unwrap()
    );
    assert_eq!(
        field.sample(Vec2::new(-50.0, last_row as f32 * field.config().cell_size)),
        field.get(0, last_row).unwrap()
    );
}

#[test]
fn test_bass_changes_field() {
    let quiet = built_field(9, 2.0, 0.0);
    let loud = built_field(9, 2.0, 1.0);
    let changed = quiet
        .cells()
        .iter()
        .zip(loud.cells())
        .filter(|(a, b)| (**a - **b).length() > 1e-4)
        .count();
    assert!(changed > 0);
}

// ============================================================================
// Particle Tests
// ============================================================================

#[test]
fn test_uniform_right_field_moves_one_unit() {
    let vp = viewport();
    let mut field = VectorField::new(FieldConfig::default(), vp);
    field.fill(Vec2::X);

    let mut system = ParticleSystem::new(1, 10, LifecycleConfig::default(), vp, Some(1));
    let center = vp.center();
    {
        let p = &mut system.particles_mut()[0];
        p.respawn(center, 1.0, 100.0);
    }

    let stats = system.step(&field, 1.0);
    assert_eq!(stats.advanced, 1);
    let p = &system.particles()[0];
    assert!((p.position.x - (center.x + 1.0)).abs() < 1e-4);
    assert_eq!(p.position.y, center.y);
    assert_eq!(p.age, 1.0);
}

#[test]
fn test_nan_particle_recycles_within_one_frame() {
    let vp = viewport();
    let field = built_field(3, 0.0, 0.0);
    let mut system = ParticleSystem::new(20, 10, LifecycleConfig::default(), vp, Some(2));
    system.particles_mut()[7].position = Vec2::new(f32::NAN, 10.0);

    let stats = system.step(&field, 0.6);
    assert!(stats.recycled() >= 1);

    let p = &system.particles()[7];
    assert!(p.position.is_finite());
    assert!(p.position.x >= 0.0 && p.position.x <= vp.width);
    assert!(p.position.y >= 0.0 && p.position.y <= vp.height);
    assert_eq!(p.age, 0.0);
}

#[test]
fn test_age_increases_or_resets() {
    let vp = viewport();
    let field = built_field(4, 0.0, 0.0);
    let mut system = ParticleSystem::new(300, 6, LifecycleConfig::default(), vp, Some(3));

    for _ in 0..400 {
        let before: Vec<f32> = system.particles().iter().map(|p| p.age).collect();
        system.step(&field, 1.5);
        for (old, p) in before.iter().zip(system.particles()) {
            assert!(p.age == old + 1.0 || p.age == 0.0, "{old} -> {}", p.age);
            assert!(p.age <= p.max_life);
        }
    }
}

// ============================================================================
// Audio Tests
// ============================================================================

#[test]
fn test_zero_spectrum_gives_zero_features() {
    let features = AudioFeatures::extract(&[0; 128], true);
    assert_eq!(features, AudioFeatures::SILENT);
}

#[test]
fn test_inactive_source_ignores_stale_bins() {
    let stale = SpectrumFrame {
        bins: vec![200; 128],
        active: false,
    };
    let features = stale.features();
    assert_eq!(
        (features.bass, features.mid, features.treble, features.level),
        (0.0, 0.0, 0.0, 0.0)
    );
}

// ============================================================================
// Scene Tests
// ============================================================================

#[test]
fn test_silent_scene_still_moves() {
    let config = SceneConfig::new()
        .with_particles(500)
        .with_trail_length(8)
        .with_seed(21);
    let mut scene = FlowScene::new(config, viewport());
    assert_eq!(scene.system().lifecycle().speed_scale(0.0), 0.6);
    assert_eq!(scene.field().config().swirl_boost(0.0), 0.9);

    let silent = SpectrumFrame::silent(128);
    scene.frame(0.0, &silent);
    let before: Vec<Vec2> = scene.system().particles().iter().map(|p| p.position).collect();
    let stats = scene.frame(1.0 / 60.0, &silent);

    let moved: Vec<f32> = before
        .iter()
        .zip(scene.system().particles())
        .map(|(a, p)| (p.position - *a).length())
        .collect();
    let steady = moved.iter().filter(|d| **d > 0.1).count();
    assert!(stats.advanced > 400);
    assert!(steady > 400);
}

#[test]
fn test_scene_resize_keeps_particles_inside() {
    let config = SceneConfig::new().with_particles(400).with_seed(8);
    let mut scene = FlowScene::new(config, Viewport::new(800.0, 600.0, 1.0));
    scene.resize(Viewport::new(100.0, 80.0, 2.0));
    for p in scene.system().particles() {
        assert!(p.position.x <= 100.0 && p.position.y <= 80.0);
    }
    scene.frame(0.0, &SpectrumFrame::silent(128));
    assert_eq!(scene.canvas().width(), 200);
}
