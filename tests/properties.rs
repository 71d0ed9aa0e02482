//! Property-based tests for the particle core using proptest
//!
//! These tests check invariants across random inputs:
//! - Influence falloff is bounded by the radius and decreasing inside it
//! - The repel push a particle receives weakens with distance
//! - Damping never adds energy
//! - Templates are reproducible from a seed
//! - Gesture classification is a pure function of the landmarks
//! - Shockwave impulses stay finite

use gestura::effects::{ShockwaveConfig, TransientEffects};
use gestura::integrator::FrameInputs;
use gestura::particles::SpawnSpec;
use gestura::{
    classify, falloff, ClassifierThresholds, HandLandmarks, InfluenceMode, InfluenceState,
    Integrator, IntegratorConfig, Landmark, Palette, ParticleStore, ParticleStyle, Phase,
    ShapeTemplate, Shockwave,
};
use glam::Vec3;
use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn template() -> impl Strategy<Value = ShapeTemplate> {
    (0..ShapeTemplate::ALL.len()).prop_map(|i| ShapeTemplate::ALL[i])
}

/// 21 points anywhere in (and a little outside) the image.
fn hand() -> impl Strategy<Value = HandLandmarks> {
    prop::collection::vec((-0.2f32..1.2, -0.2f32..1.2, -0.5f32..0.5), 21..=21).prop_map(
        |points| {
            let points: Vec<Landmark> = points
                .into_iter()
                .map(|(x, y, z)| Landmark { x, y, z })
                .collect();
            HandLandmarks::from_slice(&points).unwrap()
        },
    )
}

/// Velocity one repel step gives a resting particle `dist` away from the point.
fn repel_push(radius: f32, dist: f32) -> Vec3 {
    let style = ParticleStyle::default();
    let spec = SpawnSpec {
        template: ShapeTemplate::Wave,
        scale: 1.0,
        palette: Palette::Galaxy,
        style: &style,
    };
    let mut rng = SmallRng::seed_from_u64(0);
    let mut store = ParticleStore::new(1, spec, &mut rng);
    let at = store.particles()[0].position;

    let integrator = Integrator::new(IntegratorConfig {
        influence_radius: radius,
        return_strength: 0.0,
        ..Default::default()
    });
    let influence = InfluenceState {
        point: at - Vec3::X * dist,
        mode: InfluenceMode::Repel,
        ..Default::default()
    };
    let effects = TransientEffects::new(ShockwaveConfig::default(), 1);
    let inputs = FrameInputs {
        influence: &influence,
        effects: &effects,
        phase: Phase::Idle,
        spawn: spec,
    };
    integrator.step(&mut store, &inputs, &mut rng);
    store.particles()[0].velocity
}

fn position() -> impl Strategy<Value = Vec3> {
    (-500.0f32..500.0, -500.0f32..500.0, -500.0f32..500.0)
        .prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: falloff is zero at and beyond the radius
    #[test]
    fn test_falloff_zero_outside(radius in 0.1f32..1000.0, extra in 0.0f32..1000.0) {
        prop_assert_eq!(falloff(radius + extra, radius), 0.0);
    }

    /// Property: closer particles feel more influence
    #[test]
    fn test_falloff_decreasing(radius in 0.1f32..1000.0, a in 0.001f32..0.49, b in 0.51f32..0.999) {
        let near = falloff(a * radius, radius);
        let far = falloff(b * radius, radius);
        prop_assert!(near > far, "falloff({}) = {} <= falloff({}) = {}", a, near, b, far);
        prop_assert!(near <= 1.0);
        prop_assert!(far > 0.0);
    }

    /// Property: the repel push on a particle is zero beyond R and weaker further out
    #[test]
    fn test_repel_push_decreasing(radius in 1.0f32..500.0, a in 0.05f32..0.49, b in 0.51f32..0.95) {
        let near = repel_push(radius, a * radius);
        let far = repel_push(radius, b * radius);
        prop_assert!(near.x > 0.0 && far.x > 0.0);
        prop_assert!(
            near.length() > far.length(),
            "push at {} = {} <= push at {} = {}", a, near.length(), b, far.length()
        );
        prop_assert_eq!(repel_push(radius, radius * 1.01), Vec3::ZERO);
    }

    /// Property: with no forces acting, one step scales every speed by the friction
    #[test]
    fn test_damping_never_adds_energy(
        friction in 0.5f32..1.0,
        launch in 0.1f32..20.0,
        template in template(),
        seed in any::<u64>(),
    ) {
        let style = ParticleStyle {
            launch_speed: Some((launch, launch * 2.0)),
            ..Default::default()
        };
        let spec = SpawnSpec {
            template,
            scale: 10.0,
            palette: Palette::Galaxy,
            style: &style,
        };
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut store = ParticleStore::new(64, spec, &mut rng);
        let before: Vec<f32> = store.particles().iter().map(|p| p.velocity.length()).collect();

        let integrator = Integrator::new(IntegratorConfig {
            friction,
            return_strength: 0.0,
            ..Default::default()
        });
        let influence = InfluenceState::default();
        let effects = TransientEffects::new(ShockwaveConfig::default(), 1);
        let inputs = FrameInputs {
            influence: &influence,
            effects: &effects,
            phase: Phase::Idle,
            spawn: spec,
        };
        integrator.step(&mut store, &inputs, &mut rng);

        for (p, speed) in store.particles().iter().zip(&before) {
            prop_assert!(p.velocity.is_finite());
            prop_assert!(
                p.velocity.length() <= speed * friction + 1e-4,
                "speed grew from {} to {}", speed, p.velocity.length()
            );
        }
    }

    /// Property: a template reproduces exactly from the same seed
    #[test]
    fn test_template_reproducible(template in template(), total in 1u32..2000, seed in any::<u64>()) {
        let mut a = SmallRng::seed_from_u64(seed);
        let mut b = SmallRng::seed_from_u64(seed);
        for index in (0..total).step_by(((total / 50) as usize).max(1)) {
            let p = template.generate(index, total, &mut a);
            prop_assert_eq!(p, template.generate(index, total, &mut b));
            prop_assert!(p.is_finite());
        }
    }

    /// Property: the wave never reads the random source
    #[test]
    fn test_wave_ignores_seed(total in 1u32..5000, index_frac in 0.0f32..1.0, s1 in any::<u64>(), s2 in any::<u64>()) {
        let index = ((total - 1) as f32 * index_frac) as u32;
        let a = ShapeTemplate::Wave.generate(index, total, &mut SmallRng::seed_from_u64(s1));
        let b = ShapeTemplate::Wave.generate(index, total, &mut SmallRng::seed_from_u64(s2));
        prop_assert_eq!(a, b);
        prop_assert!(ShapeTemplate::Wave.is_deterministic());
    }

    /// Property: classification depends only on the landmarks
    #[test]
    fn test_classifier_is_pure(hand in hand()) {
        let thresholds = ClassifierThresholds::default();
        let first = classify(Some(&hand), &thresholds);
        let copy = hand;
        prop_assert_eq!(first, classify(Some(&copy), &thresholds));
        prop_assert_eq!(first, classify(Some(&hand), &thresholds));
    }

    /// Property: shockwave impulses are finite everywhere, including the origin
    #[test]
    fn test_shockwave_force_finite(
        origin in position(),
        offset in position(),
        force in 0.0f32..100.0,
        frames in 0usize..80,
    ) {
        let config = ShockwaveConfig::default();
        let mut wave = Shockwave::new(origin, force, config.max_radius);
        for _ in 0..frames {
            wave.update(&config);
        }
        prop_assert!(wave.force_on(origin + offset, config.band).is_finite());
        prop_assert!(wave.force_on(origin, config.band).is_finite());
    }
}
