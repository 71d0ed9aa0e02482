//! Particle state store.
//!
//! Owns every particle's mutable state. Particles are created in a batch and
//! never individually destroyed; a particle that leaves the world or runs out
//! of life is reset in place with [`ParticleStore::respawn`].
//!
//! The store also tracks which render buffers changed since the renderer last
//! looked, so uploads can be skipped when nothing moved.

use crate::palette::Palette;
use crate::shapes::ShapeTemplate;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// One simulated point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    /// Current simulated location.
    pub position: Vec3,
    /// Current velocity, per frame.
    pub velocity: Vec3,
    /// Where the active shape template wants this particle.
    pub target: Vec3,
    pub size: f32,
    pub color: Vec3,
    pub alpha: f32,
    /// Random offset that decorrelates oscillation between particles.
    pub phase: f32,
    /// Remaining life in `[0, 1]`. Stays at 1 unless life decay is enabled.
    pub life: f32,
    /// Life lost per frame.
    pub decay: f32,
    /// Angle the target orbits the origin by each frame, in radians.
    pub spin: f32,
}

/// How particles choose a colour from the palette.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorAssignment {
    /// Uniformly random stop per particle.
    #[default]
    Random,
    /// Stop `index % palette_len`.
    Cyclic,
}

/// Display and lifetime attributes assigned at spawn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleStyle {
    /// Size is drawn uniformly from `[min, max)`.
    pub size_range: (f32, f32),
    /// Alpha is drawn uniformly from `[min, max)`.
    pub alpha_range: (f32, f32),
    pub color_assignment: ColorAssignment,
    /// Per-frame life decay range. `None` means particles live forever.
    pub life_decay: Option<(f32, f32)>,
    /// Initial outward speed range. `None` spawns particles at rest.
    pub launch_speed: Option<(f32, f32)>,
    /// Per-frame orbital drift range of the target, in radians. `None`
    /// keeps targets fixed.
    pub orbit_speed: Option<(f32, f32)>,
}

impl Default for ParticleStyle {
    fn default() -> Self {
        Self {
            size_range: (0.5, 2.0),
            alpha_range: (0.6, 1.0),
            color_assignment: ColorAssignment::Random,
            life_decay: None,
            launch_speed: None,
            orbit_speed: None,
        }
    }
}

/// Which render buffers were written since the last [`ParticleStore::take_dirty`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirtyFlags {
    pub positions: bool,
    pub colors: bool,
    pub sizes: bool,
}

impl DirtyFlags {
    const ALL: DirtyFlags = DirtyFlags {
        positions: true,
        colors: true,
        sizes: true,
    };

    pub fn any(&self) -> bool {
        self.positions || self.colors || self.sizes
    }
}

/// GPU-ready per-particle record.
///
/// Laid out as two `vec4`s so a renderer can upload the whole slice with
/// `bytemuck::cast_slice`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleVertex {
    pub position: [f32; 3],
    pub size: f32,
    pub color: [f32; 3],
    pub alpha: f32,
}

/// Gentle per-particle bobbing added at render time only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FloatMotion {
    /// Zero disables the offset.
    pub amplitude: f32,
}

impl FloatMotion {
    /// Whether rendered positions move with animation time.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.amplitude != 0.0
    }

    /// Offset for a particle with `phase` at animation time `t`.
    #[inline]
    pub fn offset(&self, t: f32, phase: f32) -> Vec3 {
        if !self.is_active() {
            return Vec3::ZERO;
        }
        Vec3::new(
            (t + phase).sin() * 0.1,
            (t * 0.7 + phase).cos() * 0.1,
            (t * 0.5 + phase).sin() * 0.05,
        ) * self.amplitude
    }
}

/// Everything needed to place a fresh particle.
#[derive(Clone, Copy, Debug)]
pub struct SpawnSpec<'a> {
    pub template: ShapeTemplate,
    /// Multiplier from template units to world units.
    pub scale: f32,
    pub palette: Palette,
    pub style: &'a ParticleStyle,
}

/// Owner of all per-particle state.
#[derive(Clone, Debug)]
pub struct ParticleStore {
    particles: Vec<Particle>,
    dirty: DirtyFlags,
}

impl ParticleStore {
    /// Create `count` particles sitting on their template targets.
    pub fn new<R: Rng + ?Sized>(count: u32, spec: SpawnSpec<'_>, rng: &mut R) -> Self {
        let particles = (0..count).map(|i| spawn(i, count, &spec, rng)).collect();
        Self {
            particles,
            dirty: DirtyFlags::ALL,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub(crate) fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub(crate) fn mark_positions_dirty(&mut self) {
        self.dirty.positions = true;
    }

    pub(crate) fn mark_colors_dirty(&mut self) {
        self.dirty.colors = true;
    }

    /// Replace every particle, e.g. after a count change.
    pub fn rebuild<R: Rng + ?Sized>(&mut self, count: u32, spec: SpawnSpec<'_>, rng: &mut R) {
        *self = Self::new(count, spec, rng);
    }

    /// Point every particle at a new template. Positions and velocities are
    /// left alone so the system morphs instead of jumping.
    pub fn retarget<R: Rng + ?Sized>(&mut self, template: ShapeTemplate, scale: f32, rng: &mut R) {
        let total = self.particles.len() as u32;
        for (i, p) in self.particles.iter_mut().enumerate() {
            p.target = template.generate(i as u32, total, rng) * scale;
        }
    }

    /// Pick new colours from `palette`.
    pub fn recolor<R: Rng + ?Sized>(
        &mut self,
        palette: Palette,
        assignment: ColorAssignment,
        rng: &mut R,
    ) {
        for (i, p) in self.particles.iter_mut().enumerate() {
            p.color = pick_color(palette, assignment, i, rng);
        }
        self.dirty.colors = true;
    }

    /// Reset particle `index` in place with a fresh template draw. Its phase
    /// is kept.
    pub fn respawn<R: Rng + ?Sized>(&mut self, index: usize, spec: SpawnSpec<'_>, rng: &mut R) {
        let total = self.particles.len() as u32;
        let Some(slot) = self.particles.get_mut(index) else {
            return;
        };
        let phase = slot.phase;
        *slot = spawn(index as u32, total, &spec, rng);
        slot.phase = phase;
        self.dirty = DirtyFlags::ALL;
    }

    /// Return and clear the dirty flags.
    pub fn take_dirty(&mut self) -> DirtyFlags {
        std::mem::take(&mut self.dirty)
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    /// Fill `out` with render records, reusing its allocation.
    pub fn write_vertices(&self, out: &mut Vec<ParticleVertex>, float: FloatMotion, t: f32) {
        out.clear();
        out.extend(self.particles.iter().map(|p| {
            let pos = p.position + float.offset(t, p.phase);
            ParticleVertex {
                position: pos.to_array(),
                size: p.size,
                color: p.color.to_array(),
                alpha: p.alpha * p.life,
            }
        }));
    }

    /// Mean distance between position and target, a cheap convergence gauge.
    pub fn mean_target_distance(&self) -> f32 {
        if self.particles.is_empty() {
            return 0.0;
        }
        let sum: f32 = self
            .particles
            .iter()
            .map(|p| p.position.distance(p.target))
            .sum();
        sum / self.particles.len() as f32
    }
}

fn spawn<R: Rng + ?Sized>(index: u32, total: u32, spec: &SpawnSpec<'_>, rng: &mut R) -> Particle {
    let style = spec.style;
    let target = spec.template.generate(index, total, rng) * spec.scale;

    let velocity = match style.launch_speed {
        Some(range) => target.normalize_or_zero() * sample(range, rng),
        None => Vec3::ZERO,
    };
    let decay = style.life_decay.map_or(0.0, |range| sample(range, rng));
    let spin = style.orbit_speed.map_or(0.0, |range| sample(range, rng));

    Particle {
        position: target,
        velocity,
        target,
        size: sample(style.size_range, rng),
        color: pick_color(spec.palette, style.color_assignment, index as usize, rng),
        alpha: sample(style.alpha_range, rng),
        phase: rng.gen_range(0.0..TAU),
        life: 1.0,
        decay,
        spin,
    }
}

fn pick_color<R: Rng + ?Sized>(
    palette: Palette,
    assignment: ColorAssignment,
    index: usize,
    rng: &mut R,
) -> Vec3 {
    match assignment {
        ColorAssignment::Random => palette.random_color(rng),
        ColorAssignment::Cyclic => palette.color(index),
    }
}

/// Uniform sample from `[min, max)`; a collapsed range yields `min`.
#[inline]
fn sample<R: Rng + ?Sized>((min, max): (f32, f32), rng: &mut R) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn spec(style: &ParticleStyle) -> SpawnSpec<'_> {
        SpawnSpec {
            template: ShapeTemplate::Wave,
            scale: 1.0,
            palette: Palette::Galaxy,
            style,
        }
    }

    #[test]
    fn test_new_places_particles_on_targets() {
        let style = ParticleStyle::default();
        let mut rng = SmallRng::seed_from_u64(0);
        let store = ParticleStore::new(64, spec(&style), &mut rng);

        assert_eq!(store.len(), 64);
        for p in store.particles() {
            assert_eq!(p.position, p.target);
            assert_eq!(p.velocity, Vec3::ZERO);
            assert_eq!(p.life, 1.0);
            assert!(p.size >= 0.5 && p.size < 2.0);
        }
        assert!(store.dirty().any());
    }

    #[test]
    fn test_retarget_keeps_positions() {
        let style = ParticleStyle::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut store = ParticleStore::new(100, spec(&style), &mut rng);
        store.take_dirty();
        let before: Vec<Vec3> = store.particles().iter().map(|p| p.position).collect();

        store.retarget(ShapeTemplate::Hearts, 1.0, &mut rng);

        for (p, old) in store.particles().iter().zip(&before) {
            assert_eq!(p.position, *old);
        }
        assert!(store.particles().iter().any(|p| p.position != p.target));
        assert!(!store.dirty().positions);
    }

    #[test]
    fn test_recolor_marks_colors_only() {
        let style = ParticleStyle::default();
        let mut rng = SmallRng::seed_from_u64(2);
        let mut store = ParticleStore::new(10, spec(&style), &mut rng);
        store.take_dirty();

        store.recolor(Palette::Ocean, ColorAssignment::Cyclic, &mut rng);
        let dirty = store.take_dirty();
        assert!(dirty.colors);
        assert!(!dirty.positions);
        assert_eq!(store.particles()[0].color, Palette::Ocean.color(0));
        assert!(!store.take_dirty().any());
    }

    #[test]
    fn test_respawn_keeps_phase() {
        let style = ParticleStyle {
            life_decay: Some((0.01, 0.02)),
            ..Default::default()
        };
        let mut rng = SmallRng::seed_from_u64(3);
        let mut store = ParticleStore::new(4, spec(&style), &mut rng);
        let phase = store.particles()[2].phase;
        store.particles_mut()[2].life = 0.0;
        store.particles_mut()[2].position = Vec3::splat(1000.0);

        store.respawn(2, spec(&style), &mut rng);

        let p = store.particles()[2];
        assert_eq!(p.phase, phase);
        assert_eq!(p.life, 1.0);
        assert_eq!(p.position, p.target);
        assert!(p.decay >= 0.01 && p.decay < 0.02);
    }

    #[test]
    fn test_respawn_out_of_range_is_ignored() {
        let style = ParticleStyle::default();
        let mut rng = SmallRng::seed_from_u64(4);
        let mut store = ParticleStore::new(2, spec(&style), &mut rng);
        let before = store.particles().to_vec();
        store.respawn(5, spec(&style), &mut rng);
        assert_eq!(store.particles(), &before[..]);
    }

    #[test]
    fn test_launch_speed_points_outward() {
        let style = ParticleStyle {
            launch_speed: Some((1.0, 1.0)),
            ..Default::default()
        };
        let mut rng = SmallRng::seed_from_u64(5);
        let store = ParticleStore::new(16, spec(&style), &mut rng);
        for p in store.particles() {
            if p.target.length() > 0.0 {
                assert!((p.velocity.length() - 1.0).abs() < 1e-4);
                assert!(p.velocity.dot(p.target) > 0.0);
            }
        }
    }

    #[test]
    fn test_vertices_cast_to_bytes() {
        let style = ParticleStyle::default();
        let mut rng = SmallRng::seed_from_u64(6);
        let store = ParticleStore::new(3, spec(&style), &mut rng);
        let mut out = Vec::new();
        store.write_vertices(&mut out, FloatMotion::default(), 0.0);

        assert_eq!(out.len(), 3);
        assert_eq!(std::mem::size_of::<ParticleVertex>(), 32);
        let bytes: &[u8] = bytemuck::cast_slice(&out);
        assert_eq!(bytes.len(), 96);
        assert_eq!(out[0].position, store.particles()[0].position.to_array());
    }

    #[test]
    fn test_orbit_speed_sampled_per_particle() {
        let style = ParticleStyle {
            orbit_speed: Some((-0.01, 0.01)),
            ..Default::default()
        };
        let mut rng = SmallRng::seed_from_u64(7);
        let store = ParticleStore::new(32, spec(&style), &mut rng);
        assert!(store.particles().iter().all(|p| p.spin.abs() <= 0.01));
        assert!(store.particles().iter().any(|p| p.spin != 0.0));

        let still = ParticleStore::new(4, spec(&ParticleStyle::default()), &mut rng);
        assert!(still.particles().iter().all(|p| p.spin == 0.0));
    }

    #[test]
    fn test_float_motion_disabled_is_zero() {
        assert_eq!(FloatMotion::default().offset(3.0, 1.0), Vec3::ZERO);
        assert!(!FloatMotion::default().is_active());
        let f = FloatMotion { amplitude: 1.0 };
        assert!(f.is_active());
        assert!(f.offset(0.0, 0.0).length() > 0.0);
    }
}
