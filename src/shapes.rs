//! Shape template library.
//!
//! A shape template maps `(particle_index, total_count)` to a target position.
//! Templates that need randomness draw it from the caller's RNG, so a seeded
//! RNG makes every template reproducible.
//!
//! # Example
//!
//! ```ignore
//! use gestura::shapes::ShapeTemplate;
//! use rand::{rngs::SmallRng, SeedableRng};
//!
//! let mut rng = SmallRng::seed_from_u64(7);
//! let p = ShapeTemplate::Hearts.generate(10, 1000, &mut rng);
//! ```
//!
//! # Templates
//!
//! | Template | Shape |
//! |----------|-------|
//! | [`ShapeTemplate::Galaxy`] | Four spiral arms widening outward |
//! | [`ShapeTemplate::Hearts`] | Layered parametric heart curve |
//! | [`ShapeTemplate::Flowers`] | Six-petal rose curve |
//! | [`ShapeTemplate::Saturn`] | Tilted ring around a sphere shell |
//! | [`ShapeTemplate::Fireworks`] | Seven spherical bursts on a circle |
//! | [`ShapeTemplate::Vortex`] | Rising funnel spiral |
//! | [`ShapeTemplate::Dna`] | Two-strand helix |
//! | [`ShapeTemplate::Wave`] | Flat grid with a radial sine wave (no randomness) |
//! | [`ShapeTemplate::Stars`] | Five-point star outline |
//! | [`ShapeTemplate::Snowflakes`] | Six arms with side branches |
//! | [`ShapeTemplate::Nebula`] | Flat disc of random angle and radius |

use crate::error::ParseError;
use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};
use std::fmt;
use std::str::FromStr;

/// A named target-shape generator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeTemplate {
    /// Four logarithmic-looking spiral arms, spread grows with radius.
    #[default]
    Galaxy,
    /// Heart curve `x = 16 sin³t`, stacked in a few depth layers.
    Hearts,
    /// Rose curve with six petals.
    Flowers,
    /// Ringed planet: roughly three quarters ring, the rest a sphere shell.
    Saturn,
    /// Seven burst clusters arranged around the Y axis.
    Fireworks,
    /// Spiral that widens as it rises.
    Vortex,
    /// Double helix, alternating strands by index parity.
    Dna,
    /// Square grid in XZ with `y = 2 sin(r / 2)`. Fully deterministic.
    Wave,
    /// Star outline alternating inner and outer radius by index parity.
    Stars,
    /// Six-armed snowflake with short side branches.
    Snowflakes,
    /// Disc in the XY plane with random angle and radius.
    Nebula,
}

impl ShapeTemplate {
    /// Every template in the library, in display order.
    pub const ALL: [ShapeTemplate; 11] = [
        ShapeTemplate::Galaxy,
        ShapeTemplate::Hearts,
        ShapeTemplate::Flowers,
        ShapeTemplate::Saturn,
        ShapeTemplate::Fireworks,
        ShapeTemplate::Vortex,
        ShapeTemplate::Dna,
        ShapeTemplate::Wave,
        ShapeTemplate::Stars,
        ShapeTemplate::Snowflakes,
        ShapeTemplate::Nebula,
    ];

    /// Stable lowercase name used in configs and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            ShapeTemplate::Galaxy => "galaxy",
            ShapeTemplate::Hearts => "hearts",
            ShapeTemplate::Flowers => "flowers",
            ShapeTemplate::Saturn => "saturn",
            ShapeTemplate::Fireworks => "fireworks",
            ShapeTemplate::Vortex => "vortex",
            ShapeTemplate::Dna => "dna",
            ShapeTemplate::Wave => "wave",
            ShapeTemplate::Stars => "stars",
            ShapeTemplate::Snowflakes => "snowflakes",
            ShapeTemplate::Nebula => "nebula",
        }
    }

    /// Whether this template draws from the RNG at all.
    pub fn is_deterministic(&self) -> bool {
        matches!(self, ShapeTemplate::Wave)
    }

    /// Target position for particle `index` out of `total`, in template units.
    ///
    /// `total` of 0 or 1 is accepted; every `index / total` ratio is guarded.
    pub fn generate<R: Rng + ?Sized>(&self, index: u32, total: u32, rng: &mut R) -> Vec3 {
        let progress = progress(index, total);

        match self {
            ShapeTemplate::Galaxy => {
                let arm = (index % 4) as f32;
                let arm_angle = arm / 4.0 * TAU;
                let distance = progress * 12.0;
                let spiral_angle = progress * PI * 4.0 + arm_angle;
                let spread = 0.5 + progress * 2.0;

                Vec3::new(
                    spiral_angle.cos() * distance + centered(rng) * spread,
                    centered(rng) * spread * 0.5,
                    spiral_angle.sin() * distance + centered(rng) * spread,
                )
            }

            ShapeTemplate::Hearts => {
                let t = progress * TAU;
                let scale = 0.3 + rng.gen::<f32>() * 0.2;
                let layer = rng.gen_range(-4i32..4) as f32;

                let x = 16.0 * t.sin().powi(3) * scale;
                let y = (13.0 * t.cos()
                    - 5.0 * (2.0 * t).cos()
                    - 2.0 * (3.0 * t).cos()
                    - (4.0 * t).cos())
                    * scale;
                let z = layer * 0.3 + centered(rng) * 0.5;
                Vec3::new(x, y, z)
            }

            ShapeTemplate::Flowers => {
                let petals = 6.0;
                let t = progress * TAU * petals;
                let r = ((petals * t / 2.0).cos() * 4.0 + 1.0) * (0.5 + rng.gen::<f32>() * 0.5);
                let layer = centered(rng) * 3.0;

                Vec3::new(r * t.cos(), r * t.sin(), layer + (t * 3.0).sin() * 0.5)
            }

            ShapeTemplate::Saturn => {
                if rng.gen::<f32>() > 0.25 {
                    let angle = progress * TAU * 5.0;
                    let ring_radius = 5.0 + rng.gen::<f32>() * 2.0;
                    let tilt: f32 = 0.3;

                    Vec3::new(
                        ring_radius * angle.cos() + centered(rng) * 0.3,
                        ring_radius * angle.sin() * tilt + centered(rng) * 0.2,
                        ring_radius * angle.sin() * (1.0 - tilt * tilt).sqrt(),
                    )
                } else {
                    let r = 2.5 * (0.9 + rng.gen::<f32>() * 0.2);
                    let p = on_sphere(rng, r);
                    Vec3::new(p.x, p.y * 0.8, p.z)
                }
            }

            ShapeTemplate::Fireworks => {
                let bursts = 7u32;
                let burst = ((progress * bursts as f32) as u32).min(bursts - 1);
                let burst_angle = burst as f32 / bursts as f32 * TAU;
                let center = Vec3::new(
                    burst_angle.cos() * 4.0,
                    (burst as f32 * 1.5).sin() * 2.0 + (burst % 2) as f32 * 2.0 - 1.0,
                    burst_angle.sin() * 4.0,
                );
                let r = 1.0 + rng.gen::<f32>() * 2.0;
                center + on_sphere(rng, r)
            }

            ShapeTemplate::Vortex => {
                let angle = progress * PI * 8.0;
                let radius = progress * 8.0;
                let height = (progress - 0.5) * 10.0;

                Vec3::new(
                    angle.cos() * radius + centered(rng) * 0.5,
                    height + centered(rng) * 0.5,
                    angle.sin() * radius + centered(rng) * 0.5,
                )
            }

            ShapeTemplate::Dna => {
                let angle = progress * PI * 6.0;
                let height = (progress - 0.5) * 15.0;
                let offset = (index % 2) as f32 * PI;
                let radius = 2.0;

                Vec3::new(
                    (angle + offset).cos() * radius + centered(rng) * 0.3,
                    height,
                    (angle + offset).sin() * radius + centered(rng) * 0.3,
                )
            }

            ShapeTemplate::Wave => {
                let side = grid_side(total);
                let x = (index % side) as f32 / side as f32 * 20.0 - 10.0;
                let z = (index / side) as f32 / side as f32 * 20.0 - 10.0;
                let dist = (x * x + z * z).sqrt();
                Vec3::new(x, (dist * 0.5).sin() * 2.0, z)
            }

            ShapeTemplate::Stars => {
                let points = 5.0;
                let t = progress * TAU * points;
                let r = if index % 2 == 0 { 3.0 } else { 1.5 };
                let layer = rng.gen_range(0i32..3) as f32;

                Vec3::new(
                    r * t.cos() * (0.8 + rng.gen::<f32>() * 0.4),
                    r * t.sin() * (0.8 + rng.gen::<f32>() * 0.4),
                    (layer - 1.0) * 0.5 + centered(rng) * 0.5,
                )
            }

            ShapeTemplate::Snowflakes => {
                let arms = 6.0;
                let t = progress * TAU * arms;
                let r = rng.gen::<f32>() * 4.0;
                let branch = rng.gen_range(0u32..3);

                let mut p = Vec3::new(r * t.cos(), r * t.sin(), centered(rng) * 2.0);
                let branch_angle = match branch {
                    1 => Some(t + PI / 6.0),
                    2 => Some(t - PI / 6.0),
                    _ => None,
                };
                if let Some(a) = branch_angle {
                    p.x += a.cos() * 0.5;
                    p.y += a.sin() * 0.5;
                }
                p
            }

            ShapeTemplate::Nebula => {
                let angle = rng.gen_range(0.0..TAU);
                let distance = 1.0 + rng.gen::<f32>() * 11.0;
                Vec3::new(angle.cos() * distance, angle.sin() * distance, 0.0)
            }
        }
    }
}

impl fmt::Display for ShapeTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShapeTemplate {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ShapeTemplate::ALL
            .iter()
            .copied()
            .find(|t| t.name() == wanted)
            .ok_or_else(|| ParseError::UnknownTemplate(s.to_string()))
    }
}

/// Generate targets for a whole batch, scaled into world units.
pub fn generate_all<R: Rng + ?Sized>(
    template: ShapeTemplate,
    total: u32,
    scale: f32,
    rng: &mut R,
) -> Vec<Vec3> {
    (0..total)
        .map(|i| template.generate(i, total, rng) * scale)
        .collect()
}

/// `index / total` in `[0, 1)`, with `total == 0` treated as 1.
#[inline]
fn progress(index: u32, total: u32) -> f32 {
    index as f32 / total.max(1) as f32
}

/// Side length of the smallest square grid holding `total` points (at least 1).
#[inline]
fn grid_side(total: u32) -> u32 {
    ((total as f32).sqrt().ceil() as u32).max(1)
}

#[inline]
fn centered<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.gen::<f32>() - 0.5
}

/// Uniform point on a sphere surface (`phi = acos(2u - 1)`).
fn on_sphere<R: Rng + ?Sized>(rng: &mut R, radius: f32) -> Vec3 {
    let phi = (2.0 * rng.gen::<f32>() - 1.0).clamp(-1.0, 1.0).acos();
    let theta = rng.gen_range(0.0..TAU);
    Vec3::new(
        radius * phi.sin() * theta.cos(),
        radius * phi.sin() * theta.sin(),
        radius * phi.cos(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_same_seed_same_output() {
        for template in ShapeTemplate::ALL {
            let mut a = SmallRng::seed_from_u64(99);
            let mut b = SmallRng::seed_from_u64(99);
            for i in 0..50 {
                assert_eq!(
                    template.generate(i, 50, &mut a),
                    template.generate(i, 50, &mut b),
                    "{} diverged at {}",
                    template,
                    i
                );
            }
        }
    }

    #[test]
    fn test_tiny_totals_are_finite() {
        let mut rng = SmallRng::seed_from_u64(1);
        for template in ShapeTemplate::ALL {
            for total in [0u32, 1] {
                let p = template.generate(0, total, &mut rng);
                assert!(p.is_finite(), "{} produced {:?} for total {}", template, p, total);
            }
        }
    }

    #[test]
    fn test_wave_ignores_rng() {
        let mut a = SmallRng::seed_from_u64(1);
        let mut b = SmallRng::seed_from_u64(2);
        for i in 0..100 {
            assert_eq!(
                ShapeTemplate::Wave.generate(i, 100, &mut a),
                ShapeTemplate::Wave.generate(i, 100, &mut b)
            );
        }
        assert!(ShapeTemplate::Wave.is_deterministic());
    }

    #[test]
    fn test_wave_grid_spans_square() {
        let mut rng = SmallRng::seed_from_u64(0);
        let first = ShapeTemplate::Wave.generate(0, 100, &mut rng);
        let last = ShapeTemplate::Wave.generate(99, 100, &mut rng);
        assert_eq!(first.x, -10.0);
        assert_eq!(first.z, -10.0);
        assert!((last.x - 8.0).abs() < 1e-5);
        assert!((last.z - 8.0).abs() < 1e-5);
    }

    #[test]
    fn test_galaxy_stays_in_disc() {
        let mut rng = SmallRng::seed_from_u64(3);
        for i in 0..1000 {
            let p = ShapeTemplate::Galaxy.generate(i, 1000, &mut rng);
            assert!(Vec3::new(p.x, 0.0, p.z).length() < 12.0 + 2.5);
            assert!(p.y.abs() <= 1.25);
        }
    }

    #[test]
    fn test_saturn_is_ring_or_shell() {
        let mut rng = SmallRng::seed_from_u64(4);
        for i in 0..500 {
            let p = ShapeTemplate::Saturn.generate(i, 500, &mut rng);
            let r = p.length();
            assert!(r <= 2.75 || r >= 4.5, "radius {} is between shell and ring", r);
        }
    }

    #[test]
    fn test_nebula_is_planar() {
        let mut rng = SmallRng::seed_from_u64(5);
        for i in 0..200 {
            let p = ShapeTemplate::Nebula.generate(i, 200, &mut rng);
            assert_eq!(p.z, 0.0);
            assert!(p.length() >= 1.0 - 1e-4 && p.length() <= 12.0 + 1e-4);
        }
    }

    #[test]
    fn test_names_round_trip() {
        for template in ShapeTemplate::ALL {
            assert_eq!(template.name().parse::<ShapeTemplate>(), Ok(template));
        }
        assert_eq!("  Galaxy ".parse::<ShapeTemplate>(), Ok(ShapeTemplate::Galaxy));
    }

    #[test]
    fn test_unknown_name_rejected() {
        assert_eq!(
            "cube".parse::<ShapeTemplate>(),
            Err(ParseError::UnknownTemplate("cube".into()))
        );
    }

    #[test]
    fn test_generate_all_scales() {
        let mut rng = SmallRng::seed_from_u64(0);
        let targets = generate_all(ShapeTemplate::Wave, 4, 10.0, &mut rng);
        assert_eq!(targets.len(), 4);
        assert_eq!(targets[0].x, -100.0);
    }
}
