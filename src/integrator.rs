//! Per-frame particle update.
//!
//! Every frame each particle sums a handful of independent velocity terms,
//! is damped, and then moves:
//!
//! | # | Term | Active when |
//! |---|------|-------------|
//! | 1 | influence (attract, or repel plus swirl) | hand/pointer within `influence_radius` |
//! | 2 | phase term: spring, centering or explosion | always, chosen by [`Phase`] |
//! | 3 | centre gravity | configured, and beyond its dead zone |
//! | 4 | shockwave | particle inside a ring's band |
//! | 5 | damping, then the optional speed cap | always |
//! | 6 | `position += velocity * time_direction` | always |
//! | 7 | life decay, boundary | configured |
//!
//! Repulsion pushes along the unit direction, so its strength falls off
//! with distance. Attraction scales the raw offset (`d * s`), so its pull is
//! strongest at a third of the radius and fades to zero at both ends.
//!
//! Targets with a non-zero [`Particle::spin`](crate::particles::Particle::spin)
//! orbit the origin in the swirl plane before the spring reads them.
//!
//! Reversing time flips only the position update, which turns the return
//! spring into an amplifier. Without a [`IntegratorConfig::max_speed`] cap a
//! held reverse runs away, so scenes that reverse time set one.
//!
//! Forces are per frame, not per second: one call to [`Integrator::step`]
//! is one animation frame.
//!
//! A particle's update reads only shared frame inputs and its own state, so
//! the loop has no cross-particle dependency. Respawns are collected and
//! applied after the loop, keeping the loop itself free of randomness.

use crate::effects::{Phase, PhaseForce, TransientEffects};
use crate::influence::{InfluenceMode, InfluenceState};
use crate::particles::{ParticleStore, SpawnSpec};
use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Quadratic influence falloff, `((R - d) / R)^2` inside the radius.
///
/// Zero at and beyond `radius`, and for a non-positive radius.
#[inline]
pub fn falloff(dist: f32, radius: f32) -> f32 {
    if radius <= 0.0 || dist >= radius || dist < 0.0 {
        return 0.0;
    }
    let t = (radius - dist) / radius;
    t * t
}

/// Plane the repel swirl circulates in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwirlPlane {
    /// Around the vertical axis, for 3D scenes.
    #[default]
    Xz,
    /// Around the view axis, for flat scenes.
    Xy,
}

impl SwirlPlane {
    /// Tangent to a unit direction within the plane.
    #[inline]
    pub fn perpendicular(&self, dir: Vec3) -> Vec3 {
        match self {
            SwirlPlane::Xz => Vec3::new(dir.z, 0.0, -dir.x),
            SwirlPlane::Xy => Vec3::new(-dir.y, dir.x, 0.0),
        }
    }

    /// Rotate `v` by `angle` radians about the plane's normal.
    #[inline]
    pub fn rotate(&self, v: Vec3, angle: f32) -> Vec3 {
        let (sin, cos) = angle.sin_cos();
        match self {
            SwirlPlane::Xz => Vec3::new(v.x * cos + v.z * sin, v.y, v.z * cos - v.x * sin),
            SwirlPlane::Xy => Vec3::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos, v.z),
        }
    }
}

/// What happens at the edge of the world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    /// Particles may drift anywhere.
    #[default]
    None,
    /// Leaving one face re-enters from the opposite one.
    Wrap { min: Vec3, max: Vec3 },
    /// Leaving the box rerolls the particle from its template.
    Respawn { min: Vec3, max: Vec3 },
}

impl Boundary {
    fn contains(min: Vec3, max: Vec3, p: Vec3) -> bool {
        p.cmpge(min).all() && p.cmple(max).all()
    }
}

/// Constant pull toward the world origin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CenterGravity {
    pub strength: f32,
    /// No pull closer than this.
    pub dead_zone: f32,
}

/// Integrator tuning. Defaults match the shape-morph scene.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorConfig {
    /// Radius `R` of the influence point.
    pub influence_radius: f32,
    pub attract_strength: f32,
    pub repel_strength: f32,
    pub swirl_strength: f32,
    pub swirl_plane: SwirlPlane,
    /// Spring constant toward the target.
    pub return_strength: f32,
    /// Looser spring while expanding.
    pub return_strength_expanding: f32,
    /// Velocity multiplier per frame, in `(0, 1]`.
    pub friction: f32,
    /// Below this distance the influence term is skipped.
    pub min_distance: f32,
    /// Pull toward the origin in the contracted phase.
    pub contraction_strength: f32,
    /// Outward impulse in the exploding phase.
    pub explosion_force: f32,
    pub center_gravity: Option<CenterGravity>,
    /// Target scale at expansion level 0.
    pub contracted_scale: f32,
    /// Target scale at expansion level 1.
    pub expanded_scale: f32,
    pub boundary: Boundary,
    /// Speed cap applied after damping. `None` leaves speed unbounded.
    pub max_speed: Option<f32>,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            influence_radius: 3.0,
            attract_strength: 0.05,
            repel_strength: 1.0,
            swirl_strength: 0.15,
            swirl_plane: SwirlPlane::Xz,
            return_strength: 0.03,
            return_strength_expanding: 0.01,
            friction: 0.95,
            min_distance: 0.01,
            contraction_strength: 0.08,
            explosion_force: 15.0,
            center_gravity: None,
            contracted_scale: 1.0,
            expanded_scale: 1.0,
            boundary: Boundary::None,
            max_speed: None,
        }
    }
}

impl IntegratorConfig {
    /// Target multiplier for an expansion level in `[0, 1]`.
    #[inline]
    pub fn expansion_scale(&self, level: f32) -> f32 {
        let level = level.clamp(0.0, 1.0);
        self.contracted_scale + (self.expanded_scale - self.contracted_scale) * level
    }
}

/// Shared read-only state for one frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameInputs<'a> {
    pub influence: &'a InfluenceState,
    pub effects: &'a TransientEffects,
    pub phase: Phase,
    /// Template and style used when a particle respawns.
    pub spawn: SpawnSpec<'a>,
}

/// Per-frame diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    pub max_speed: f32,
    pub mean_speed: f32,
    pub respawned: usize,
}

/// Applies [`IntegratorConfig`] to a [`ParticleStore`].
#[derive(Clone, Debug, Default)]
pub struct Integrator {
    config: IntegratorConfig,
}

impl Integrator {
    pub fn new(config: IntegratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    /// Advance every particle by one frame.
    pub fn step<R: Rng + ?Sized>(
        &self,
        store: &mut ParticleStore,
        inputs: &FrameInputs<'_>,
        rng: &mut R,
    ) -> FrameStats {
        if store.is_empty() {
            return FrameStats::default();
        }

        let c = &self.config;
        let influence = inputs.influence;
        let phase_force = inputs.phase.force();
        let target_scale = c.expansion_scale(influence.expansion_level);
        let spring = if influence.expanding {
            c.return_strength_expanding
        } else {
            c.return_strength
        };
        let decays = inputs.spawn.style.life_decay.is_some();

        let mut moved = false;
        let mut max_speed = 0.0f32;
        let mut speed_sum = 0.0f32;
        let mut dead = Vec::new();

        for (i, p) in store.particles_mut().iter_mut().enumerate() {
            let mut v = p.velocity;

            // ========== Influence ==========
            if influence.mode != InfluenceMode::Neutral {
                let d = influence.point - p.position;
                let dist = d.length();
                if dist > c.min_distance {
                    let s = falloff(dist, c.influence_radius);
                    if s > 0.0 {
                        match influence.mode {
                            InfluenceMode::Attract => v += d * s * c.attract_strength,
                            InfluenceMode::Repel => {
                                let dir = d / dist;
                                v -= dir * s * c.repel_strength;
                                v += c.swirl_plane.perpendicular(dir) * s * c.swirl_strength;
                            }
                            InfluenceMode::Neutral => {}
                        }
                    }
                }
            }

            // ========== Phase ==========
            if p.spin != 0.0 {
                p.target = c
                    .swirl_plane
                    .rotate(p.target, p.spin * influence.time_direction);
            }
            match phase_force {
                PhaseForce::Spring => v += (p.target * target_scale - p.position) * spring,
                PhaseForce::Centering => v -= p.position * c.contraction_strength,
                PhaseForce::Explosive => {
                    let dist = p.position.length();
                    if dist > f32::EPSILON {
                        v += p.position / dist * (c.explosion_force / (dist * 0.1 + 1.0));
                    }
                }
            }

            if let Some(gravity) = c.center_gravity {
                let dist = p.position.length();
                if dist > gravity.dead_zone && dist > f32::EPSILON {
                    v -= p.position / dist * gravity.strength;
                }
            }

            if !inputs.effects.is_empty() {
                v += inputs.effects.force_on(p.position);
            }

            // ========== Integrate ==========
            v *= c.friction;
            if let Some(max) = c.max_speed {
                v = v.clamp_length_max(max);
            }
            let before = p.position;
            p.position += v * influence.time_direction;
            p.velocity = v;

            if let Boundary::Wrap { min, max } = c.boundary {
                p.position = wrap(p.position, min, max);
            }
            moved |= p.position != before;

            if decays {
                p.life -= p.decay;
            }
            let outside = match c.boundary {
                Boundary::Respawn { min, max } => !Boundary::contains(min, max, p.position),
                _ => false,
            };
            if outside || p.life <= 0.0 {
                dead.push(i);
            }

            let speed = v.length();
            max_speed = max_speed.max(speed);
            speed_sum += speed;
        }

        let count = store.len();
        if moved {
            store.mark_positions_dirty();
        }
        if decays {
            store.mark_colors_dirty();
        }
        for &i in &dead {
            store.respawn(i, inputs.spawn, rng);
        }

        let stats = FrameStats {
            max_speed,
            mean_speed: speed_sum / count as f32,
            respawned: dead.len(),
        };
        trace!(?stats, "integrated frame");
        stats
    }
}

/// Per-axis wrap into `[min, max]`. A degenerate axis is left alone.
fn wrap(p: Vec3, min: Vec3, max: Vec3) -> Vec3 {
    let axis = |v: f32, lo: f32, hi: f32| {
        if hi <= lo {
            v
        } else if v < lo {
            hi
        } else if v > hi {
            lo
        } else {
            v
        }
    };
    Vec3::new(
        axis(p.x, min.x, max.x),
        axis(p.y, min.y, max.y),
        axis(p.z, min.z, max.z),
    )
}
