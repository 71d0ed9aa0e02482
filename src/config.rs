//! Simulation configuration.
//!
//! [`SimConfig`] is a plain serializable tree: every knob of the shape
//! library, gesture table, integrator and effects lives here, so a scene can
//! be saved as JSON and reloaded. Four [`Preset`]s reproduce the classic
//! scenes.
//!
//! Values are checked once, at load time, by [`SimConfig::validate`]; the
//! frame loop assumes a valid config.

use crate::effects::{PhaseTimings, ShockwaveConfig};
use crate::error::{ConfigError, ParseError};
use crate::influence::{
    AdapterConfig, ExpansionRest, GestureAction, GestureTable, InfluenceMode, ScreenMapping,
    SteerPoint,
};
use crate::integrator::{Boundary, CenterGravity, IntegratorConfig, SwirlPlane};
use crate::palette::Palette;
use crate::particles::{ColorAssignment, FloatMotion, ParticleStyle};
use crate::shapes::ShapeTemplate;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Complete simulation configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub name: String,
    pub particle_count: u32,
    pub template: ShapeTemplate,
    /// Multiplier from template units to world units.
    pub shape_scale: f32,
    /// Palettes cycled by the palette gesture, first one active.
    pub palettes: Vec<Palette>,
    pub style: ParticleStyle,
    /// Render-only bobbing.
    pub float_motion: FloatMotion,
    /// System rotation per frame in radians, scaled by the speed multiplier.
    pub rotation_speed: f32,
    /// Enables the explosion/contraction phase machine.
    pub phases: bool,
    pub phase_timings: PhaseTimings,
    pub shockwave: ShockwaveConfig,
    /// Concurrent shockwaves; 1 means a new one replaces the old.
    pub shockwave_capacity: usize,
    /// Shockwave force fired from the origin when an explosion starts.
    pub explosion_shockwave: Option<f32>,
    pub adapter: AdapterConfig,
    pub integrator: IntegratorConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            name: "Untitled".into(),
            particle_count: 5000,
            template: ShapeTemplate::Galaxy,
            shape_scale: 1.0,
            palettes: vec![
                Palette::Galaxy,
                Palette::Ocean,
                Palette::Ember,
                Palette::Lagoon,
                Palette::Gold,
            ],
            style: ParticleStyle::default(),
            float_motion: FloatMotion::default(),
            rotation_speed: 0.0,
            phases: false,
            phase_timings: PhaseTimings::default(),
            shockwave: ShockwaveConfig::default(),
            shockwave_capacity: 1,
            explosion_shockwave: None,
            adapter: AdapterConfig::default(),
            integrator: IntegratorConfig::default(),
        }
    }
}

impl SimConfig {
    /// Configuration for a named preset.
    pub fn preset(preset: Preset) -> Self {
        preset.config()
    }

    /// Parse and validate JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        info!(path = %path.display(), name = %config.name, "loaded config");
        Ok(config)
    }

    /// Save the configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Reject values the frame loop cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.particle_count == 0 {
            return Err(ConfigError::invalid("particle_count", "must be at least 1"));
        }
        positive("shape_scale", self.shape_scale)?;
        if self.palettes.is_empty() {
            return Err(ConfigError::invalid("palettes", "must list at least one palette"));
        }
        if !self.rotation_speed.is_finite() {
            return Err(ConfigError::invalid("rotation_speed", "must be finite"));
        }
        if self.shockwave_capacity == 0 {
            return Err(ConfigError::invalid("shockwave_capacity", "must be at least 1"));
        }

        let style = &self.style;
        range("style.size_range", style.size_range)?;
        range("style.alpha_range", style.alpha_range)?;
        if let Some(decay) = style.life_decay {
            range("style.life_decay", decay)?;
            if decay.0 <= 0.0 {
                return Err(ConfigError::invalid("style.life_decay", "must be positive"));
            }
        }
        if let Some(speed) = style.launch_speed {
            range("style.launch_speed", speed)?;
        }
        if let Some((min, max)) = style.orbit_speed {
            // Signed: negative spins orbit the other way.
            if !(min.is_finite() && max.is_finite() && min <= max) {
                return Err(ConfigError::invalid(
                    "style.orbit_speed",
                    format!("invalid range ({min}, {max})"),
                ));
            }
        }

        if let Some(force) = self.explosion_shockwave {
            positive("explosion_shockwave", force)?;
        }

        let sw = &self.shockwave;
        positive("shockwave.growth", sw.growth)?;
        positive("shockwave.band", sw.band)?;
        positive("shockwave.max_radius", sw.max_radius)?;
        if !(sw.decay > 0.0 && sw.decay < 1.0) {
            return Err(ConfigError::invalid("shockwave.decay", "must be in (0, 1)"));
        }

        let a = &self.adapter;
        unit("adapter.smoothing", a.smoothing)?;
        unit("adapter.expansion_rate", a.expansion_rate)?;
        if let ExpansionRest::Reset(level) = a.expansion_rest {
            if !(0.0..=1.0).contains(&level) {
                return Err(ConfigError::invalid("adapter.expansion_rest", "must be in [0, 1]"));
            }
        }
        if let Some(force) = a.pointer_shockwave {
            positive("adapter.pointer_shockwave", force)?;
        }
        let t = &a.table;
        for action in [t.open_hand, t.fist, t.peace, t.thumbs_up, t.pinch, t.unknown] {
            match action {
                GestureAction::SpeedUp(k) | GestureAction::SlowDown(k) => {
                    positive("adapter.table speed multiplier", k)?
                }
                GestureAction::Shockwave { force } => {
                    positive("adapter.table shockwave force", force)?
                }
                _ => {}
            }
        }

        let i = &self.integrator;
        positive("integrator.influence_radius", i.influence_radius)?;
        unit("integrator.friction", i.friction)?;
        for (field, value) in [
            ("integrator.return_strength", i.return_strength),
            ("integrator.return_strength_expanding", i.return_strength_expanding),
            ("integrator.attract_strength", i.attract_strength),
            ("integrator.repel_strength", i.repel_strength),
            ("integrator.min_distance", i.min_distance),
        ] {
            non_negative(field, value)?;
        }
        if let Some(max) = i.max_speed {
            positive("integrator.max_speed", max)?;
        }
        if let Boundary::Wrap { min, max } | Boundary::Respawn { min, max } = i.boundary {
            if !min.cmple(max).all() {
                return Err(ConfigError::invalid("integrator.boundary", "min must not exceed max"));
            }
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be positive, got {value}")))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must not be negative, got {value}")))
    }
}

/// `(0, 1]`
fn unit(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be in (0, 1], got {value}")))
    }
}

fn range(field: &'static str, (min, max): (f32, f32)) -> Result<(), ConfigError> {
    if min.is_finite() && max.is_finite() && min >= 0.0 && min <= max {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("invalid range ({min}, {max})")))
    }
}

/// Built-in scenes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Dense 3D template morphing; fist pulls, open hand pushes.
    #[default]
    ShapeMorph,
    /// Small floating 3D shapes that swell with an open hand.
    FloatingShapes,
    /// Flat disc that collapses on a fist and explodes on release.
    BigBang,
    /// Drifting flat galaxy with finite-life particles.
    GalaxyDrift,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::ShapeMorph,
        Preset::FloatingShapes,
        Preset::BigBang,
        Preset::GalaxyDrift,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::ShapeMorph => "shape_morph",
            Preset::FloatingShapes => "floating_shapes",
            Preset::BigBang => "big_bang",
            Preset::GalaxyDrift => "galaxy_drift",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Preset::ShapeMorph => "20k particles morphing between 3D templates",
            Preset::FloatingShapes => "3k bobbing particles that expand on an open hand",
            Preset::BigBang => "Contract with a fist, release to explode",
            Preset::GalaxyDrift => "Planar galaxy with life-limited particles",
        }
    }

    pub fn config(&self) -> SimConfig {
        match self {
            Preset::ShapeMorph => shape_morph(),
            Preset::FloatingShapes => floating_shapes(),
            Preset::BigBang => big_bang(),
            Preset::GalaxyDrift => galaxy_drift(),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Preset::ALL
            .iter()
            .copied()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| ParseError::UnknownPreset(s.to_string()))
    }
}

// ========== Presets ==========

/// Screen-sized box with `margin` on every side.
fn screen_box(extent: Vec2, margin: f32) -> (Vec3, Vec3) {
    let half = (extent * 0.5 + Vec2::splat(margin)).extend(margin);
    (-half, half)
}

fn shape_morph() -> SimConfig {
    SimConfig {
        name: "Shape Morph".into(),
        particle_count: 20_000,
        template: ShapeTemplate::Galaxy,
        rotation_speed: 0.0003,
        adapter: AdapterConfig {
            expansion_rest: ExpansionRest::Keep,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn floating_shapes() -> SimConfig {
    SimConfig {
        name: "Floating Shapes".into(),
        particle_count: 3000,
        template: ShapeTemplate::Hearts,
        shape_scale: 1.25,
        palettes: vec![
            Palette::Cosmic,
            Palette::Fire,
            Palette::Tide,
            Palette::Sunset,
            Palette::Nebula,
            Palette::CottonCandy,
        ],
        style: ParticleStyle {
            size_range: (0.1, 0.2),
            ..Default::default()
        },
        float_motion: FloatMotion { amplitude: 1.0 },
        rotation_speed: 0.001,
        adapter: AdapterConfig {
            expansion_rate: 0.05,
            expansion_rest: ExpansionRest::Reset(0.0),
            steer: SteerPoint::PalmCenter,
            table: GestureTable {
                thumbs_up: GestureAction::SpeedUp(2.5),
                pinch: GestureAction::SlowDown(0.3),
                present_mode: InfluenceMode::Attract,
                expand_repels: false,
                ..Default::default()
            },
            ..Default::default()
        },
        integrator: IntegratorConfig {
            influence_radius: 8.0,
            attract_strength: 0.02,
            contracted_scale: 1.0,
            expanded_scale: 1.5,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn big_bang() -> SimConfig {
    let extent = Vec2::new(1280.0, 720.0);
    let (min, max) = screen_box(extent, 50.0);
    SimConfig {
        name: "Big Bang".into(),
        particle_count: 25_000,
        template: ShapeTemplate::Nebula,
        shape_scale: 30.0,
        palettes: vec![Palette::Cosmic, Palette::Fire, Palette::Tide, Palette::Sunset],
        style: ParticleStyle {
            size_range: (1.0, 3.5),
            // Each particle's home slowly circles the centre, reversing with time.
            orbit_speed: Some((-0.01, 0.01)),
            ..Default::default()
        },
        phases: true,
        explosion_shockwave: Some(20.0),
        shockwave: ShockwaveConfig {
            max_radius: extent.max_element(),
            ..Default::default()
        },
        adapter: AdapterConfig {
            pointer_shockwave: Some(15.0),
            mapping: ScreenMapping {
                extent,
                ..Default::default()
            },
            table: GestureTable {
                peace: GestureAction::Shockwave { force: 25.0 },
                thumbs_up: GestureAction::AdvancePalette,
                pinch: GestureAction::ReverseTime,
                contract_attracts: false,
                ..Default::default()
            },
            ..Default::default()
        },
        integrator: IntegratorConfig {
            influence_radius: 150.0,
            repel_strength: 2.0,
            swirl_strength: 0.0,
            swirl_plane: SwirlPlane::Xy,
            return_strength: 0.02,
            return_strength_expanding: 0.02,
            friction: 0.98,
            contracted_scale: 0.0,
            expanded_scale: 2.0,
            boundary: Boundary::Wrap { min, max },
            max_speed: Some(40.0),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn galaxy_drift() -> SimConfig {
    let extent = Vec2::new(1280.0, 720.0);
    let (min, max) = screen_box(extent, 50.0);
    SimConfig {
        name: "Galaxy Drift".into(),
        particle_count: 15_000,
        template: ShapeTemplate::Nebula,
        shape_scale: 30.0,
        palettes: vec![Palette::Drift],
        style: ParticleStyle {
            size_range: (0.5, 3.0),
            alpha_range: (0.5, 1.0),
            color_assignment: ColorAssignment::Random,
            life_decay: Some((0.001, 0.004)),
            launch_speed: Some((0.5, 2.5)),
            orbit_speed: None,
        },
        adapter: AdapterConfig {
            mapping: ScreenMapping {
                extent,
                ..Default::default()
            },
            table: GestureTable {
                open_hand: GestureAction::Neutral,
                fist: GestureAction::Neutral,
                peace: GestureAction::Neutral,
                thumbs_up: GestureAction::Neutral,
                pinch: GestureAction::Neutral,
                ..Default::default()
            },
            ..Default::default()
        },
        integrator: IntegratorConfig {
            influence_radius: 200.0,
            repel_strength: 2.0,
            swirl_strength: 0.5,
            swirl_plane: SwirlPlane::Xy,
            return_strength: 0.0,
            return_strength_expanding: 0.0,
            friction: 0.99,
            center_gravity: Some(CenterGravity {
                strength: 0.01,
                dead_zone: 50.0,
            }),
            boundary: Boundary::Respawn { min, max },
            ..Default::default()
        },
        ..Default::default()
    }
}
