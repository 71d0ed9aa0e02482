//! # Gestura - gesture-driven particle simulation
//!
//! A particle core that morphs thousands of points between shape templates
//! and lets a hand (or a mouse) push, pull, explode and recolor them.
//!
//! Gestura is headless: it owns particle state and physics and hands a
//! `bytemuck`-castable vertex slice to whatever renderer you use. Hand
//! landmarks come from whatever detector you use; Gestura only classifies them.
//!
//! ## Quick Start
//!
//! ```ignore
//! use gestura::prelude::*;
//!
//! let mut sim = Simulation::from_preset(Preset::ShapeMorph, 42)?
//!     .with_particle_count(10_000)
//!     .with_template(ShapeTemplate::Hearts);
//!
//! loop {
//!     sim.ingest(detector.latest());
//!     sim.step(1.0 / 60.0);
//!     if sim.take_dirty().any() {
//!         renderer.upload(bytemuck::cast_slice(sim.vertices()));
//!     }
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Templates
//!
//! A [`ShapeTemplate`] maps `(index, total)` to a target position. Switching
//! templates only moves targets; the return spring carries particles across.
//!
//! ### Influence
//!
//! Each frame the detector's latest [`DetectorFrame`] is turned into an
//! [`InfluenceState`]: a smoothed point plus an attract/repel mode, a speed
//! multiplier and an expansion level. Gestures map to actions through a
//! [`GestureTable`].
//!
//! | Gesture | Default action |
//! |---------|----------------|
//! | open hand | expand, repel |
//! | fist | contract, attract |
//! | peace | next palette (once per 500 ms) |
//! | thumbs up | speed x3 |
//! | pinch | speed x0.2 |
//! | none / unknown | neutral |
//!
//! ### Detector hand-off
//!
//! Detectors run at their own rate on their own thread. Publish frames into
//! a [`DetectorChannel`] and attach it with
//! [`Simulation::with_detector`]; the simulation picks up the latest one each
//! step. A detector that stops only ever leaves the scene in neutral.
//!
//! ## Presets
//!
//! | Preset | Scene |
//! |--------|-------|
//! | [`Preset::ShapeMorph`] | 3D templates, attract/repel with swirl |
//! | [`Preset::FloatingShapes`] | small bobbing shapes that swell on an open hand |
//! | [`Preset::BigBang`] | contract and explode, shockwaves, reversible time |
//! | [`Preset::GalaxyDrift`] | flat galaxy, centre gravity, finite lifetimes |

pub mod config;
pub mod effects;
mod error;
pub mod gesture;
pub mod influence;
pub mod input;
pub mod integrator;
pub mod palette;
pub mod particles;
pub mod shapes;
mod simulation;
pub mod snapshot;
pub mod time;

pub use bytemuck;
pub use config::{Preset, SimConfig};
pub use effects::{Phase, PhaseMachine, Shockwave, ShockwaveConfig, TransientEffects};
pub use error::{ConfigError, ParseError, SimulationError};
pub use gesture::{classify, ClassifierThresholds, Gesture, HandLandmarks, Landmark};
pub use glam::{Vec2, Vec3};
pub use influence::{
    DetectorFrame, GestureAction, GestureTable, InfluenceAdapter, InfluenceMode, InfluenceState,
    Trigger,
};
pub use integrator::{falloff, Boundary, FrameStats, Integrator, IntegratorConfig, SwirlPlane};
pub use palette::{Palette, PaletteCycle};
pub use particles::{DirtyFlags, Particle, ParticleStore, ParticleStyle, ParticleVertex};
pub use shapes::{generate_all, ShapeTemplate};
pub use simulation::Simulation;
pub use snapshot::{DetectorChannel, DetectorStatus};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use gestura::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{Preset, SimConfig};
    pub use crate::effects::Phase;
    pub use crate::gesture::{Gesture, HandLandmarks, Landmark};
    pub use crate::influence::{DetectorFrame, GestureAction, GestureTable, InfluenceMode};
    pub use crate::input::PointerInput;
    pub use crate::palette::Palette;
    pub use crate::particles::ParticleVertex;
    pub use crate::shapes::ShapeTemplate;
    pub use crate::simulation::Simulation;
    pub use crate::snapshot::DetectorChannel;
    pub use crate::time::Time;
    pub use crate::{Vec2, Vec3};
}
