//! The simulation context.
//!
//! [`Simulation`] owns every piece of mutable state: particles, the influence
//! adapter, transient effects, the phase machine, the palette cycle, the clock
//! and the random source. Nothing lives in globals, so several simulations
//! can run side by side and a seeded run is reproducible.
//!
//! Each [`step`](Simulation::step):
//!
//! 1. advances the clock,
//! 2. reads the latest detector frame and updates the influence state,
//! 3. applies one-shot triggers (palette, shockwave, phase changes),
//! 4. integrates every particle once,
//! 5. grows and expires shockwaves.

use crate::config::{Preset, SimConfig};
use crate::effects::{Phase, PhaseMachine, TransientEffects};
use crate::error::{ConfigError, SimulationError};
use crate::influence::{DetectorFrame, InfluenceAdapter, InfluenceState, Trigger};
use crate::integrator::{FrameInputs, FrameStats, Integrator};
use crate::palette::{Palette, PaletteCycle};
use crate::particles::{DirtyFlags, ParticleStore, ParticleVertex, SpawnSpec};
use crate::shapes::ShapeTemplate;
use crate::snapshot::{DetectorChannel, DetectorStatus};
use crate::time::Time;
use glam::Vec3;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// A running particle simulation.
///
/// Build with [`Simulation::new`] or [`Simulation::from_preset`], then call
/// [`step`](Self::step) once per animation frame.
pub struct Simulation {
    config: SimConfig,
    store: ParticleStore,
    integrator: Integrator,
    adapter: InfluenceAdapter,
    effects: TransientEffects,
    phases: PhaseMachine,
    palettes: PaletteCycle,
    time: Time,
    rng: SmallRng,
    detector: Option<DetectorChannel>,
    detector_seq: u64,
    frame: DetectorFrame,
    rotation: f32,
    vertices: Vec<ParticleVertex>,
}

impl Simulation {
    /// Validate `config` and spawn its particles.
    pub fn new(config: SimConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut rng = SmallRng::seed_from_u64(seed);
        let palettes = PaletteCycle::new(config.palettes.clone());
        let store = ParticleStore::new(
            config.particle_count,
            spawn_spec(&config, palettes.current()),
            &mut rng,
        );
        info!(
            name = %config.name,
            particles = config.particle_count,
            template = %config.template,
            seed,
            "simulation created"
        );

        Ok(Self {
            integrator: Integrator::new(config.integrator),
            adapter: InfluenceAdapter::new(config.adapter, palettes.len()),
            effects: TransientEffects::new(config.shockwave, config.shockwave_capacity),
            phases: PhaseMachine::new(config.phase_timings),
            palettes,
            time: Time::new(),
            rng,
            detector: None,
            detector_seq: 0,
            frame: DetectorFrame::Absent,
            rotation: 0.0,
            vertices: Vec::new(),
            store,
            config,
        })
    }

    pub fn from_preset(preset: Preset, seed: u64) -> Result<Self, ConfigError> {
        Self::new(preset.config(), seed)
    }

    /// Preset looked up by name, e.g. from a command line.
    pub fn from_preset_name(name: &str, seed: u64) -> Result<Self, SimulationError> {
        let preset: Preset = name.parse()?;
        Ok(Self::from_preset(preset, seed)?)
    }

    // ========== Builder ==========

    /// Respawn with `count` particles. Zero is raised to one, as in
    /// [`set_particle_count`](Self::set_particle_count).
    pub fn with_particle_count(mut self, count: u32) -> Self {
        self.set_particle_count(count);
        self
    }

    /// Start on `template` instead of the configured one.
    pub fn with_template(mut self, template: ShapeTemplate) -> Self {
        self.config.template = template;
        let count = self.config.particle_count;
        self.rebuild(count);
        self
    }

    /// Read detector frames from `channel` on every step.
    pub fn with_detector(mut self, channel: DetectorChannel) -> Self {
        self.detector = Some(channel);
        self
    }

    /// Fixed step for the internal clock, used when `step` gets a zero delta.
    pub fn with_fixed_delta(mut self, delta: f32) -> Self {
        self.time.set_fixed_delta(Some(delta));
        self
    }

    // ========== Operations ==========

    /// Feed a detector frame directly. It stays current until replaced.
    pub fn ingest(&mut self, frame: DetectorFrame) {
        self.frame = frame;
    }

    /// Advance one animation frame of `delta` seconds.
    pub fn step(&mut self, delta: f32) -> FrameStats {
        if let Some(channel) = &self.detector {
            let (frame, seq) = channel.latest();
            if seq != self.detector_seq {
                trace!(seq, "new detector frame");
                self.detector_seq = seq;
                self.frame = frame;
            }
        }

        let delta = if delta > 0.0 { delta } else { self.time.tick() };
        let speed = self.adapter.state().speed_multiplier;
        if self.time.advance(delta, speed) == 0.0 {
            return FrameStats::default();
        }
        let now = self.time.now();

        let triggers = self.adapter.ingest(&self.frame, now);
        self.adapter.advance();
        for trigger in triggers {
            self.apply(trigger, now);
        }
        if self.config.phases {
            self.phases.update(now);
        }

        let state = self.adapter.state();
        self.rotation += self.config.rotation_speed * state.speed_multiplier * state.time_direction;

        let spec = spawn_spec(&self.config, self.palettes.current());
        let inputs = FrameInputs {
            influence: state,
            effects: &self.effects,
            phase: self.phase(),
            spawn: spec,
        };
        let stats = self.integrator.step(&mut self.store, &inputs, &mut self.rng);
        if self.config.float_motion.is_active() {
            // The bobbing offset moves rendered positions every frame.
            self.store.mark_positions_dirty();
        }
        self.effects.update();
        stats
    }

    /// Morph toward a new template. Positions are untouched, so particles
    /// travel to the new shape instead of jumping.
    pub fn set_template(&mut self, template: ShapeTemplate) {
        if template == self.config.template {
            return;
        }
        info!(from = %self.config.template, to = %template, "template switch");
        self.config.template = template;
        self.store
            .retarget(template, self.config.shape_scale, &mut self.rng);
    }

    /// Respawn every particle with a new count. Zero is raised to one.
    pub fn set_particle_count(&mut self, count: u32) {
        if count == 0 {
            warn!("particle count 0 requested, keeping one particle");
        }
        self.rebuild(count.max(1));
    }

    /// Start a shockwave at `origin` now.
    pub fn trigger_shockwave(&mut self, origin: Vec3, force: f32) {
        self.effects.trigger(origin, force);
    }

    /// Step to the next palette and recolor.
    pub fn advance_palette(&mut self) -> Palette {
        let palette = self.palettes.advance();
        self.adapter.set_palette_index(self.palettes.index());
        self.recolor();
        palette
    }

    // ========== Accessors ==========

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn influence(&self) -> &InfluenceState {
        self.adapter.state()
    }

    pub fn particles(&self) -> &ParticleStore {
        &self.store
    }

    /// Current phase; always idle when phases are disabled.
    pub fn phase(&self) -> Phase {
        if self.config.phases {
            self.phases.phase()
        } else {
            Phase::Idle
        }
    }

    pub fn effects(&self) -> &TransientEffects {
        &self.effects
    }

    pub fn template(&self) -> ShapeTemplate {
        self.config.template
    }

    pub fn palette(&self) -> Palette {
        self.palettes.current()
    }

    /// Render records for this frame, including the float offset.
    pub fn vertices(&mut self) -> &[ParticleVertex] {
        let t = self.time.animation();
        self.store
            .write_vertices(&mut self.vertices, self.config.float_motion, t);
        &self.vertices
    }

    /// Which render buffers changed since the last call.
    pub fn take_dirty(&mut self) -> DirtyFlags {
        self.store.take_dirty()
    }

    /// Simulation time.
    pub fn elapsed(&self) -> Duration {
        self.time.now()
    }

    /// Accumulated system rotation in radians.
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn time(&self) -> &Time {
        &self.time
    }

    /// For pausing or scaling the clock.
    pub fn time_mut(&mut self) -> &mut Time {
        &mut self.time
    }

    pub fn detector_status(&self) -> Option<DetectorStatus> {
        self.detector.as_ref().map(DetectorChannel::status)
    }

    // ========== Internal ==========

    fn apply(&mut self, trigger: Trigger, now: Duration) {
        debug!(?trigger, "applying trigger");
        match trigger {
            Trigger::AdvancePalette(index) => {
                while self.palettes.index() != index % self.palettes.len() {
                    self.palettes.advance();
                }
                info!(palette = %self.palettes.current(), "palette changed");
                self.recolor();
            }
            Trigger::Shockwave { origin, force } => self.effects.trigger(origin, force),
            Trigger::Explode if self.config.phases => {
                self.phases.explode(now);
                if let Some(force) = self.config.explosion_shockwave {
                    self.effects.trigger(Vec3::ZERO, force);
                }
            }
            Trigger::Contract if self.config.phases => self.phases.contract(now),
            Trigger::Release if self.config.phases => self.phases.release(now),
            Trigger::Explode | Trigger::Contract | Trigger::Release => {}
        }
    }

    fn recolor(&mut self) {
        self.store.recolor(
            self.palettes.current(),
            self.config.style.color_assignment,
            &mut self.rng,
        );
    }

    fn rebuild(&mut self, count: u32) {
        self.config.particle_count = count;
        let spec = spawn_spec(&self.config, self.palettes.current());
        self.store.rebuild(count, spec, &mut self.rng);
        debug!(count, template = %self.config.template, "particles rebuilt");
    }
}

fn spawn_spec(config: &SimConfig, palette: Palette) -> SpawnSpec<'_> {
    SpawnSpec {
        template: config.template,
        scale: config.shape_scale,
        palette,
        style: &config.style,
    }
}
