//! Transient effects and the explosion/contraction phase machine.
//!
//! # Shockwaves
//!
//! A shockwave is an expanding ring that pushes particles outward while they
//! sit inside a thin band around the ring. Each frame the radius grows by a
//! fixed step and the force decays geometrically; once the ring is wider than
//! `max_radius` or its force is negligible it is dropped.
//!
//! ```text
//! triggered -> growing -> expired -> removed
//! ```
//!
//! # Phases
//!
//! The big-bang scene layers a global phase on top of the normal spring:
//!
//! ```text
//! Idle <-> Contracted <-> Exploding -> Expanded -> Idle
//! ```
//!
//! Timeouts are fixed durations on the simulation clock.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Shockwave tuning shared by every ring.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShockwaveConfig {
    /// Radius added per frame.
    pub growth: f32,
    /// Force multiplier per frame, in `(0, 1)`.
    pub decay: f32,
    /// Half-width of the band around the ring that receives force.
    pub band: f32,
    /// Force below which a ring is considered spent.
    pub min_force: f32,
    /// Radius at which a ring is removed.
    pub max_radius: f32,
}

impl Default for ShockwaveConfig {
    fn default() -> Self {
        Self {
            growth: 20.0,
            decay: 0.95,
            band: 50.0,
            min_force: 0.01,
            max_radius: 1000.0,
        }
    }
}

/// An expanding ring impulse.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shockwave {
    pub origin: Vec3,
    pub radius: f32,
    pub force: f32,
    pub max_radius: f32,
}

impl Shockwave {
    pub fn new(origin: Vec3, force: f32, max_radius: f32) -> Self {
        Self {
            origin,
            radius: 0.0,
            force,
            max_radius,
        }
    }

    /// Grow the ring and decay its force by one frame.
    pub fn update(&mut self, config: &ShockwaveConfig) {
        self.radius += config.growth;
        self.force *= config.decay;
    }

    pub fn is_expired(&self, config: &ShockwaveConfig) -> bool {
        self.radius > self.max_radius || self.force < config.min_force
    }

    /// Velocity impulse on a particle at `position`.
    ///
    /// Zero outside the band, and zero at the exact origin where the radial
    /// direction is undefined.
    pub fn force_on(&self, position: Vec3, band: f32) -> Vec3 {
        let offset = position - self.origin;
        let dist = offset.length();
        let ring_dist = (dist - self.radius).abs();

        if ring_dist >= band || dist <= f32::EPSILON {
            return Vec3::ZERO;
        }
        offset / dist * (1.0 - ring_dist / band) * self.force
    }
}

/// Active shockwaves, bounded by `capacity`.
///
/// With capacity 1, a new trigger replaces the running ring.
#[derive(Clone, Debug)]
pub struct TransientEffects {
    config: ShockwaveConfig,
    capacity: usize,
    active: Vec<Shockwave>,
}

impl TransientEffects {
    pub fn new(config: ShockwaveConfig, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            config,
            capacity,
            active: Vec::with_capacity(capacity),
        }
    }

    pub fn config(&self) -> &ShockwaveConfig {
        &self.config
    }

    /// Start a ring at `origin`. The oldest ring is dropped when full.
    pub fn trigger(&mut self, origin: Vec3, force: f32) {
        if self.active.len() >= self.capacity {
            self.active.remove(0);
        }
        debug!(?origin, force, "shockwave triggered");
        self.active
            .push(Shockwave::new(origin, force, self.config.max_radius));
    }

    /// Advance every ring one frame and drop the expired ones.
    pub fn update(&mut self) {
        let config = self.config;
        for wave in &mut self.active {
            wave.update(&config);
        }
        self.active.retain(|w| !w.is_expired(&config));
    }

    /// Summed impulse of every active ring.
    pub fn force_on(&self, position: Vec3) -> Vec3 {
        self.active
            .iter()
            .map(|w| w.force_on(position, self.config.band))
            .sum()
    }

    pub fn active(&self) -> &[Shockwave] {
        &self.active
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }
}

/// Global scene phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Contracted,
    Exploding,
    Expanded,
}

/// Which force term dominates the integrator in a phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseForce {
    /// Spring back toward the (scaled) template target.
    Spring,
    /// Strong pull toward the world origin.
    Centering,
    /// Outward impulse away from the world origin.
    Explosive,
}

impl Phase {
    pub fn force(&self) -> PhaseForce {
        match self {
            Phase::Idle | Phase::Expanded => PhaseForce::Spring,
            Phase::Contracted => PhaseForce::Centering,
            Phase::Exploding => PhaseForce::Explosive,
        }
    }
}

/// Fixed phase durations.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseTimings {
    /// Exploding -> Expanded.
    #[serde(with = "millis")]
    pub explode: Duration,
    /// Contracted -> Idle.
    #[serde(with = "millis")]
    pub contract: Duration,
    /// Expanded -> Idle.
    #[serde(with = "millis")]
    pub expanded: Duration,
}

impl Default for PhaseTimings {
    fn default() -> Self {
        Self {
            explode: Duration::from_millis(500),
            contract: Duration::from_millis(1000),
            expanded: Duration::from_millis(3000),
        }
    }
}

/// Timer-driven phase state machine.
#[derive(Clone, Debug)]
pub struct PhaseMachine {
    phase: Phase,
    entered_at: Duration,
    timings: PhaseTimings,
}

impl PhaseMachine {
    pub fn new(timings: PhaseTimings) -> Self {
        Self {
            phase: Phase::Idle,
            entered_at: Duration::ZERO,
            timings,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Start the big bang.
    pub fn explode(&mut self, now: Duration) {
        self.enter(Phase::Exploding, now);
    }

    /// Collapse toward the centre.
    pub fn contract(&mut self, now: Duration) {
        self.enter(Phase::Contracted, now);
    }

    /// Hand lost: go straight back to idle.
    pub fn release(&mut self, now: Duration) {
        if self.phase != Phase::Idle {
            self.enter(Phase::Idle, now);
        }
    }

    /// Apply any timeouts that have elapsed by `now`.
    pub fn update(&mut self, now: Duration) {
        let elapsed = now.saturating_sub(self.entered_at);
        let next = match self.phase {
            Phase::Exploding if elapsed >= self.timings.explode => Some(Phase::Expanded),
            Phase::Contracted if elapsed >= self.timings.contract => Some(Phase::Idle),
            Phase::Expanded if elapsed >= self.timings.expanded => Some(Phase::Idle),
            _ => None,
        };
        if let Some(next) = next {
            self.enter(next, now);
        }
    }

    fn enter(&mut self, phase: Phase, now: Duration) {
        debug!(from = ?self.phase, to = ?phase, "phase transition");
        self.phase = phase;
        self.entered_at = now;
    }
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new(PhaseTimings::default())
    }
}

/// Serialize `Duration` as whole milliseconds.
pub(crate) mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_shockwave_grows_and_decays() {
        let config = ShockwaveConfig::default();
        let mut wave = Shockwave::new(Vec3::ZERO, 15.0, 200.0);
        let mut last = wave;
        for _ in 0..5 {
            wave.update(&config);
            assert!(wave.radius > last.radius);
            assert!(wave.force < last.force);
            last = wave;
        }
    }

    #[test]
    fn test_force_only_inside_band() {
        let mut wave = Shockwave::new(Vec3::ZERO, 10.0, 1000.0);
        wave.radius = 100.0;

        let on_ring = wave.force_on(Vec3::new(100.0, 0.0, 0.0), 50.0);
        assert!((on_ring - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-4);

        let half = wave.force_on(Vec3::new(0.0, 125.0, 0.0), 50.0);
        assert!((half - Vec3::new(0.0, 5.0, 0.0)).length() < 1e-4);

        assert_eq!(wave.force_on(Vec3::new(200.0, 0.0, 0.0), 50.0), Vec3::ZERO);
        assert_eq!(wave.force_on(Vec3::new(30.0, 0.0, 0.0), 50.0), Vec3::ZERO);
    }

    #[test]
    fn test_force_at_origin_is_zero() {
        let wave = Shockwave::new(Vec3::ONE, 10.0, 100.0);
        assert_eq!(wave.force_on(Vec3::ONE, 50.0), Vec3::ZERO);
    }

    #[test]
    fn test_ring_removed_past_max_radius() {
        let config = ShockwaveConfig {
            max_radius: 60.0,
            ..Default::default()
        };
        let mut effects = TransientEffects::new(config, 1);
        effects.trigger(Vec3::ZERO, 15.0);

        effects.update(); // 20
        effects.update(); // 40
        effects.update(); // 60
        assert_eq!(effects.len(), 1);
        effects.update(); // 80 > 60
        assert!(effects.is_empty());
        assert_eq!(effects.force_on(Vec3::new(80.0, 0.0, 0.0)), Vec3::ZERO);
    }

    #[test]
    fn test_ring_removed_when_force_spent() {
        let config = ShockwaveConfig {
            decay: 0.1,
            min_force: 0.5,
            ..Default::default()
        };
        let mut effects = TransientEffects::new(config, 1);
        effects.trigger(Vec3::ZERO, 10.0);
        effects.update(); // 1.0
        assert_eq!(effects.len(), 1);
        effects.update(); // 0.1
        assert!(effects.is_empty());
    }

    #[test]
    fn test_trigger_replaces_when_full() {
        let mut effects = TransientEffects::new(ShockwaveConfig::default(), 1);
        effects.trigger(Vec3::ZERO, 5.0);
        effects.update();
        effects.trigger(Vec3::X, 25.0);
        assert_eq!(effects.len(), 1);
        assert_eq!(effects.active()[0].origin, Vec3::X);
        assert_eq!(effects.active()[0].radius, 0.0);
    }

    #[test]
    fn test_capacity_keeps_several_rings() {
        let mut effects = TransientEffects::new(ShockwaveConfig::default(), 3);
        for i in 0..5 {
            effects.trigger(Vec3::splat(i as f32), 5.0);
        }
        assert_eq!(effects.len(), 3);
        assert_eq!(effects.active()[0].origin, Vec3::splat(2.0));
    }

    #[test]
    fn test_explode_then_expanded_then_idle() {
        let mut machine = PhaseMachine::default();
        machine.explode(ms(0));
        assert_eq!(machine.phase(), Phase::Exploding);
        assert_eq!(machine.phase().force(), PhaseForce::Explosive);

        machine.update(ms(499));
        assert_eq!(machine.phase(), Phase::Exploding);
        machine.update(ms(500));
        assert_eq!(machine.phase(), Phase::Expanded);
        machine.update(ms(3499));
        assert_eq!(machine.phase(), Phase::Expanded);
        machine.update(ms(3500));
        assert_eq!(machine.phase(), Phase::Idle);
    }

    #[test]
    fn test_contract_times_out_to_idle() {
        let mut machine = PhaseMachine::default();
        machine.contract(ms(100));
        assert_eq!(machine.phase().force(), PhaseForce::Centering);
        machine.update(ms(1099));
        assert_eq!(machine.phase(), Phase::Contracted);
        machine.update(ms(1100));
        assert_eq!(machine.phase(), Phase::Idle);
    }

    #[test]
    fn test_release_resets() {
        let mut machine = PhaseMachine::default();
        machine.explode(ms(0));
        machine.release(ms(10));
        assert_eq!(machine.phase(), Phase::Idle);
    }

    #[test]
    fn test_timings_serialize_as_millis() {
        let json = serde_json::to_string(&PhaseTimings::default()).unwrap();
        assert_eq!(json, r#"{"explode":500,"contract":1000,"expanded":3000}"#);
    }
}
