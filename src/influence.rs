//! Influence source adapter.
//!
//! Turns whatever the detector reported this frame (nothing, a pointer, or a
//! hand skeleton) into the single [`InfluenceState`] the integrator reads.
//!
//! | Stage | What happens |
//! |-------|--------------|
//! | map | normalized image coordinates to world space, hands mirrored |
//! | smooth | `point += (raw - point) * smoothing`, once per frame |
//! | classify | hand skeleton to [`Gesture`] |
//! | table | gesture to [`GestureAction`] (mode, speed, expansion) |
//! | one-shots | palette/shockwave/phase [`Trigger`]s, gated by cooldowns |
//!
//! Cooldowns compare timestamps on the unscaled simulation clock, so a held
//! gesture fires its one-shot action once per cooldown window rather than
//! every frame. Changing gesture re-arms them immediately.

use crate::effects::millis;
use crate::gesture::{classify, ClassifierThresholds, Gesture, HandLandmarks};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

/// Which way the influence point pushes particles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfluenceMode {
    /// No influence force at all.
    #[default]
    Neutral,
    Attract,
    Repel,
}

/// Everything the integrator needs to know about the user this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InfluenceState {
    /// Smoothed world-space influence point.
    pub point: Vec3,
    pub mode: InfluenceMode,
    /// Loosens the return spring while set.
    pub expanding: bool,
    /// Eased shape scale blend, in `[0, 1]`.
    pub expansion_level: f32,
    /// Animation clock multiplier, always positive.
    pub speed_multiplier: f32,
    pub palette_index: usize,
    /// `1.0` normally, `-1.0` while time runs backwards.
    pub time_direction: f32,
    /// Gesture seen on the latest frame.
    pub gesture: Gesture,
}

impl InfluenceState {
    #[inline]
    pub fn is_attracting(&self) -> bool {
        self.mode == InfluenceMode::Attract
    }

    #[inline]
    pub fn is_repelling(&self) -> bool {
        self.mode == InfluenceMode::Repel
    }
}

impl Default for InfluenceState {
    fn default() -> Self {
        Self {
            point: Vec3::ZERO,
            mode: InfluenceMode::Neutral,
            expanding: false,
            expansion_level: 0.5,
            speed_multiplier: 1.0,
            palette_index: 0,
            time_direction: 1.0,
            gesture: Gesture::None,
        }
    }
}

/// One detector snapshot, in normalized `[0, 1]` image space with y down.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum DetectorFrame {
    /// No hand or pointer this frame.
    #[default]
    Absent,
    Pointer { position: Vec2, pressed: bool },
    Hand(HandLandmarks),
}

/// Maps normalized image coordinates onto the world plane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenMapping {
    /// World width and height covered by the full image.
    pub extent: Vec2,
    /// World point under the image centre.
    pub center: Vec3,
    /// Flip x for selfie-view hand input.
    pub mirror_x: bool,
    /// Scale applied to landmark depth.
    pub depth_scale: f32,
}

impl Default for ScreenMapping {
    fn default() -> Self {
        Self {
            extent: Vec2::new(40.0, 30.0),
            center: Vec3::ZERO,
            mirror_x: true,
            depth_scale: 0.0,
        }
    }
}

impl ScreenMapping {
    /// World position of a normalized point. World y points up.
    pub fn to_world(&self, uv: Vec2, depth: f32, mirror: bool) -> Vec3 {
        let u = if mirror { 1.0 - uv.x } else { uv.x };
        self.center
            + Vec3::new(
                (u - 0.5) * self.extent.x,
                (0.5 - uv.y) * self.extent.y,
                depth * self.depth_scale,
            )
    }
}

/// Which landmark steers the influence point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SteerPoint {
    #[default]
    IndexTip,
    PalmCenter,
}

/// What a recognized gesture does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureAction {
    #[default]
    Neutral,
    /// Loose spring, expansion target 1. Following a contract, also explodes.
    Expand,
    /// Tight spring, expansion target 0, enters the contracted phase.
    Contract,
    /// One-shot palette advance.
    AdvancePalette,
    /// Speed multiplier above one.
    SpeedUp(f32),
    /// Speed multiplier below one.
    SlowDown(f32),
    /// Integrate backwards while held.
    ReverseTime,
    /// One-shot shockwave at the influence point.
    Shockwave { force: f32 },
    /// Expand and explode immediately.
    Explode,
}

/// Gesture to action lookup, plus the mode used while a hand is present.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureTable {
    pub open_hand: GestureAction,
    pub fist: GestureAction,
    pub peace: GestureAction,
    pub thumbs_up: GestureAction,
    pub pinch: GestureAction,
    pub unknown: GestureAction,
    /// Mode while a hand or pointer is present and the action sets none.
    pub present_mode: InfluenceMode,
    /// Expand switches the mode to repel.
    pub expand_repels: bool,
    /// Contract switches the mode to attract.
    pub contract_attracts: bool,
}

impl Default for GestureTable {
    fn default() -> Self {
        Self {
            open_hand: GestureAction::Expand,
            fist: GestureAction::Contract,
            peace: GestureAction::AdvancePalette,
            thumbs_up: GestureAction::SpeedUp(3.0),
            pinch: GestureAction::SlowDown(0.2),
            unknown: GestureAction::Neutral,
            present_mode: InfluenceMode::Repel,
            expand_repels: true,
            contract_attracts: true,
        }
    }
}

impl GestureTable {
    pub fn action(&self, gesture: Gesture) -> GestureAction {
        match gesture {
            Gesture::OpenHand => self.open_hand,
            Gesture::Fist => self.fist,
            Gesture::Peace => self.peace,
            Gesture::ThumbsUp => self.thumbs_up,
            Gesture::Pinch => self.pinch,
            Gesture::Unknown => self.unknown,
            Gesture::None => GestureAction::Neutral,
        }
    }

    fn mode(&self, action: GestureAction) -> InfluenceMode {
        match action {
            GestureAction::Expand | GestureAction::Explode if self.expand_repels => {
                InfluenceMode::Repel
            }
            GestureAction::Contract if self.contract_attracts => InfluenceMode::Attract,
            _ => self.present_mode,
        }
    }
}

/// What happens to the expansion target when the hand goes away.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionRest {
    /// Leave it wherever the last gesture put it.
    Keep,
    /// Ease back to this level.
    Reset(f32),
}

impl Default for ExpansionRest {
    fn default() -> Self {
        ExpansionRest::Reset(0.5)
    }
}

/// A one-shot action produced by the adapter for the simulation to apply.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Trigger {
    AdvancePalette(usize),
    Shockwave { origin: Vec3, force: f32 },
    Explode,
    Contract,
    /// Hand or pointer lost.
    Release,
}

/// Timestamp-based re-arm gate.
#[derive(Clone, Copy, Debug)]
pub struct Cooldown {
    duration: Duration,
    last: Option<Duration>,
}

impl Cooldown {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            last: None,
        }
    }

    pub fn is_ready(&self, now: Duration) -> bool {
        self.last
            .map_or(true, |last| now.saturating_sub(last) >= self.duration)
    }

    /// Fire if ready. Returns whether it fired.
    pub fn try_fire(&mut self, now: Duration) -> bool {
        if self.is_ready(now) {
            self.last = Some(now);
            true
        } else {
            false
        }
    }

    pub fn rearm(&mut self) {
        self.last = None;
    }
}

/// Adapter tuning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Low-pass factor for the influence point, in `(0, 1]`.
    pub smoothing: f32,
    /// Per-frame easing factor for the expansion level.
    pub expansion_rate: f32,
    pub expansion_rest: ExpansionRest,
    #[serde(with = "millis")]
    pub palette_cooldown: Duration,
    #[serde(with = "millis")]
    pub shockwave_cooldown: Duration,
    /// Shockwave force when the pointer is pressed. `None` disables it.
    pub pointer_shockwave: Option<f32>,
    pub steer: SteerPoint,
    pub mapping: ScreenMapping,
    pub table: GestureTable,
    pub thresholds: ClassifierThresholds,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            smoothing: 0.1,
            expansion_rate: 0.03,
            expansion_rest: ExpansionRest::default(),
            palette_cooldown: Duration::from_millis(500),
            shockwave_cooldown: Duration::from_millis(300),
            pointer_shockwave: None,
            steer: SteerPoint::default(),
            mapping: ScreenMapping::default(),
            table: GestureTable::default(),
            thresholds: ClassifierThresholds::default(),
        }
    }
}

/// Stateful detector-to-influence converter.
#[derive(Clone, Debug)]
pub struct InfluenceAdapter {
    config: AdapterConfig,
    state: InfluenceState,
    raw: Vec3,
    expansion_target: f32,
    palette_count: usize,
    last_action: Option<GestureAction>,
    palette_cooldown: Cooldown,
    shockwave_cooldown: Cooldown,
    was_pressed: bool,
}

impl InfluenceAdapter {
    pub fn new(config: AdapterConfig, palette_count: usize) -> Self {
        let rest = match config.expansion_rest {
            ExpansionRest::Reset(level) => level,
            ExpansionRest::Keep => InfluenceState::default().expansion_level,
        };
        let state = InfluenceState {
            point: config.mapping.center,
            expansion_level: rest,
            ..Default::default()
        };
        Self {
            raw: state.point,
            expansion_target: rest,
            palette_count: palette_count.max(1),
            last_action: None,
            palette_cooldown: Cooldown::new(config.palette_cooldown),
            shockwave_cooldown: Cooldown::new(config.shockwave_cooldown),
            was_pressed: false,
            config,
            state,
        }
    }

    pub fn state(&self) -> &InfluenceState {
        &self.state
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Current expansion target the level is easing toward.
    pub fn expansion_target(&self) -> f32 {
        self.expansion_target
    }

    /// Set the palette index from outside, e.g. a keyboard shortcut.
    pub fn set_palette_index(&mut self, index: usize) {
        self.state.palette_index = index % self.palette_count;
    }

    /// Read one detector frame at time `now`.
    ///
    /// Call once per simulation frame with the latest snapshot; a repeated
    /// snapshot is harmless since transitions are edge-triggered and one-shots
    /// are gated by cooldowns.
    pub fn ingest(&mut self, frame: &DetectorFrame, now: Duration) -> Vec<Trigger> {
        let mut triggers = Vec::new();
        match frame {
            DetectorFrame::Absent => self.ingest_absent(&mut triggers),
            DetectorFrame::Pointer { position, pressed } => {
                self.ingest_pointer(*position, *pressed, &mut triggers)
            }
            DetectorFrame::Hand(hand) => self.ingest_hand(hand, now, &mut triggers),
        }
        triggers
    }

    /// Per-frame easing of the point and the expansion level.
    pub fn advance(&mut self) {
        let s = &mut self.state;
        s.point += (self.raw - s.point) * self.config.smoothing;
        s.expansion_level +=
            (self.expansion_target - s.expansion_level) * self.config.expansion_rate;
        s.expansion_level = s.expansion_level.clamp(0.0, 1.0);
    }

    fn ingest_absent(&mut self, triggers: &mut Vec<Trigger>) {
        if self.last_action.is_some() || self.state.mode != InfluenceMode::Neutral {
            debug!("influence source lost, resetting to neutral");
            triggers.push(Trigger::Release);
        }
        self.last_action = None;
        self.was_pressed = false;
        self.palette_cooldown.rearm();
        self.shockwave_cooldown.rearm();

        let s = &mut self.state;
        s.mode = InfluenceMode::Neutral;
        s.expanding = false;
        s.speed_multiplier = 1.0;
        s.time_direction = 1.0;
        s.gesture = Gesture::None;
        if let ExpansionRest::Reset(level) = self.config.expansion_rest {
            self.expansion_target = level;
        }
    }

    fn ingest_pointer(&mut self, position: Vec2, pressed: bool, triggers: &mut Vec<Trigger>) {
        self.raw = self.config.mapping.to_world(position, 0.0, false);
        self.last_action = None;

        let s = &mut self.state;
        s.mode = self.config.table.present_mode;
        s.expanding = false;
        s.speed_multiplier = 1.0;
        s.time_direction = 1.0;
        s.gesture = Gesture::None;

        if pressed && !self.was_pressed {
            if let Some(force) = self.config.pointer_shockwave {
                // Clicks land where the pointer is, not where the smoothed point lags.
                triggers.push(Trigger::Shockwave {
                    origin: self.raw,
                    force,
                });
            }
        }
        self.was_pressed = pressed;
    }

    fn ingest_hand(&mut self, hand: &HandLandmarks, now: Duration, triggers: &mut Vec<Trigger>) {
        let steer = match self.config.steer {
            SteerPoint::IndexTip => hand.index_tip(),
            SteerPoint::PalmCenter => hand.palm_center(),
        };
        self.raw = self.config.mapping.to_world(
            steer.xy(),
            steer.z,
            self.config.mapping.mirror_x,
        );
        self.was_pressed = false;

        let gesture = classify(Some(hand), &self.config.thresholds);
        let table = self.config.table;
        let action = table.action(gesture);
        let previous = self.last_action;

        if previous != Some(action) {
            trace!(%gesture, ?action, "gesture changed");
            self.palette_cooldown.rearm();
            self.shockwave_cooldown.rearm();
        }

        let s = &mut self.state;
        s.gesture = gesture;
        s.mode = table.mode(action);
        s.expanding = matches!(action, GestureAction::Expand | GestureAction::Explode);
        s.speed_multiplier = match action {
            GestureAction::SpeedUp(k) | GestureAction::SlowDown(k) if k > 0.0 => k,
            _ => 1.0,
        };
        s.time_direction = if action == GestureAction::ReverseTime {
            -1.0
        } else {
            1.0
        };

        match action {
            GestureAction::Expand => {
                self.expansion_target = 1.0;
                if previous == Some(GestureAction::Contract) {
                    triggers.push(Trigger::Explode);
                }
            }
            GestureAction::Explode => {
                self.expansion_target = 1.0;
                if previous != Some(GestureAction::Explode) {
                    triggers.push(Trigger::Explode);
                }
            }
            GestureAction::Contract => {
                self.expansion_target = 0.0;
                if previous != Some(GestureAction::Contract) {
                    triggers.push(Trigger::Contract);
                }
            }
            GestureAction::AdvancePalette => {
                if self.palette_cooldown.try_fire(now) {
                    s.palette_index = (s.palette_index + 1) % self.palette_count;
                    triggers.push(Trigger::AdvancePalette(s.palette_index));
                }
            }
            GestureAction::Shockwave { force } => {
                if self.shockwave_cooldown.try_fire(now) {
                    triggers.push(Trigger::Shockwave {
                        origin: s.point,
                        force,
                    });
                }
            }
            GestureAction::Neutral
            | GestureAction::SpeedUp(_)
            | GestureAction::SlowDown(_)
            | GestureAction::ReverseTime => {}
        }

        self.last_action = Some(action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::poses;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn adapter() -> InfluenceAdapter {
        InfluenceAdapter::new(AdapterConfig::default(), 5)
    }

    #[test]
    fn test_smoothing_moves_a_tenth_per_frame() {
        let mut a = adapter();
        let frame = DetectorFrame::Pointer {
            position: Vec2::new(1.0, 0.5),
            pressed: false,
        };
        a.ingest(&frame, ms(0));
        a.advance();
        // Pointer is not mirrored: u = 1 maps to +extent/2 = 20.
        assert!((a.state().point.x - 2.0).abs() < 1e-5);
        a.advance();
        assert!((a.state().point.x - 3.8).abs() < 1e-5);
    }

    #[test]
    fn test_hand_is_mirrored() {
        let mapping = ScreenMapping::default();
        let p = mapping.to_world(Vec2::new(0.0, 0.0), 0.0, true);
        assert_eq!(p, Vec3::new(20.0, 15.0, 0.0));
    }

    #[test]
    fn test_open_hand_repels_and_expands() {
        let mut a = adapter();
        a.ingest(&DetectorFrame::Hand(poses::open_hand()), ms(0));
        let s = a.state();
        assert_eq!(s.gesture, Gesture::OpenHand);
        assert!(s.is_repelling());
        assert!(s.expanding);
        assert_eq!(a.expansion_target(), 1.0);
    }

    #[test]
    fn test_fist_attracts_and_contracts() {
        let mut a = adapter();
        let triggers = a.ingest(&DetectorFrame::Hand(poses::fist()), ms(0));
        assert!(a.state().is_attracting());
        assert!(!a.state().expanding);
        assert_eq!(triggers, vec![Trigger::Contract]);

        // Held: no second contract.
        let triggers = a.ingest(&DetectorFrame::Hand(poses::fist()), ms(16));
        assert!(triggers.is_empty());
    }

    #[test]
    fn test_fist_then_open_explodes() {
        let mut a = adapter();
        a.ingest(&DetectorFrame::Hand(poses::fist()), ms(0));
        let triggers = a.ingest(&DetectorFrame::Hand(poses::open_hand()), ms(16));
        assert_eq!(triggers, vec![Trigger::Explode]);
    }

    #[test]
    fn test_held_peace_advances_once_per_cooldown() {
        let mut a = adapter();
        let peace = DetectorFrame::Hand(poses::peace());
        let mut fired = 0;
        for frame in 0..30u64 {
            // 30 frames at 16 ms = 464 ms, inside one cooldown window.
            fired += a.ingest(&peace, ms(frame * 16)).len();
        }
        assert_eq!(fired, 1);
        assert_eq!(a.state().palette_index, 1);

        let triggers = a.ingest(&peace, ms(500));
        assert_eq!(triggers, vec![Trigger::AdvancePalette(2)]);
    }

    #[test]
    fn test_gesture_change_rearms_cooldown() {
        let mut a = adapter();
        let peace = DetectorFrame::Hand(poses::peace());
        a.ingest(&peace, ms(0));
        a.ingest(&DetectorFrame::Hand(poses::open_hand()), ms(16));
        let triggers = a.ingest(&peace, ms(32));
        assert_eq!(triggers, vec![Trigger::AdvancePalette(2)]);
    }

    #[test]
    fn test_palette_index_wraps() {
        let mut a = InfluenceAdapter::new(AdapterConfig::default(), 2);
        let peace = DetectorFrame::Hand(poses::peace());
        a.ingest(&peace, ms(0));
        a.ingest(&peace, ms(600));
        assert_eq!(a.state().palette_index, 0);
    }

    #[test]
    fn test_speed_gestures() {
        let mut a = adapter();
        a.ingest(&DetectorFrame::Hand(poses::thumbs_up()), ms(0));
        assert_eq!(a.state().speed_multiplier, 3.0);
        a.ingest(&DetectorFrame::Hand(poses::pinch()), ms(16));
        assert_eq!(a.state().speed_multiplier, 0.2);
        a.ingest(&DetectorFrame::Hand(poses::open_hand()), ms(32));
        assert_eq!(a.state().speed_multiplier, 1.0);
    }

    #[test]
    fn test_reverse_time() {
        let config = AdapterConfig {
            table: GestureTable {
                pinch: GestureAction::ReverseTime,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut a = InfluenceAdapter::new(config, 5);
        a.ingest(&DetectorFrame::Hand(poses::pinch()), ms(0));
        assert_eq!(a.state().time_direction, -1.0);
        a.ingest(&DetectorFrame::Absent, ms(16));
        assert_eq!(a.state().time_direction, 1.0);
    }

    #[test]
    fn test_absent_resets_to_neutral() {
        let mut a = adapter();
        a.ingest(&DetectorFrame::Hand(poses::thumbs_up()), ms(0));
        let triggers = a.ingest(&DetectorFrame::Absent, ms(16));
        assert_eq!(triggers, vec![Trigger::Release]);

        let s = a.state();
        assert_eq!(s.mode, InfluenceMode::Neutral);
        assert_eq!(s.speed_multiplier, 1.0);
        assert_eq!(s.gesture, Gesture::None);
        assert_eq!(a.expansion_target(), 0.5);

        // Silence stays silent.
        assert!(a.ingest(&DetectorFrame::Absent, ms(32)).is_empty());
    }

    #[test]
    fn test_keep_rest_holds_expansion_target() {
        let config = AdapterConfig {
            expansion_rest: ExpansionRest::Keep,
            ..Default::default()
        };
        let mut a = InfluenceAdapter::new(config, 5);
        a.ingest(&DetectorFrame::Hand(poses::fist()), ms(0));
        a.ingest(&DetectorFrame::Absent, ms(16));
        assert_eq!(a.expansion_target(), 0.0);
    }

    #[test]
    fn test_expansion_level_eases() {
        let mut a = adapter();
        a.ingest(&DetectorFrame::Hand(poses::open_hand()), ms(0));
        let before = a.state().expansion_level;
        a.advance();
        let after = a.state().expansion_level;
        assert!((after - (before + (1.0 - before) * 0.03)).abs() < 1e-6);
    }

    #[test]
    fn test_pointer_press_is_edge_triggered() {
        let config = AdapterConfig {
            pointer_shockwave: Some(15.0),
            ..Default::default()
        };
        let mut a = InfluenceAdapter::new(config, 5);
        let down = DetectorFrame::Pointer {
            position: Vec2::splat(0.5),
            pressed: true,
        };
        assert_eq!(a.ingest(&down, ms(0)).len(), 1);
        assert!(a.ingest(&down, ms(16)).is_empty());
        assert_eq!(a.state().mode, InfluenceMode::Repel);
    }

    #[test]
    fn test_shockwave_gesture_uses_cooldown() {
        let config = AdapterConfig {
            table: GestureTable {
                peace: GestureAction::Shockwave { force: 25.0 },
                ..Default::default()
            },
            ..Default::default()
        };
        let mut a = InfluenceAdapter::new(config, 5);
        let peace = DetectorFrame::Hand(poses::peace());
        assert_eq!(a.ingest(&peace, ms(0)).len(), 1);
        assert!(a.ingest(&peace, ms(299)).is_empty());
        assert_eq!(a.ingest(&peace, ms(300)).len(), 1);
    }

    #[test]
    fn test_table_serde() {
        let json = serde_json::to_string(&GestureTable::default()).unwrap();
        let back: GestureTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, GestureTable::default());
        assert!(json.contains(r#""thumbs_up":{"speed_up":3.0}"#));
    }
}
