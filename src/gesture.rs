//! Hand landmarks and the gesture classifier.
//!
//! The detector reports 21 hand-skeleton points in normalized image space
//! (`x`, `y` in `[0, 1]`, `y` growing downward). [`classify`] turns one such
//! set into a [`Gesture`] using finger-extension tests and a pinch distance.
//! It is a pure function; debouncing lives in the
//! [`InfluenceAdapter`](crate::influence::InfluenceAdapter).

use crate::error::ParseError;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of points in a hand skeleton.
pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_TIP: usize = 20;

/// A single detector point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    /// Relative depth; zero when the detector only reports 2D.
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    #[inline]
    pub fn xy(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn to_vec3(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// A complete hand skeleton, always exactly [`LANDMARK_COUNT`] points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandLandmarks([Landmark; LANDMARK_COUNT]);

impl HandLandmarks {
    pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Self {
        Self(points)
    }

    /// Build from detector output. Returns `None` unless there are exactly 21 points.
    pub fn from_slice(points: &[Landmark]) -> Option<Self> {
        let points: [Landmark; LANDMARK_COUNT] = points.try_into().ok()?;
        Some(Self(points))
    }

    #[inline]
    pub fn get(&self, index: usize) -> Landmark {
        self.0[index]
    }

    pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.0
    }

    /// Index fingertip, the point most demos steer with.
    #[inline]
    pub fn index_tip(&self) -> Landmark {
        self.0[INDEX_TIP]
    }

    /// Base of the middle finger, a stable palm-centre proxy.
    #[inline]
    pub fn palm_center(&self) -> Landmark {
        self.0[MIDDLE_MCP]
    }
}

/// Recognized hand gestures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gesture {
    /// No hand in frame.
    #[default]
    None,
    /// A hand is present but matches no pattern.
    Unknown,
    OpenHand,
    Fist,
    Peace,
    ThumbsUp,
    Pinch,
}

impl Gesture {
    pub const ALL: [Gesture; 7] = [
        Gesture::None,
        Gesture::Unknown,
        Gesture::OpenHand,
        Gesture::Fist,
        Gesture::Peace,
        Gesture::ThumbsUp,
        Gesture::Pinch,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Gesture::None => "none",
            Gesture::Unknown => "unknown",
            Gesture::OpenHand => "open_hand",
            Gesture::Fist => "fist",
            Gesture::Peace => "peace",
            Gesture::ThumbsUp => "thumbs_up",
            Gesture::Pinch => "pinch",
        }
    }

    /// `true` for the five named patterns.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Gesture::None | Gesture::Unknown)
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Gesture {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Gesture::ALL
            .iter()
            .copied()
            .find(|g| g.name() == wanted)
            .ok_or_else(|| ParseError::UnknownGesture(s.to_string()))
    }
}

/// Geometric thresholds, in normalized image units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifierThresholds {
    /// How far a fingertip must sit above its base joint to count as extended.
    pub extension_margin: f32,
    /// How far the thumb tip must sit above the thumb base to count as "up".
    pub thumb_margin: f32,
    /// Thumb-tip to index-tip distance below which the hand is pinching.
    pub pinch_distance: f32,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            extension_margin: 0.05,
            thumb_margin: 0.05,
            pinch_distance: 0.08,
        }
    }
}

/// Per-finger extension booleans.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FingerState {
    pub thumb_up: bool,
    pub index: bool,
    pub middle: bool,
    pub ring: bool,
    pub pinky: bool,
}

impl FingerState {
    /// Evaluate which fingers are extended.
    ///
    /// The four fingers extend vertically; the thumb is tested against its own
    /// base joint since it folds across the palm rather than toward it.
    pub fn measure(hand: &HandLandmarks, thresholds: &ClassifierThresholds) -> Self {
        let extended = |tip: usize, base: usize| {
            hand.get(tip).y < hand.get(base).y - thresholds.extension_margin
        };

        Self {
            thumb_up: hand.get(THUMB_TIP).y < hand.get(THUMB_MCP).y - thresholds.thumb_margin,
            index: extended(INDEX_TIP, INDEX_MCP),
            middle: extended(MIDDLE_TIP, MIDDLE_MCP),
            ring: extended(RING_TIP, RING_MCP),
            pinky: extended(PINKY_TIP, PINKY_MCP),
        }
    }

    pub fn all_fingers_extended(&self) -> bool {
        self.index && self.middle && self.ring && self.pinky
    }

    pub fn all_fingers_curled(&self) -> bool {
        !self.index && !self.middle && !self.ring && !self.pinky
    }

    /// Number of extended non-thumb fingers.
    pub fn extended_count(&self) -> usize {
        [self.index, self.middle, self.ring, self.pinky]
            .iter()
            .filter(|e| **e)
            .count()
    }
}

/// Classify a hand. `None` means no hand in frame.
///
/// Patterns are checked most-specific first and the first match wins:
/// thumbs-up, pinch, open hand, fist, peace.
pub fn classify(hand: Option<&HandLandmarks>, thresholds: &ClassifierThresholds) -> Gesture {
    let Some(hand) = hand else {
        return Gesture::None;
    };

    let fingers = FingerState::measure(hand, thresholds);
    let pinch = hand.get(THUMB_TIP).xy().distance(hand.get(INDEX_TIP).xy());

    if fingers.thumb_up && fingers.all_fingers_curled() {
        Gesture::ThumbsUp
    } else if pinch < thresholds.pinch_distance {
        Gesture::Pinch
    } else if fingers.all_fingers_extended() {
        Gesture::OpenHand
    } else if fingers.all_fingers_curled() {
        Gesture::Fist
    } else if fingers.index && fingers.middle && !fingers.ring && !fingers.pinky {
        Gesture::Peace
    } else {
        Gesture::Unknown
    }
}

/// Canonical hand poses, shared by the unit and integration tests.
#[doc(hidden)]
pub mod poses {
    use super::*;

    /// Build a right hand facing the camera. `up[f]` extends finger `f`
    /// (0 = thumb, 1..=4 = index..pinky).
    pub fn hand(up: [bool; 5]) -> HandLandmarks {
        let mut pts = [Landmark::new(0.5, 0.5); LANDMARK_COUNT];
        pts[WRIST] = Landmark::new(0.5, 0.85);

        // Thumb: 1..=4, base low on the side of the palm.
        pts[1] = Landmark::new(0.40, 0.78);
        pts[THUMB_MCP] = Landmark::new(0.35, 0.72);
        if up[0] {
            pts[THUMB_IP] = Landmark::new(0.34, 0.62);
            pts[THUMB_TIP] = Landmark::new(0.34, 0.52);
        } else {
            pts[THUMB_IP] = Landmark::new(0.33, 0.70);
            pts[THUMB_TIP] = Landmark::new(0.30, 0.72);
        }

        let columns = [0.42, 0.50, 0.58, 0.66];
        for (finger, x) in columns.iter().enumerate() {
            let base = INDEX_MCP + finger * 4;
            pts[base] = Landmark::new(*x, 0.60);
            if up[finger + 1] {
                pts[base + 1] = Landmark::new(*x, 0.48);
                pts[base + 2] = Landmark::new(*x, 0.38);
                pts[base + 3] = Landmark::new(*x, 0.28);
            } else {
                pts[base + 1] = Landmark::new(*x, 0.66);
                pts[base + 2] = Landmark::new(*x, 0.68);
                pts[base + 3] = Landmark::new(*x, 0.64);
            }
        }
        HandLandmarks::new(pts)
    }

    pub fn open_hand() -> HandLandmarks {
        hand([true, true, true, true, true])
    }

    pub fn fist() -> HandLandmarks {
        hand([false, false, false, false, false])
    }

    pub fn peace() -> HandLandmarks {
        hand([false, true, true, false, false])
    }

    pub fn thumbs_up() -> HandLandmarks {
        hand([true, false, false, false, false])
    }

    /// Index finger half-raised with its tip touching the thumb tip.
    pub fn pinch() -> HandLandmarks {
        let mut h = hand([false, true, false, false, false]);
        h.0[THUMB_TIP] = Landmark::new(0.42, 0.50);
        h.0[INDEX_TIP] = Landmark::new(0.44, 0.49);
        h
    }
}
