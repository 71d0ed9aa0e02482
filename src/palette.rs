//! Colour palettes for particle display attributes.
//!
//! A palette is a short list of colours; each particle picks one at creation
//! or when the palette changes. Gesture input advances through a
//! [`PaletteCycle`].

use crate::error::ParseError;
use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named colour palettes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Palette {
    /// Purples and pinks with white highlights.
    #[default]
    Galaxy,
    /// Blues and cyans.
    Ocean,
    /// Warm reds and oranges.
    Ember,
    /// Greens and teals.
    Lagoon,
    /// Golds and yellows.
    Gold,
    /// Red through yellow.
    Fire,
    /// Teal, sky blue and mint.
    Tide,
    /// Lavender, blue, amber and pink.
    Cosmic,
    /// Crimson, coral and orange.
    Sunset,
    /// Cyan, blue and deep violet.
    Nebula,
    /// Pastel pinks and creams.
    CottonCandy,
    /// Fourteen purple, indigo, blue and pink tints.
    Drift,
}

impl Palette {
    pub const ALL: [Palette; 12] = [
        Palette::Galaxy,
        Palette::Ocean,
        Palette::Ember,
        Palette::Lagoon,
        Palette::Gold,
        Palette::Fire,
        Palette::Tide,
        Palette::Cosmic,
        Palette::Sunset,
        Palette::Nebula,
        Palette::CottonCandy,
        Palette::Drift,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Palette::Galaxy => "galaxy",
            Palette::Ocean => "ocean",
            Palette::Ember => "ember",
            Palette::Lagoon => "lagoon",
            Palette::Gold => "gold",
            Palette::Fire => "fire",
            Palette::Tide => "tide",
            Palette::Cosmic => "cosmic",
            Palette::Sunset => "sunset",
            Palette::Nebula => "nebula",
            Palette::CottonCandy => "cotton_candy",
            Palette::Drift => "drift",
        }
    }

    /// Colour stops as packed `0xRRGGBB`.
    pub fn hex(&self) -> &'static [u32] {
        match self {
            Palette::Galaxy => &[0x8B5CF6, 0xEC4899, 0x6366F1, 0xA78BFA, 0xFFFFFF],
            Palette::Ocean => &[0x3B82F6, 0x60A5FA, 0x00CEC9, 0x81ECEC, 0xFFFFFF],
            Palette::Ember => &[0xFD6B6B, 0xEE5A5A, 0xFD8E8E, 0xFCCB6E, 0xFFFFFF],
            Palette::Lagoon => &[0x55EFC4, 0x00B894, 0x00CEC9, 0x81ECEC, 0xFFFFFF],
            Palette::Gold => &[0xFDE6A7, 0xFCCB6E, 0xF39C12, 0xE17055, 0xFFFFFF],
            Palette::Fire => &[0xFF6B6B, 0xFF8E53, 0xFFCD56, 0xFFE66D, 0xFFFFFF],
            Palette::Tide => &[0x4ECDC4, 0x45B7D1, 0x96E6A1, 0x87CEEB, 0xFFFFFF],
            Palette::Cosmic => &[0xBB8FCE, 0x85C1E9, 0xF8B500, 0xFF69B4, 0xFFFFFF],
            Palette::Sunset => &[0xFF4757, 0xFF6B81, 0xFFA502, 0xFFCD56, 0xFFFFFF],
            Palette::Nebula => &[0x00D2D3, 0x54A0FF, 0x5F27CD, 0x9B59B6, 0xFFFFFF],
            Palette::CottonCandy => &[0xF368E0, 0xFF9FF3, 0xFFEAA7, 0xDFE6E9, 0xFFFFFF],
            Palette::Drift => &[
                0x8B5CF6, 0xA78BFA, 0xC4B5FD, // purples
                0x6366F1, 0x818CF8, 0xA5B4FC, // indigos
                0x3B82F6, 0x60A5FA, 0x93C5FD, // blues
                0xEC4899, 0xF472B6, 0xF9A8D4, // pinks
                0xFFFFFF, 0xE0E7FF,
            ],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.hex().len()
    }

    /// Colour `index`, wrapping around the palette.
    pub fn color(&self, index: usize) -> Vec3 {
        let stops = self.hex();
        unpack(stops[index % stops.len()])
    }

    /// A uniformly chosen colour.
    pub fn random_color<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        self.color(rng.gen_range(0..self.len()))
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Palette {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Palette::ALL
            .iter()
            .copied()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| ParseError::UnknownPalette(s.to_string()))
    }
}

#[inline]
fn unpack(rgb: u32) -> Vec3 {
    Vec3::new(
        ((rgb >> 16) & 0xFF) as f32 / 255.0,
        ((rgb >> 8) & 0xFF) as f32 / 255.0,
        (rgb & 0xFF) as f32 / 255.0,
    )
}

/// An ordered ring of palettes with a current position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaletteCycle {
    palettes: Vec<Palette>,
    #[serde(default)]
    index: usize,
}

impl PaletteCycle {
    /// Create a cycle. An empty list falls back to the default palette.
    pub fn new(palettes: Vec<Palette>) -> Self {
        let palettes = if palettes.is_empty() {
            vec![Palette::default()]
        } else {
            palettes
        };
        Self { palettes, index: 0 }
    }

    pub fn current(&self) -> Palette {
        self.palettes[self.index % self.palettes.len()]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.palettes.len()
    }

    /// Step to the next palette, wrapping. Returns the new palette.
    pub fn advance(&mut self) -> Palette {
        self.index = (self.index + 1) % self.palettes.len();
        self.current()
    }
}

impl Default for PaletteCycle {
    fn default() -> Self {
        Self::new(vec![
            Palette::Galaxy,
            Palette::Ocean,
            Palette::Ember,
            Palette::Lagoon,
            Palette::Gold,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack_white_and_black() {
        assert_eq!(unpack(0xFFFFFF), Vec3::ONE);
        assert_eq!(unpack(0x000000), Vec3::ZERO);
    }

    #[test]
    fn test_color_wraps() {
        let p = Palette::Galaxy;
        assert_eq!(p.color(0), p.color(p.len()));
    }

    #[test]
    fn test_cycle_wraps_to_start() {
        let mut cycle = PaletteCycle::default();
        let first = cycle.current();
        for _ in 0..cycle.len() {
            cycle.advance();
        }
        assert_eq!(cycle.current(), first);
        assert_eq!(cycle.index(), 0);
    }

    #[test]
    fn test_empty_cycle_has_fallback() {
        let cycle = PaletteCycle::new(Vec::new());
        assert_eq!(cycle.current(), Palette::Galaxy);
    }

    #[test]
    fn test_names_round_trip() {
        for p in Palette::ALL {
            assert_eq!(p.name().parse::<Palette>(), Ok(p));
        }
        assert!("mauve".parse::<Palette>().is_err());
    }
}
