//! Error types for gestura.
//!
//! Only configuration-time mistakes are errors. Degenerate geometry and a
//! silent or missing detector are expected runtime conditions and are handled
//! in place by the simulation instead of surfacing here.

use thiserror::Error;

/// Errors raised when parsing a name into one of the fixed library sets.
///
/// These can only come from caller input (config files, CLI arguments), never
/// from live sensor data, so callers are expected to reject them up front.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Template name not in the shape library.
    #[error("Unknown shape template '{0}'")]
    UnknownTemplate(String),

    /// Gesture name not in the gesture set.
    #[error("Unknown gesture '{0}'")]
    UnknownGesture(String),

    /// Palette name not in the palette library.
    #[error("Unknown palette '{0}'")]
    UnknownPalette(String),

    /// Preset name not in the preset list.
    #[error("Unknown preset '{0}'")]
    UnknownPreset(String),
}

/// Errors that can occur while loading, saving or validating a [`SimConfig`](crate::SimConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read or write the config file.
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file was not valid config JSON.
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A value was outside its permitted range.
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field (e.g. `integrator.friction`)
        field: &'static str,
        /// What the field must satisfy
        reason: String,
    },

    /// A name inside the config did not resolve.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors that can occur when setting up a simulation.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// Configuration was rejected.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A named template, gesture, palette or preset was not recognised.
    #[error(transparent)]
    Parse(#[from] ParseError),
}
