//! Canvas session configuration.
//!
//! # Responsibility
//! - Hold tunable constants for history, navigation timing, layout and
//!   footprint estimation.
//! - Parse partial JSON overrides and validate the result.
//!
//! # Invariants
//! - Every field has a default; a `{}` document yields `CanvasConfig::default()`.
//! - Ranges are half-open `[min, max)` and must satisfy `min < max`.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Bounded history depth for undo and redo.
pub const DEFAULT_UNDO_CAPACITY: usize = 50;
/// Minimum gap between neighbors along a hub layout axis.
pub const DEFAULT_MIN_GAP: f64 = 22.0;
/// Maximum displacement of one entry per hub layout pass.
pub const DEFAULT_MAX_MOVEMENT: f64 = 120.0;
/// Trailing debounce window for drag position saves.
pub const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 500;
/// Delay between a layout request and its batched commit.
pub const DEFAULT_LAYOUT_COMMIT_DELAY_MS: u64 = 950;

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Document is not valid JSON for this shape.
    Parse(serde_json::Error),
    /// A field holds a value outside its allowed domain.
    InvalidValue { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid canvas config: {err}"),
            Self::InvalidValue { field, reason } => {
                write!(f, "invalid canvas config field `{field}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Constants for estimating entry footprints from text.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct FootprintMetrics {
    /// Width of one character of text.
    pub char_width: f64,
    /// Height of one text line.
    pub line_height: f64,
    /// Horizontal padding added on both sides of text.
    pub text_padding: f64,
    pub media_width: f64,
    pub media_height: f64,
}

impl Default for FootprintMetrics {
    fn default() -> Self {
        Self {
            char_width: 8.5,
            line_height: 22.0,
            text_padding: 8.0,
            media_width: 180.0,
            media_height: 180.0,
        }
    }
}

/// Canvas-wide settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Workspace owner handle, first address segment and first breadcrumb.
    pub owner_name: String,
    pub undo_capacity: usize,
    pub min_gap: f64,
    pub max_movement: f64,
    pub jitter_min: f64,
    pub jitter_max: f64,
    pub save_debounce_ms: u64,
    /// Window during which further navigation requests are dropped.
    pub navigation_transition_ms: u64,
    /// Window after a transition during which editor placement is suppressed.
    pub navigation_cooldown_ms: u64,
    pub layout_commit_delay_ms: u64,
    pub animation_min_ms: u64,
    pub animation_max_ms: u64,
    pub footprint: FootprintMetrics,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            owner_name: "me".to_string(),
            undo_capacity: DEFAULT_UNDO_CAPACITY,
            min_gap: DEFAULT_MIN_GAP,
            max_movement: DEFAULT_MAX_MOVEMENT,
            jitter_min: 8.0,
            jitter_max: 14.0,
            save_debounce_ms: DEFAULT_SAVE_DEBOUNCE_MS,
            navigation_transition_ms: 600,
            navigation_cooldown_ms: 300,
            layout_commit_delay_ms: DEFAULT_LAYOUT_COMMIT_DELAY_MS,
            animation_min_ms: 700,
            animation_max_ms: 900,
            footprint: FootprintMetrics::default(),
        }
    }
}

impl CanvasConfig {
    /// Parses a JSON document of overrides on top of defaults, then validates.
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_owner(mut self, owner_name: impl Into<String>) -> Self {
        self.owner_name = owner_name.into();
        self
    }

    /// Checks value domains.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owner_name.trim().is_empty() || self.owner_name.contains('/') {
            return Err(invalid("owner_name", "must be non-blank and contain no `/`"));
        }
        if self.undo_capacity == 0 {
            return Err(invalid("undo_capacity", "must be at least 1"));
        }
        require_non_negative("min_gap", self.min_gap)?;
        require_non_negative("max_movement", self.max_movement)?;
        require_non_negative("jitter_min", self.jitter_min)?;
        if !self.jitter_max.is_finite() || self.jitter_max <= self.jitter_min {
            return Err(invalid("jitter_max", "must be greater than jitter_min"));
        }
        if self.animation_min_ms >= self.animation_max_ms {
            return Err(invalid(
                "animation_max_ms",
                "must be greater than animation_min_ms",
            ));
        }
        if self.layout_commit_delay_ms < self.animation_max_ms {
            return Err(invalid(
                "layout_commit_delay_ms",
                "must not be shorter than animation_max_ms",
            ));
        }
        for (field, value) in [
            ("footprint.char_width", self.footprint.char_width),
            ("footprint.line_height", self.footprint.line_height),
            ("footprint.media_width", self.footprint.media_width),
            ("footprint.media_height", self.footprint.media_height),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(field, "must be a positive number"));
            }
        }
        require_non_negative("footprint.text_padding", self.footprint.text_padding)?;
        Ok(())
    }
}

fn require_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a finite non-negative number"))
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}
