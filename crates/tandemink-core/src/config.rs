//! Tunable behavior of the board, loadable from JSON.

use crate::inertia::{DEFAULT_DECAY, DEFAULT_EPSILON};
use crate::model::Brush;
use crate::viewport::{MAX_SCALE, MIN_SCALE, WHEEL_ZOOM_IN, WHEEL_ZOOM_OUT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Board configuration. Every field falls back to its default when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    pub wheel_zoom_in: f64,
    pub wheel_zoom_out: f64,
    /// Per-tick velocity multiplier while gliding.
    pub inertia_decay: f64,
    /// Glide stops once both velocity components fall below this.
    pub inertia_epsilon: f64,
    /// Minimum release velocity (px/tick, either axis) to glide after a pinch.
    pub pinch_inertia_threshold: f64,
    /// Minimum release velocity (px/tick, either axis) to glide after a mouse pan.
    pub pan_inertia_threshold: f64,
    /// Hold time before a still press becomes a create request.
    pub long_press_ms: u64,
    /// Movement in screen pixels that cancels a pending long press.
    pub long_press_jitter: f64,
    /// Grab radius around objects, in screen pixels.
    pub hit_radius: f64,
    /// Frame duration that pinch velocity is normalized against.
    pub reference_frame_ms: f64,
    /// Brush applied to new local content.
    pub brush: Brush,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            wheel_zoom_in: WHEEL_ZOOM_IN,
            wheel_zoom_out: WHEEL_ZOOM_OUT,
            inertia_decay: DEFAULT_DECAY,
            inertia_epsilon: DEFAULT_EPSILON,
            pinch_inertia_threshold: 0.2,
            pan_inertia_threshold: 1.0,
            long_press_ms: 500,
            long_press_jitter: 6.0,
            hit_radius: 24.0,
            reference_frame_ms: 16.67,
            brush: Brush::default(),
        }
    }
}

impl BoardConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&text)?;
        log::info!("Loaded board config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    /// Reject values that would break the viewport or inertia invariants.
    ///
    /// NaN fails every check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(positive(self.min_scale) && positive(self.max_scale) && self.min_scale <= self.max_scale) {
            return Err(ConfigError::Invalid {
                field: "min_scale",
                reason: format!("need 0 < min_scale <= max_scale, got {} and {}", self.min_scale, self.max_scale),
            });
        }
        if !(positive(self.inertia_decay) && self.inertia_decay < 1.0) {
            return Err(ConfigError::Invalid {
                field: "inertia_decay",
                reason: format!("must be in (0, 1), got {}", self.inertia_decay),
            });
        }
        let positives = [
            ("inertia_epsilon", self.inertia_epsilon),
            ("reference_frame_ms", self.reference_frame_ms),
            ("wheel_zoom_in", self.wheel_zoom_in),
            ("wheel_zoom_out", self.wheel_zoom_out),
        ];
        for (field, value) in positives {
            if !positive(value) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be positive, got {value}"),
                });
            }
        }
        let non_negatives = [
            ("pinch_inertia_threshold", self.pinch_inertia_threshold),
            ("pan_inertia_threshold", self.pan_inertia_threshold),
            ("long_press_jitter", self.long_press_jitter),
            ("hit_radius", self.hit_radius),
        ];
        for (field, value) in non_negatives {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be zero or more, got {value}"),
                });
            }
        }
        Ok(())
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RgbColor;
    use std::io::Write;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = BoardConfig::from_json(r##"{"max_scale": 8.0, "brush": {"color": "#ff0000"}}"##).unwrap();
        assert!((config.max_scale - 8.0).abs() < f64::EPSILON);
        assert!((config.min_scale - MIN_SCALE).abs() < f64::EPSILON);
        assert_eq!(config.brush.color, RgbColor::new(255, 0, 0));
        assert!((config.brush.size - 3.0).abs() < f64::EPSILON);
        assert_eq!(config.long_press(), Duration::from_millis(500));
    }

    #[test]
    fn test_rejects_bad_decay() {
        let err = BoardConfig::from_json(r#"{"inertia_decay": 1.5}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "inertia_decay", .. }));
    }

    #[test]
    fn test_rejects_inverted_scale_bounds() {
        let err = BoardConfig::from_json(r#"{"min_scale": 3.0, "max_scale": 2.0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "min_scale", .. }));
    }

    #[test]
    fn test_rejects_nan_and_non_positive_values() {
        let nan_scale = BoardConfig { min_scale: f64::NAN, ..BoardConfig::default() };
        assert!(matches!(nan_scale.validate(), Err(ConfigError::Invalid { field: "min_scale", .. })));

        let nan_epsilon = BoardConfig { inertia_epsilon: f64::NAN, ..BoardConfig::default() };
        assert!(matches!(nan_epsilon.validate(), Err(ConfigError::Invalid { field: "inertia_epsilon", .. })));

        let err = BoardConfig::from_json(r#"{"wheel_zoom_out": 0.0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "wheel_zoom_out", .. }));

        assert!(BoardConfig::default().validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"long_press_ms": 650, "hit_radius": 30.0}}"#).unwrap();

        let config = BoardConfig::load(file.path()).unwrap();
        assert_eq!(config.long_press_ms, 650);
        assert!((config.hit_radius - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = BoardConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
