//! Ruler and snapping configuration.

use crate::angle::AngleConstraint;
use crate::ruler::Ruler;
use kurbo::Vec2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings shared by all rulers of a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulerConfig {
    /// Snap tolerance in screen pixels.
    pub snap_range_px: f64,
    /// Snap to layout objects.
    pub obj_snap: bool,
    /// Snap to the grid.
    pub grid_snap: bool,
    /// Grid pitch in microns. Zero disables the grid.
    pub grid: f64,
    /// Constraint used when neither modifiers nor the ruler template pick one.
    pub default_angle_constraint: AngleConstraint,
    /// Maximum number of rulers. Negative means unlimited.
    pub max_rulers: i32,
    /// How far the search range may grow when retrying a snap, as a
    /// multiple of the initial range.
    pub max_range_factor: f64,
    /// Default main label format.
    pub label_format: String,
    pub label_format_x: String,
    pub label_format_y: String,
    /// Decimal places of measurement labels.
    pub label_precision: usize,
}

impl Default for RulerConfig {
    fn default() -> Self {
        Self {
            snap_range_px: 8.0,
            obj_snap: true,
            grid_snap: true,
            grid: 0.0,
            default_angle_constraint: AngleConstraint::Any,
            max_rulers: -1,
            max_range_factor: 1000.0,
            label_format: "$D".to_string(),
            label_format_x: "$X".to_string(),
            label_format_y: "$Y".to_string(),
            label_precision: 3,
        }
    }
}

impl RulerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Serialization(e.to_string()))?;
        config.check()?;
        Ok(config.validated())
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialization(e.to_string()))
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Write the configuration to a file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        self.check()?;
        let json = self.to_json()?;
        fs::write(path, json)
            .map_err(|e| ConfigError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }

    /// Reject values that cannot be clamped into a usable range.
    pub fn check(&self) -> ConfigResult<()> {
        let numbers = [
            ("snap_range_px", self.snap_range_px),
            ("grid", self.grid),
            ("max_range_factor", self.max_range_factor),
        ];
        match numbers.iter().find(|(_, v)| !v.is_finite()) {
            Some((name, v)) => Err(ConfigError::Invalid(format!("{name} must be finite, got {v}"))),
            None => Ok(()),
        }
    }

    /// Clamp out-of-range values, logging each correction.
    pub fn validated(mut self) -> Self {
        fn clamp_min(name: &str, value: &mut f64, min: f64) {
            if *value < min {
                log::warn!("Config: {name} = {value} is below {min}, clamped");
                *value = min;
            }
        }
        clamp_min("snap_range_px", &mut self.snap_range_px, 0.0);
        clamp_min("grid", &mut self.grid, 0.0);
        clamp_min("max_range_factor", &mut self.max_range_factor, 1.0);
        self
    }

    /// Grid vector for snapping, zero when grid snapping is off.
    pub fn grid_vector(&self) -> Vec2 {
        if self.grid_snap {
            Vec2::new(self.grid, self.grid)
        } else {
            Vec2::ZERO
        }
    }

    /// Ruler limit, `None` for unlimited.
    pub fn ruler_limit(&self) -> Option<usize> {
        usize::try_from(self.max_rulers).ok()
    }

    /// A ruler template carrying the configured label formats.
    pub fn ruler_template(&self) -> Ruler {
        let mut ruler = Ruler::default();
        ruler.fmt = self.label_format.clone();
        ruler.fmt_x = self.label_format_x.clone();
        ruler.fmt_y = self.label_format_y.clone();
        ruler.precision = self.label_precision;
        ruler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = RulerConfig::default();
        assert_eq!(config.snap_range_px, 8.0);
        assert_eq!(config.ruler_limit(), None);
        assert_eq!(config.grid_vector(), Vec2::ZERO);
        assert_eq!(config.ruler_template().fmt, "$D");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = RulerConfig::from_json(r#"{ "grid": 0.005, "max_rulers": 3 }"#).unwrap();
        assert_eq!(config.grid_vector(), Vec2::new(0.005, 0.005));
        assert_eq!(config.ruler_limit(), Some(3));
        assert_eq!(config.max_range_factor, 1000.0);
        assert!(config.obj_snap);
    }

    #[test]
    fn test_grid_snap_off() {
        let config = RulerConfig {
            grid: 0.1,
            grid_snap: false,
            ..RulerConfig::default()
        };
        assert_eq!(config.grid_vector(), Vec2::ZERO);
    }

    #[test]
    fn test_validated_clamps() {
        let json = r#"{ "snap_range_px": -4.0, "max_range_factor": 0.0 }"#;
        let config = RulerConfig::from_json(json).unwrap();
        assert_eq!(config.snap_range_px, 0.0);
        assert_eq!(config.max_range_factor, 1.0);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            RulerConfig::from_json("{ not json"),
            Err(ConfigError::Serialization(_))
        ));
        assert!(matches!(
            RulerConfig::from_json(r#"{ "default_angle_constraint": "Sideways" }"#),
            Err(ConfigError::Serialization(_))
        ));
    }

    #[test]
    fn test_non_finite_rejected() {
        let config = RulerConfig {
            grid: f64::NAN,
            ..RulerConfig::default()
        };
        assert!(matches!(config.check(), Err(ConfigError::Invalid(_))));
        let dir = tempdir().unwrap();
        assert!(config.save(&dir.path().join("rulers.json")).is_err());
    }

    #[test]
    fn test_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rulers.json");
        let config = RulerConfig {
            default_angle_constraint: AngleConstraint::Ortho,
            label_format: "$D um".to_string(),
            ..RulerConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(RulerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            RulerConfig::load(&dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
