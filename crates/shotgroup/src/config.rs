//! Analyzer configuration.
//!
//! Every field has a default, so a JSON file only needs the values it
//! overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::calibration::{Scale, DEFAULT_PIXELS_PER_MM};
use crate::detection::HoughParams;
use crate::geometry::DEFAULT_HIT_TOLERANCE_PX;
use crate::mode::Mode;
use crate::shots::DEFAULT_MANUAL_RADIUS_PX;

/// Nominal bullet diameter (mm) used for edge-to-edge distances (5.56 mm).
pub const DEFAULT_BULLET_DIAMETER_MM: f64 = 5.56;

/// Configuration validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid analyzer config: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    /// Scale applied when an image becomes ready without an explicit one.
    pub pixels_per_mm: f64,
    /// Margin (pixels) added to each circle's radius for click hit tests.
    pub hit_tolerance_px: f64,
    /// Radius (pixels) of a manual shot when no other shot exists.
    pub default_manual_radius_px: f64,
    /// Bullet diameter (mm) subtracted from center distances for edge distance.
    pub bullet_diameter_mm: f64,
    /// Mode a fresh session starts in.
    pub initial_mode: Mode,
    /// Parameters forwarded to the hole detector.
    pub detector: HoughParams,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            pixels_per_mm: DEFAULT_PIXELS_PER_MM,
            hit_tolerance_px: DEFAULT_HIT_TOLERANCE_PX,
            default_manual_radius_px: DEFAULT_MANUAL_RADIUS_PX,
            bullet_diameter_mm: DEFAULT_BULLET_DIAMETER_MM,
            initial_mode: Mode::Edit,
            detector: HoughParams::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Load and validate a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Scale::new(self.pixels_per_mm)
            .map_err(|e| ConfigError(format!("pixels_per_mm: {}", e)))?;

        if !self.hit_tolerance_px.is_finite() || self.hit_tolerance_px < 0.0 {
            return Err(ConfigError(
                "hit_tolerance_px must be finite and >= 0".to_string(),
            ));
        }
        if !self.default_manual_radius_px.is_finite() || self.default_manual_radius_px <= 0.0 {
            return Err(ConfigError(
                "default_manual_radius_px must be finite and > 0".to_string(),
            ));
        }
        if !self.bullet_diameter_mm.is_finite() || self.bullet_diameter_mm < 0.0 {
            return Err(ConfigError(
                "bullet_diameter_mm must be finite and >= 0".to_string(),
            ));
        }
        self.detector.validate().map_err(ConfigError)
    }

    /// The configured default scale.
    pub fn default_scale(&self) -> Result<Scale, ConfigError> {
        Scale::new(self.pixels_per_mm).map_err(|e| ConfigError(format!("pixels_per_mm: {}", e)))
    }
}
