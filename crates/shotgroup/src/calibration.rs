//! Pixel-to-millimeter calibration.
//!
//! The scale is a pixels-per-millimeter factor supplied when an image becomes
//! ready. It is never derived from image content here.

use serde::{Deserialize, Serialize};

/// Pixels-per-millimeter factor the reference scanner setup produces.
pub const DEFAULT_PIXELS_PER_MM: f64 = 4.316_546_762_589_928;

/// Errors raised when constructing a [`Scale`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationError {
    /// The factor is NaN or infinite.
    NonFinite(f64),
    /// The factor is zero or negative.
    NonPositive(f64),
}

impl std::fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFinite(v) => write!(f, "scale must be finite, got {}", v),
            Self::NonPositive(v) => write!(f, "scale must be > 0 px/mm, got {}", v),
        }
    }
}

impl std::error::Error for CalibrationError {}

/// Pixels per millimeter. Always finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Scale(f64);

impl Scale {
    pub fn new(px_per_mm: f64) -> Result<Self, CalibrationError> {
        if !px_per_mm.is_finite() {
            return Err(CalibrationError::NonFinite(px_per_mm));
        }
        if px_per_mm <= 0.0 {
            return Err(CalibrationError::NonPositive(px_per_mm));
        }
        Ok(Self(px_per_mm))
    }

    pub fn px_per_mm(self) -> f64 {
        self.0
    }

    pub fn to_mm(self, pixels: f64) -> f64 {
        pixels_to_mm(pixels, self)
    }

    pub fn to_px(self, mm: f64) -> f64 {
        mm * self.0
    }
}

impl<'de> Deserialize<'de> for Scale {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = f64::deserialize(deserializer)?;
        Scale::new(raw).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<f64> for Scale {
    type Error = CalibrationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Convert a pixel distance to millimeters.
#[inline]
pub fn pixels_to_mm(pixel_distance: f64, scale: Scale) -> f64 {
    pixel_distance / scale.0
}

/// Calibration state reported to presentation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScaleStatus {
    Calibrated { px_per_mm: f64 },
    Uncalibrated,
}

/// Current calibration of the loaded image, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Calibration {
    scale: Option<Scale>,
}

impl Calibration {
    pub fn calibrated(scale: Scale) -> Self {
        Self { scale: Some(scale) }
    }

    pub fn calibrate(&mut self, scale: Scale) {
        tracing::debug!("calibrated at {:.4} px/mm", scale.px_per_mm());
        self.scale = Some(scale);
    }

    pub fn clear(&mut self) {
        if self.scale.take().is_some() {
            tracing::debug!("calibration cleared");
        }
    }

    pub fn scale(&self) -> Option<Scale> {
        self.scale
    }

    pub fn is_calibrated(&self) -> bool {
        self.scale.is_some()
    }

    /// Millimeters for `pixels`, or `None` while uncalibrated.
    pub fn to_mm(&self, pixels: f64) -> Option<f64> {
        self.scale.map(|s| pixels_to_mm(pixels, s))
    }

    pub fn status(&self) -> ScaleStatus {
        match self.scale {
            Some(s) => ScaleStatus::Calibrated {
                px_per_mm: s.px_per_mm(),
            },
            None => ScaleStatus::Uncalibrated,
        }
    }
}
