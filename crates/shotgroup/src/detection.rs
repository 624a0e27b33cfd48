//! Boundary to the external hole detector.
//!
//! Hole detection itself is not implemented here. A detector (typically a
//! Hough-circle transform from a computer-vision library) implements
//! [`HoleDetector`]; the session hands it the current image together with
//! [`HoughParams`] and receives a complete replacement set of circles.
//!
//! Requests are stamped with a [`DetectionTicket`]. Starting a new request
//! supersedes every earlier one, and a response carrying a superseded ticket
//! is discarded.

use serde::{Deserialize, Serialize};

use crate::geometry::Circle;

/// Parameters for a Hough-gradient circle search on a blurred grayscale image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughParams {
    /// Gaussian blur kernel size (pixels, odd).
    pub blur_kernel: u32,
    /// Gaussian blur sigma (pixels).
    pub blur_sigma: f64,
    /// Inverse accumulator resolution ratio.
    pub dp: f64,
    /// Minimum distance between detected centers (pixels).
    pub min_dist_px: f64,
    /// Upper Canny threshold.
    pub canny_threshold: f64,
    /// Accumulator threshold for center votes.
    pub accumulator_threshold: f64,
    /// Smallest hole radius searched (pixels).
    pub min_radius_px: u32,
    /// Largest hole radius searched (pixels).
    pub max_radius_px: u32,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            blur_kernel: 9,
            blur_sigma: 2.0,
            dp: 1.0,
            min_dist_px: 15.0,
            canny_threshold: 100.0,
            accumulator_threshold: 20.0,
            min_radius_px: 5,
            max_radius_px: 25,
        }
    }
}

impl HoughParams {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.blur_kernel == 0 || self.blur_kernel % 2 == 0 {
            return Err("detector.blur_kernel must be odd and >= 1".to_string());
        }
        if !self.blur_sigma.is_finite() || self.blur_sigma < 0.0 {
            return Err("detector.blur_sigma must be finite and >= 0".to_string());
        }
        if !self.dp.is_finite() || self.dp <= 0.0 {
            return Err("detector.dp must be finite and > 0".to_string());
        }
        if !self.min_dist_px.is_finite() || self.min_dist_px <= 0.0 {
            return Err("detector.min_dist_px must be finite and > 0".to_string());
        }
        if self.min_radius_px > self.max_radius_px {
            return Err(format!(
                "detector radius range is empty: min {} > max {}",
                self.min_radius_px, self.max_radius_px
            ));
        }
        Ok(())
    }
}

/// Failure reported by a detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionError {
    /// The detector backend is not loaded yet.
    Unavailable,
    /// The detector ran and failed.
    Failed(String),
}

impl std::fmt::Display for DetectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "hole detector is not available"),
            Self::Failed(msg) => write!(f, "hole detection failed: {}", msg),
        }
    }
}

impl std::error::Error for DetectionError {}

/// Producer of detected holes for an image.
pub trait HoleDetector {
    type Image: ?Sized;

    fn detect(
        &self,
        image: &Self::Image,
        params: &HoughParams,
    ) -> Result<Vec<Circle>, DetectionError>;
}

/// Stamp identifying one detection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DetectionTicket {
    pub generation: u64,
}

/// What happened to a detection response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DetectionOutcome {
    /// The detected set was replaced with `count` circles.
    Applied { count: usize },
    /// The detector failed; the detected set stays empty.
    Failed,
    /// A newer request superseded this one; the response was dropped.
    Stale,
}

/// Issues tickets and tells current requests from superseded ones.
#[derive(Debug, Clone, Default)]
pub struct DetectionTracker {
    generation: u64,
    in_flight: Option<DetectionTicket>,
}

impl DetectionTracker {
    /// Start a request, superseding any request still in flight.
    pub fn begin(&mut self) -> DetectionTicket {
        self.generation += 1;
        let ticket = DetectionTicket {
            generation: self.generation,
        };
        if let Some(prev) = self.in_flight.replace(ticket) {
            tracing::debug!(
                "detection {} superseded by {}",
                prev.generation,
                ticket.generation
            );
        }
        ticket
    }

    /// Close `ticket` if it is the current request. Returns false for stale
    /// or already closed tickets.
    pub fn finish(&mut self, ticket: DetectionTicket) -> bool {
        if self.in_flight == Some(ticket) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    /// Forget any in-flight request so its response is treated as stale.
    pub fn invalidate(&mut self) {
        if let Some(prev) = self.in_flight.take() {
            tracing::debug!("detection {} invalidated", prev.generation);
        }
    }

    pub fn in_flight(&self) -> Option<DetectionTicket> {
        self.in_flight
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }
}
