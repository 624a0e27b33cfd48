//! shotgroup: shot-hole bookkeeping and group statistics for scanned
//! shooting targets.
//!
//! An external detector finds bullet holes as circles in image pixels. This
//! crate keeps track of those circles together with manually placed ones,
//! interprets clicks according to the active [`Mode`], and reports group
//! statistics in millimeters:
//!
//! 1. **Geometry** – point/circle distances, hit testing, bounds.
//! 2. **Calibration** – pixels-per-millimeter [`Scale`] and conversion.
//! 3. **Shots** – detected ∪ manual circles with stable [`ShotId`]s and the
//!    ordered [`Selection`].
//! 4. **Stats** – centroid, per-axis standard deviation, mean radius,
//!    extreme spread, pair distance.
//! 5. **Session** – the mode state machine, detection request tracking and
//!    user notices.
//!
//! # Public API
//! - [`Session`] is the entry point: feed it events, read [`Analysis`] back.
//! - [`HoleDetector`] is the seam for the circle detector.
//! - [`Snapshot`] and [`ResultSummary`] are ready-made presentation views.
//!
//! Image decoding, rendering and the detector implementation live outside
//! this crate.

pub mod calibration;
pub mod config;
pub mod detection;
pub mod geometry;
pub mod mode;
pub mod report;
pub mod session;
pub mod shots;
pub mod stats;

pub use calibration::{pixels_to_mm, Calibration, CalibrationError, Scale, ScaleStatus};
pub use config::{AnalyzerConfig, ConfigError};
pub use detection::{
    DetectionError, DetectionOutcome, DetectionTicket, HoleDetector, HoughParams,
};
pub use geometry::{distance, within_circle, Bounds, Circle, Point};
pub use mode::Mode;
pub use report::{edge_distance_mm, ResultSummary, Snapshot};
pub use session::{Analysis, Applied, ClickOutcome, Event, Notice, NoticeKind, Session};
pub use shots::{SelectOutcome, Selection, Shot, ShotId, ShotOrigin, ShotSet};
pub use stats::{
    extreme_spread_px, group_metrics, pair_distance, AxisPair, GroupMetrics, GroupStatsPx,
    Measurement, PairDistance,
};
