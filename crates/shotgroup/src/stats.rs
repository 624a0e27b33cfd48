//! Group statistics over a set of shot centers.
//!
//! All math runs in pixel space; conversion to millimeters happens once at
//! the output boundary. Nothing is cached: callers recompute from the current
//! point set whenever shots, selection, mode or scale change.

use nalgebra::Vector2;
use serde::Serialize;

use crate::calibration::{pixels_to_mm, Scale};
use crate::geometry::{distance, distance_sq, Point};

/// Minimum number of points for group statistics.
pub const MIN_GROUP_POINTS: usize = 2;

/// A value that may be unavailable, with the reason it is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Measurement<T> {
    Ready(T),
    /// No scale is set, so nothing can be reported in millimeters.
    Uncalibrated,
    /// The governing point set is too small.
    Insufficient { have: usize, need: usize },
    /// The current mode does not compute this value.
    NotApplicable,
}

impl<T> Measurement<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_ready(self) -> Option<T> {
        match self {
            Self::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Per-axis value pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisPair {
    pub x: f64,
    pub y: f64,
}

/// Group statistics in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupStatsPx {
    pub centroid: Point,
    pub std_dev: AxisPair,
    pub mean_radius: f64,
    pub extreme_spread: f64,
    pub count: usize,
}

impl GroupStatsPx {
    /// Compute pixel-space statistics; `None` for fewer than two points.
    pub fn compute(points: &[Point]) -> Option<Self> {
        let n = points.len();
        if n < MIN_GROUP_POINTS {
            return None;
        }
        let inv_n = 1.0 / n as f64;

        let c = centroid_vec(points)?;

        let mut var = Vector2::zeros();
        let mut radial_sum = 0.0;
        for p in points {
            let d = p.to_vector() - c;
            var += d.component_mul(&d);
            radial_sum += d.norm();
        }
        var *= inv_n;

        Some(Self {
            centroid: Point::from_vector(c),
            std_dev: AxisPair {
                x: var.x.sqrt(),
                y: var.y.sqrt(),
            },
            mean_radius: radial_sum * inv_n,
            extreme_spread: extreme_spread_px(points),
            count: n,
        })
    }

    pub fn to_mm(&self, scale: Scale) -> GroupMetrics {
        GroupMetrics {
            std_dev: AxisPair {
                x: pixels_to_mm(self.std_dev.x, scale),
                y: pixels_to_mm(self.std_dev.y, scale),
            },
            mean_radius: pixels_to_mm(self.mean_radius, scale),
            extreme_spread: pixels_to_mm(self.extreme_spread, scale),
            count: self.count,
            centroid_px: self.centroid,
        }
    }
}

/// Group statistics in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupMetrics {
    /// Population standard deviation per axis (mm).
    pub std_dev: AxisPair,
    /// Mean distance from the group center (mm).
    pub mean_radius: f64,
    /// Largest center-to-center distance in the group (mm).
    pub extreme_spread: f64,
    pub count: usize,
    /// Group center in image pixels, for overlay drawing.
    pub centroid_px: Point,
}

/// Center distance between two selected shots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairDistance {
    pub from: Point,
    pub to: Point,
    pub center_mm: f64,
}

fn centroid_vec(points: &[Point]) -> Option<Vector2<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector2::zeros(), |acc: Vector2<f64>, p| acc + p.to_vector());
    Some(sum / points.len() as f64)
}

/// Arithmetic mean of the points, `None` when empty.
pub fn centroid(points: &[Point]) -> Option<Point> {
    centroid_vec(points).map(Point::from_vector)
}

/// Maximum pairwise distance (pixels), exhaustive over all unordered pairs.
///
/// Compares squared distances and takes a single square root at the end.
/// Returns 0 for fewer than two points.
pub fn extreme_spread_px(points: &[Point]) -> f64 {
    let mut max_sq = 0.0f64;
    for (i, &a) in points.iter().enumerate() {
        for &b in &points[i + 1..] {
            let d2 = distance_sq(a, b);
            if d2 > max_sq {
                max_sq = d2;
            }
        }
    }
    max_sq.sqrt()
}

/// Group metrics in millimeters with the reason when unavailable.
///
/// A missing scale is reported before an undersized set.
pub fn group_metrics(points: &[Point], scale: Option<Scale>) -> Measurement<GroupMetrics> {
    let Some(scale) = scale else {
        return Measurement::Uncalibrated;
    };
    match GroupStatsPx::compute(points) {
        Some(px) => Measurement::Ready(px.to_mm(scale)),
        None => Measurement::Insufficient {
            have: points.len(),
            need: MIN_GROUP_POINTS,
        },
    }
}

/// Center distance between `a` and `b` in millimeters.
pub fn pair_distance(a: Point, b: Point, scale: Scale) -> PairDistance {
    PairDistance {
        from: a,
        to: b,
        center_mm: pixels_to_mm(distance(a, b), scale),
    }
}
