//! Point and circle primitives in image pixel space.
//!
//! Coordinates follow the image convention: origin at the top-left corner,
//! x grows to the right, y grows downward.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Hit-test margin (pixels) added to a circle's radius so small holes stay clickable.
pub const DEFAULT_HIT_TOLERANCE_PX: f64 = 5.0;

/// A location in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub(crate) fn to_vector(self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    pub(crate) fn from_vector(v: Vector2<f64>) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<[f64; 2]> for Point {
    fn from(xy: [f64; 2]) -> Self {
        Self { x: xy[0], y: xy[1] }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// A shot hole: center plus radius, all in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl Circle {
    pub const fn new(x: f64, y: f64, radius: f64) -> Self {
        Self { x, y, radius }
    }

    pub fn at(center: Point, radius: f64) -> Self {
        Self {
            x: center.x,
            y: center.y,
            radius,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.radius.is_finite()
    }
}

/// Squared Euclidean distance.
#[inline]
pub fn distance_sq(a: Point, b: Point) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

/// Euclidean distance.
#[inline]
pub fn distance(a: Point, b: Point) -> f64 {
    distance_sq(a, b).sqrt()
}

/// True if `point` lies strictly inside `circle` grown by `tolerance_px`.
pub fn within_circle(point: Point, circle: &Circle, tolerance_px: f64) -> bool {
    distance(point, circle.center()) < circle.radius + tolerance_px
}

/// Index of the first circle hit by `point`, in iteration order.
///
/// Overlapping circles are not disambiguated by distance: the earliest one
/// wins even when a later circle's center is closer.
pub fn first_hit<'a, I>(point: Point, circles: I, tolerance_px: f64) -> Option<usize>
where
    I: IntoIterator<Item = &'a Circle>,
{
    circles
        .into_iter()
        .position(|c| within_circle(point, c, tolerance_px))
}

/// Axis-aligned rectangle in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    /// Smallest box containing every circle's full disc.
    pub fn around_circles<'a, I>(circles: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Circle>,
    {
        let mut iter = circles.into_iter();
        let first = iter.next()?;
        let mut min = Point::new(first.x - first.radius, first.y - first.radius);
        let mut max = Point::new(first.x + first.radius, first.y + first.radius);
        for c in iter {
            min.x = min.x.min(c.x - c.radius);
            min.y = min.y.min(c.y - c.radius);
            max.x = max.x.max(c.x + c.radius);
            max.y = max.y.max(c.y + c.radius);
        }
        Some(Self { min, max })
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            0.5 * (self.min.x + self.max.x),
            0.5 * (self.min.y + self.max.y),
        )
    }
}
