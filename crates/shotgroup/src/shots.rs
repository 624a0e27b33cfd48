//! Shot bookkeeping: detected and manual circles plus the active selection.
//!
//! Every circle gets a [`ShotId`] when it enters the set. Ids are handed out
//! from a monotonically increasing counter and never reused, so a selection
//! survives reordering of the underlying collections. Lookups of ids that no
//! longer exist are filtered out rather than treated as errors.

use serde::{Deserialize, Serialize};

use crate::geometry::{first_hit, Circle, Point};
use crate::mode::Mode;

/// Radius (pixels) given to a manual shot when no other shot exists yet.
pub const DEFAULT_MANUAL_RADIUS_PX: f64 = 10.0;

/// Stable identity of a shot within one [`ShotSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShotId(pub u64);

impl std::fmt::Display for ShotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a shot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShotOrigin {
    Detected,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    pub id: ShotId,
    pub circle: Circle,
    pub origin: ShotOrigin,
}

impl Shot {
    pub fn center(&self) -> Point {
        self.circle.center()
    }
}

/// Detected and manual shots. Iteration order ("all circles") is every
/// detected shot followed by every manual shot, each in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ShotSet {
    detected: Vec<Shot>,
    manual: Vec<Shot>,
    next_id: u64,
}

impl ShotSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> ShotId {
        let id = ShotId(self.next_id);
        self.next_id += 1;
        id
    }

    /// All shots, detected first.
    pub fn iter(&self) -> impl Iterator<Item = &Shot> + '_ {
        self.detected.iter().chain(self.manual.iter())
    }

    pub fn circles(&self) -> impl Iterator<Item = &Circle> + '_ {
        self.iter().map(|s| &s.circle)
    }

    pub fn centers(&self) -> Vec<Point> {
        self.iter().map(Shot::center).collect()
    }

    pub fn detected(&self) -> &[Shot] {
        &self.detected
    }

    pub fn manual(&self) -> &[Shot] {
        &self.manual
    }

    pub fn len(&self) -> usize {
        self.detected.len() + self.manual.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: ShotId) -> Option<&Shot> {
        self.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: ShotId) -> bool {
        self.get(id).is_some()
    }

    /// Mean radius over all shots, `None` when empty.
    pub fn mean_radius(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let sum: f64 = self.circles().map(|c| c.radius).sum();
        Some(sum / self.len() as f64)
    }

    /// First shot (in all-circles order) whose disc, grown by `tolerance_px`,
    /// contains `point`.
    pub fn hit_test(&self, point: Point, tolerance_px: f64) -> Option<ShotId> {
        let idx = first_hit(point, self.circles(), tolerance_px)?;
        self.iter().nth(idx).map(|s| s.id)
    }

    /// Append a manual shot at `point`.
    ///
    /// The radius is the mean radius of the current shots, or
    /// `default_radius_px` when there are none.
    pub fn add_manual_point(&mut self, point: Point, default_radius_px: f64) -> Shot {
        let radius = self.mean_radius().unwrap_or(default_radius_px);
        let shot = Shot {
            id: self.allocate(),
            circle: Circle::at(point, radius),
            origin: ShotOrigin::Manual,
        };
        self.manual.push(shot);
        tracing::debug!(
            "manual shot {} at ({:.1}, {:.1}) r={:.2}",
            shot.id,
            point.x,
            point.y,
            radius
        );
        shot
    }

    /// Remove the shot with `id` from whichever collection holds it.
    pub fn remove(&mut self, id: ShotId) -> Option<Shot> {
        for list in [&mut self.detected, &mut self.manual] {
            if let Some(pos) = list.iter().position(|s| s.id == id) {
                let shot = list.remove(pos);
                tracing::debug!("removed {:?} shot {}", shot.origin, id);
                return Some(shot);
            }
        }
        None
    }

    /// Replace every detected shot. Manual shots are kept.
    ///
    /// Non-finite circles are dropped. Returns the ids assigned to the new
    /// detected shots, in input order.
    pub fn replace_detected(&mut self, circles: impl IntoIterator<Item = Circle>) -> Vec<ShotId> {
        let mut fresh = Vec::new();
        let mut skipped = 0usize;
        for circle in circles {
            if !circle.is_finite() {
                skipped += 1;
                continue;
            }
            fresh.push(Shot {
                id: self.allocate(),
                circle,
                origin: ShotOrigin::Detected,
            });
        }
        if skipped > 0 {
            tracing::warn!("dropped {} non-finite detected circles", skipped);
        }
        self.detected = fresh;
        self.detected.iter().map(|s| s.id).collect()
    }

    pub fn clear_detected(&mut self) {
        self.detected.clear();
    }

    /// Drop every shot. Ids keep increasing afterwards.
    pub fn clear_all(&mut self) {
        self.detected.clear();
        self.manual.clear();
    }
}

/// Result of a selection toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectOutcome {
    Selected,
    Deselected,
    /// The mode's cap was reached; nothing changed.
    Refused,
}

/// Ordered set of selected shot ids, in click order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Selection {
    ids: Vec<ShotId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[ShotId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: ShotId) -> bool {
        self.ids.contains(&id)
    }

    /// Remove `id` if selected, otherwise add it unless `mode` caps the
    /// selection and the cap is reached.
    pub fn toggle(&mut self, id: ShotId, mode: Mode) -> SelectOutcome {
        if let Some(pos) = self.ids.iter().position(|&s| s == id) {
            self.ids.remove(pos);
            return SelectOutcome::Deselected;
        }
        if let Some(cap) = mode.selection_cap() {
            if self.ids.len() >= cap {
                return SelectOutcome::Refused;
            }
        }
        self.ids.push(id);
        SelectOutcome::Selected
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Selected shots that still exist, in click order.
    pub fn resolve<'a>(&self, shots: &'a ShotSet) -> Vec<&'a Shot> {
        self.ids.iter().filter_map(|&id| shots.get(id)).collect()
    }

    /// Drop ids that no longer exist in `shots`.
    pub fn retain_live(&mut self, shots: &ShotSet) {
        self.ids.retain(|&id| shots.contains(id));
    }
}
