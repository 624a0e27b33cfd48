//! Event-driven analyzer session.
//!
//! [`Session`] owns all mutable state: calibration, shots, selection, mode,
//! the detection tracker and the queue of user-facing notices. Every public
//! operation absorbs its own failures; callers observe them as notices,
//! [`ClickOutcome`]/[`DetectionOutcome`] values, or absent measurements.
//!
//! Any mutation that removes or replaces shots clears the selection in the
//! same call. Appending a manual shot leaves it alone.

use serde::{Deserialize, Serialize};

use crate::calibration::{Calibration, Scale, ScaleStatus};
use crate::config::AnalyzerConfig;
use crate::detection::{
    DetectionError, DetectionOutcome, DetectionTicket, DetectionTracker, HoleDetector,
};
use crate::geometry::{Bounds, Circle, Point};
use crate::mode::{Mode, DISTANCE_SELECTION_CAP};
use crate::shots::{SelectOutcome, Selection, Shot, ShotId, ShotSet};
use crate::stats::{group_metrics, pair_distance, GroupMetrics, Measurement, PairDistance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

/// User-facing message produced by a session operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Effect of a pointer click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", content = "id", rename_all = "snake_case")]
pub enum ClickOutcome {
    Added(ShotId),
    Removed(ShotId),
    Selected(ShotId),
    Deselected(ShotId),
    /// The distance-mode cap was reached; nothing changed.
    SelectionRefused(ShotId),
    /// The click missed every shot in a selecting mode, or was not finite.
    Ignored,
}

/// Current derived results. Recomputed from scratch on each request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Analysis {
    pub mode: Mode,
    pub group: Measurement<GroupMetrics>,
    pub distance: Measurement<PairDistance>,
}

/// Inbound events, as delivered by a front-end or a replay script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A new image finished loading. `px_per_mm` overrides the configured scale.
    ImageReady {
        #[serde(default)]
        px_per_mm: Option<f64>,
    },
    ImageCleared,
    /// Drop every shot but keep the image and its calibration.
    Reset,
    DetectionStarted,
    /// Detector output. Without `generation`, applies to the request in
    /// flight (or to a fresh one when none is).
    DetectionCompleted {
        #[serde(default)]
        generation: Option<u64>,
        circles: Vec<Circle>,
    },
    DetectionFailed {
        #[serde(default)]
        generation: Option<u64>,
        message: String,
    },
    Click {
        x: f64,
        y: f64,
    },
    SetMode {
        mode: Mode,
    },
    ClearSelection,
}

/// What [`Session::apply`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Applied {
    Click { outcome: ClickOutcome },
    DetectionStarted { ticket: DetectionTicket },
    Detection { outcome: DetectionOutcome },
    StateChanged,
}

#[derive(Debug, Clone)]
pub struct Session {
    config: AnalyzerConfig,
    calibration: Calibration,
    shots: ShotSet,
    selection: Selection,
    mode: Mode,
    detection: DetectionTracker,
    notices: Vec<Notice>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl Session {
    pub fn new(config: AnalyzerConfig) -> Self {
        let mode = config.initial_mode;
        Self {
            config,
            calibration: Calibration::default(),
            shots: ShotSet::new(),
            selection: Selection::new(),
            mode,
            detection: DetectionTracker::default(),
            notices: Vec::new(),
        }
    }

    // ── accessors ──────────────────────────────────────────────────────

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn shots(&self) -> &ShotSet {
        &self.shots
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_shots(&self) -> Vec<&Shot> {
        self.selection.resolve(&self.shots)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn scale(&self) -> Option<Scale> {
        self.calibration.scale()
    }

    pub fn scale_status(&self) -> ScaleStatus {
        self.calibration.status()
    }

    /// True while a detection request is in flight.
    pub fn is_processing(&self) -> bool {
        self.detection.is_busy()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, kind: NoticeKind, message: impl Into<String>) {
        let message = message.into();
        match kind {
            NoticeKind::Error => tracing::warn!("{}", message),
            NoticeKind::Success | NoticeKind::Info => tracing::info!("{}", message),
        }
        self.notices.push(Notice { kind, message });
    }

    // ── image lifecycle ───────────────────────────────────────────────

    /// A new image is ready: drop all shots and calibrate with `scale`, or
    /// with the configured default when `None`.
    pub fn on_image_ready(&mut self, scale: Option<Scale>) {
        self.detection.invalidate();
        self.shots.clear_all();
        self.selection.clear();

        let scale = match scale {
            Some(s) => Some(s),
            None => match self.config.default_scale() {
                Ok(s) => Some(s),
                Err(e) => {
                    self.notify(NoticeKind::Error, e.to_string());
                    None
                }
            },
        };
        match scale {
            Some(s) => self.calibration.calibrate(s),
            None => self.calibration.clear(),
        }
    }

    /// The image was removed: decalibrate and reset everything.
    pub fn on_image_cleared(&mut self) {
        self.detection.invalidate();
        self.calibration.clear();
        self.shots.clear_all();
        self.selection.clear();
        tracing::debug!("session reset (image cleared)");
    }

    /// Drop every shot while keeping the image calibration.
    pub fn reset_keep_image(&mut self) {
        self.detection.invalidate();
        self.shots.clear_all();
        self.selection.clear();
        tracing::debug!("session reset (image kept)");
    }

    // ── detection ─────────────────────────────────────────────────────

    /// Start a detection request. Detected shots and the selection are
    /// cleared immediately; manual shots are untouched.
    pub fn begin_detection(&mut self) -> DetectionTicket {
        let ticket = self.detection.begin();
        self.shots.clear_detected();
        self.selection.clear();
        tracing::debug!("detection {} started", ticket.generation);
        ticket
    }

    /// Deliver the detector response for `ticket`.
    pub fn complete_detection(
        &mut self,
        ticket: DetectionTicket,
        result: Result<Vec<Circle>, DetectionError>,
    ) -> DetectionOutcome {
        if !self.detection.finish(ticket) {
            tracing::warn!(
                "discarding response for superseded detection {}",
                ticket.generation
            );
            return DetectionOutcome::Stale;
        }

        match result {
            Ok(circles) => {
                let ids = self.shots.replace_detected(circles);
                self.selection.clear();
                let count = ids.len();
                self.notify(
                    NoticeKind::Success,
                    format!("Detected {} potential holes.", count),
                );
                DetectionOutcome::Applied { count }
            }
            Err(e) => {
                tracing::warn!("detection {} failed: {}", ticket.generation, e);
                self.shots.clear_detected();
                self.selection.clear();
                self.notify(NoticeKind::Error, "Failed to process image.");
                DetectionOutcome::Failed
            }
        }
    }

    /// Run `detector` synchronously on `image` with the configured parameters.
    pub fn run_detection<D>(&mut self, detector: &D, image: &D::Image) -> DetectionOutcome
    where
        D: HoleDetector + ?Sized,
    {
        let ticket = self.begin_detection();
        let result = detector.detect(image, &self.config.detector);
        self.complete_detection(ticket, result)
    }

    // ── interaction ───────────────────────────────────────────────────

    /// Switch mode. Always clears the selection, even when `mode` is the
    /// current mode.
    pub fn on_mode_change(&mut self, mode: Mode) {
        if mode != self.mode {
            tracing::debug!("mode {} -> {}", self.mode, mode);
        }
        self.mode = mode;
        self.selection.clear();
    }

    pub fn on_clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Interpret a click at `point` (image pixels) according to the mode.
    pub fn on_pointer_click(&mut self, point: Point) -> ClickOutcome {
        if !point.is_finite() {
            tracing::debug!("ignoring non-finite click");
            return ClickOutcome::Ignored;
        }
        let hit = self.shots.hit_test(point, self.config.hit_tolerance_px);

        match (self.mode, hit) {
            (Mode::Edit, Some(id)) => self.remove_shot(id),
            (Mode::Edit, None) => match self.add_manual_point(point) {
                Some(id) => {
                    self.notify(NoticeKind::Success, "Manual point added.");
                    ClickOutcome::Added(id)
                }
                None => ClickOutcome::Ignored,
            },
            (Mode::Distance | Mode::StdDev, Some(id)) => self.toggle_select(id),
            (Mode::Distance | Mode::StdDev, None) => ClickOutcome::Ignored,
        }
    }

    /// Place a manual shot at `point` without hit testing. Returns `None`
    /// for non-finite points.
    pub fn add_manual_point(&mut self, point: Point) -> Option<ShotId> {
        if !point.is_finite() {
            return None;
        }
        let shot = self
            .shots
            .add_manual_point(point, self.config.default_manual_radius_px);
        Some(shot.id)
    }

    /// Remove a shot by id and clear the selection.
    pub fn remove_shot(&mut self, id: ShotId) -> ClickOutcome {
        match self.shots.remove(id) {
            Some(_) => {
                self.selection.clear();
                self.notify(NoticeKind::Success, "Point removed.");
                ClickOutcome::Removed(id)
            }
            None => ClickOutcome::Ignored,
        }
    }

    /// Toggle `id` in the selection under the current mode's cap. Ignored in
    /// edit mode.
    pub fn toggle_select(&mut self, id: ShotId) -> ClickOutcome {
        if !self.mode.selects() || !self.shots.contains(id) {
            return ClickOutcome::Ignored;
        }
        // Stale ids must not count against the cap.
        self.selection.retain_live(&self.shots);
        match self.selection.toggle(id, self.mode) {
            SelectOutcome::Selected => ClickOutcome::Selected(id),
            SelectOutcome::Deselected => ClickOutcome::Deselected(id),
            SelectOutcome::Refused => {
                self.notify(
                    NoticeKind::Info,
                    format!(
                        "Max {} points for distance. Clear selection to choose others.",
                        DISTANCE_SELECTION_CAP
                    ),
                );
                ClickOutcome::SelectionRefused(id)
            }
        }
    }

    /// Dispatch an inbound event.
    pub fn apply(&mut self, event: Event) -> Applied {
        match event {
            Event::ImageReady { px_per_mm } => {
                let scale = match px_per_mm.map(Scale::new).transpose() {
                    Ok(s) => s,
                    Err(e) => {
                        self.notify(NoticeKind::Error, format!("Invalid scale: {}", e));
                        None
                    }
                };
                self.on_image_ready(scale);
                Applied::StateChanged
            }
            Event::ImageCleared => {
                self.on_image_cleared();
                Applied::StateChanged
            }
            Event::Reset => {
                self.reset_keep_image();
                Applied::StateChanged
            }
            Event::DetectionStarted => Applied::DetectionStarted {
                ticket: self.begin_detection(),
            },
            Event::DetectionCompleted {
                generation,
                circles,
            } => {
                let ticket = self.ticket_for(generation);
                Applied::Detection {
                    outcome: self.complete_detection(ticket, Ok(circles)),
                }
            }
            Event::DetectionFailed {
                generation,
                message,
            } => {
                let ticket = self.ticket_for(generation);
                Applied::Detection {
                    outcome: self.complete_detection(ticket, Err(DetectionError::Failed(message))),
                }
            }
            Event::Click { x, y } => Applied::Click {
                outcome: self.on_pointer_click(Point::new(x, y)),
            },
            Event::SetMode { mode } => {
                self.on_mode_change(mode);
                Applied::StateChanged
            }
            Event::ClearSelection => {
                self.on_clear_selection();
                Applied::StateChanged
            }
        }
    }

    fn ticket_for(&mut self, generation: Option<u64>) -> DetectionTicket {
        match generation {
            Some(generation) => DetectionTicket { generation },
            None => match self.detection.in_flight() {
                Some(t) => t,
                None => self.begin_detection(),
            },
        }
    }

    // ── derived results ───────────────────────────────────────────────

    /// Compute group metrics and pair distance for the current state.
    pub fn analysis(&self) -> Analysis {
        let scale = self.calibration.scale();
        let (group, distance) = match self.mode {
            Mode::Edit => (
                group_metrics(&self.shots.centers(), scale),
                Measurement::NotApplicable,
            ),
            Mode::StdDev => (
                group_metrics(&self.selected_centers(), scale),
                Measurement::NotApplicable,
            ),
            Mode::Distance => (Measurement::NotApplicable, self.pair_measurement(scale)),
        };
        Analysis {
            mode: self.mode,
            group,
            distance,
        }
    }

    fn selected_centers(&self) -> Vec<Point> {
        self.selected_shots().iter().map(|s| s.center()).collect()
    }

    fn pair_measurement(&self, scale: Option<Scale>) -> Measurement<PairDistance> {
        let Some(scale) = scale else {
            return Measurement::Uncalibrated;
        };
        match self.selected_centers().as_slice() {
            &[a, b] => Measurement::Ready(pair_distance(a, b, scale)),
            other => Measurement::Insufficient {
                have: other.len(),
                need: DISTANCE_SELECTION_CAP,
            },
        }
    }

    /// Bounding box of the selected shots' discs.
    pub fn selection_bounds(&self) -> Option<Bounds> {
        Bounds::around_circles(self.selected_shots().into_iter().map(|s| &s.circle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::HoughParams;
    use approx::assert_relative_eq;

    struct FixedDetector(Vec<Circle>);

    impl HoleDetector for FixedDetector {
        type Image = ();

        fn detect(
            &self,
            _image: &(),
            _params: &HoughParams,
        ) -> Result<Vec<Circle>, DetectionError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenDetector;

    impl HoleDetector for BrokenDetector {
        type Image = ();

        fn detect(
            &self,
            _image: &(),
            _params: &HoughParams,
        ) -> Result<Vec<Circle>, DetectionError> {
            Err(DetectionError::Failed("matrix allocation".to_string()))
        }
    }

    fn calibrated(px_per_mm: f64) -> Session {
        let mut s = Session::default();
        s.on_image_ready(Some(Scale::new(px_per_mm).unwrap()));
        s
    }

    fn with_detected(px_per_mm: f64, circles: &[Circle]) -> Session {
        let mut s = calibrated(px_per_mm);
        let outcome = s.run_detection(&FixedDetector(circles.to_vec()), &());
        assert_eq!(outcome, DetectionOutcome::Applied { count: circles.len() });
        s
    }

    fn square() -> Vec<Circle> {
        vec![
            Circle::new(0.0, 0.0, 2.0),
            Circle::new(10.0, 0.0, 2.0),
            Circle::new(0.0, 10.0, 2.0),
            Circle::new(10.0, 10.0, 2.0),
        ]
    }

    fn ids(s: &Session) -> Vec<ShotId> {
        s.shots().iter().map(|shot| shot.id).collect()
    }

    #[test]
    fn edit_mode_reports_square_group() {
        let s = with_detected(2.0, &square());
        let a = s.analysis();
        assert_eq!(a.distance, Measurement::NotApplicable);
        let g = a.group.into_ready().expect("group metrics");
        assert_relative_eq!(g.std_dev.x, 2.5, epsilon = 1e-12);
        assert_relative_eq!(g.std_dev.y, 2.5, epsilon = 1e-12);
        assert_relative_eq!(g.extreme_spread, 7.0710678118654755, epsilon = 1e-9);
        assert_relative_eq!(g.mean_radius, 3.5355339059327378, epsilon = 1e-9);
        assert_eq!(g.count, 4);
    }

    #[test]
    fn distance_mode_exact_pair() {
        let mut s = with_detected(5.0, &[Circle::new(0.0, 0.0, 3.0), Circle::new(30.0, 40.0, 3.0)]);
        s.on_mode_change(Mode::Distance);
        assert!(matches!(
            s.analysis().distance,
            Measurement::Insufficient { have: 0, need: 2 }
        ));

        s.on_pointer_click(Point::new(0.0, 0.0));
        s.on_pointer_click(Point::new(30.0, 40.0));
        let a = s.analysis();
        assert_eq!(a.group, Measurement::NotApplicable);
        let d = a.distance.into_ready().expect("pair distance");
        assert_relative_eq!(d.center_mm, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn uncalibrated_results_are_absent_not_zero() {
        let mut s = Session::default();
        s.on_pointer_click(Point::new(0.0, 0.0));
        s.on_pointer_click(Point::new(50.0, 0.0));
        assert_eq!(s.shots().len(), 2);
        assert_eq!(s.analysis().group, Measurement::Uncalibrated);

        s.on_mode_change(Mode::Distance);
        s.on_pointer_click(Point::new(0.0, 0.0));
        s.on_pointer_click(Point::new(50.0, 0.0));
        assert_eq!(s.selection().len(), 2);
        assert_eq!(s.analysis().distance, Measurement::Uncalibrated);
        assert_eq!(s.scale_status(), ScaleStatus::Uncalibrated);
    }

    #[test]
    fn mode_change_always_clears_selection() {
        for target in Mode::ALL {
            let mut s = with_detected(1.0, &square());
            s.on_mode_change(Mode::StdDev);
            s.on_pointer_click(Point::new(0.0, 0.0));
            s.on_pointer_click(Point::new(10.0, 0.0));
            assert_eq!(s.selection().len(), 2);
            s.on_mode_change(target);
            assert!(s.selection().is_empty(), "switch to {} kept selection", target);
        }
    }

    #[test]
    fn distance_mode_refuses_third_point() {
        let mut s = with_detected(1.0, &square());
        s.on_mode_change(Mode::Distance);
        s.on_pointer_click(Point::new(0.0, 0.0));
        s.on_pointer_click(Point::new(10.0, 0.0));
        let before = s.selection().clone();
        s.drain_notices();

        let out = s.on_pointer_click(Point::new(10.0, 10.0));
        assert!(matches!(out, ClickOutcome::SelectionRefused(_)));
        assert_eq!(s.selection(), &before);
        let notices = s.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::Info);
    }

    #[test]
    fn reclick_deselects() {
        let mut s = with_detected(1.0, &square());
        s.on_mode_change(Mode::StdDev);
        assert!(matches!(
            s.on_pointer_click(Point::new(0.0, 0.0)),
            ClickOutcome::Selected(_)
        ));
        assert!(matches!(
            s.on_pointer_click(Point::new(1.0, 1.0)),
            ClickOutcome::Deselected(_)
        ));
        assert!(s.selection().is_empty());
    }

    #[test]
    fn edit_removal_clears_selection() {
        let mut s = with_detected(1.0, &square());
        s.on_mode_change(Mode::StdDev);
        s.on_pointer_click(Point::new(0.0, 0.0));
        s.on_pointer_click(Point::new(10.0, 10.0));
        assert_eq!(s.selection().len(), 2);

        // Selections survive only until an edit removes a shot.
        s.mode = Mode::Edit;
        let out = s.on_pointer_click(Point::new(10.0, 0.0));
        assert!(matches!(out, ClickOutcome::Removed(_)));
        assert!(s.selection().is_empty());
        assert_eq!(s.shots().len(), 3);
    }

    #[test]
    fn edit_miss_adds_manual_point_with_mean_radius() {
        let mut s = with_detected(
            1.0,
            &[Circle::new(0.0, 0.0, 4.0), Circle::new(100.0, 0.0, 6.0)],
        );
        let out = s.on_pointer_click(Point::new(50.0, 50.0));
        let ClickOutcome::Added(id) = out else {
            panic!("expected a manual point, got {:?}", out);
        };
        let shot = s.shots().get(id).unwrap();
        assert_relative_eq!(shot.circle.radius, 5.0);
        assert_eq!(s.shots().manual().len(), 1);
    }

    #[test]
    fn stddev_group_uses_selection_only() {
        let mut circles = square();
        circles.push(Circle::new(500.0, 500.0, 2.0));
        let mut s = with_detected(1.0, &circles);
        s.on_mode_change(Mode::StdDev);
        assert!(matches!(
            s.analysis().group,
            Measurement::Insufficient { have: 0, need: 2 }
        ));
        s.on_pointer_click(Point::new(0.0, 0.0));
        s.on_pointer_click(Point::new(10.0, 0.0));
        let g = s.analysis().group.into_ready().unwrap();
        assert_eq!(g.count, 2);
        assert_relative_eq!(g.extreme_spread, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn detection_failure_keeps_manual_points() {
        let mut s = with_detected(1.0, &square());
        s.on_pointer_click(Point::new(200.0, 200.0));
        assert_eq!(s.shots().manual().len(), 1);

        let outcome = s.run_detection(&BrokenDetector, &());
        assert_eq!(outcome, DetectionOutcome::Failed);
        assert!(s.shots().detected().is_empty());
        assert_eq!(s.shots().manual().len(), 1);
        assert!(!s.is_processing());
        let last = s.notices().last().unwrap();
        assert_eq!(last.kind, NoticeKind::Error);
    }

    #[test]
    fn superseded_detection_is_discarded() {
        let mut s = calibrated(1.0);
        let first = s.begin_detection();
        let second = s.begin_detection();
        assert!(s.is_processing());

        let stale = s.complete_detection(first, Ok(square()));
        assert_eq!(stale, DetectionOutcome::Stale);
        assert!(s.shots().is_empty());
        assert!(s.is_processing());

        let fresh = s.complete_detection(second, Ok(vec![Circle::new(1.0, 1.0, 2.0)]));
        assert_eq!(fresh, DetectionOutcome::Applied { count: 1 });
        assert!(!s.is_processing());
    }

    #[test]
    fn new_detection_clears_selection() {
        let mut s = with_detected(1.0, &square());
        s.on_mode_change(Mode::StdDev);
        s.on_pointer_click(Point::new(0.0, 0.0));
        let t = s.begin_detection();
        assert!(s.selection().is_empty());
        s.complete_detection(t, Ok(square()));
        assert!(s.selection().is_empty());
    }

    #[test]
    fn image_cleared_resets_everything() {
        let mut s = with_detected(1.0, &square());
        s.on_pointer_click(Point::new(300.0, 300.0));
        let t = s.begin_detection();
        s.on_image_cleared();
        assert!(s.shots().is_empty());
        assert!(s.scale().is_none());
        assert!(!s.is_processing());
        assert_eq!(
            s.complete_detection(t, Ok(square())),
            DetectionOutcome::Stale
        );
    }

    #[test]
    fn image_ready_uses_configured_scale() {
        let mut s = Session::new(AnalyzerConfig {
            pixels_per_mm: 3.0,
            ..AnalyzerConfig::default()
        });
        s.on_image_ready(None);
        assert_eq!(s.scale_status(), ScaleStatus::Calibrated { px_per_mm: 3.0 });
    }

    #[test]
    fn selection_bounds_follow_selected_discs() {
        let mut s = with_detected(1.0, &square());
        assert!(s.selection_bounds().is_none());
        s.on_mode_change(Mode::StdDev);
        s.on_pointer_click(Point::new(0.0, 0.0));
        s.on_pointer_click(Point::new(10.0, 10.0));
        let b = s.selection_bounds().unwrap();
        assert_relative_eq!(b.min.x, -2.0);
        assert_relative_eq!(b.max.y, 12.0);
    }

    #[test]
    fn ids_stay_stable_across_removals() {
        let mut s = with_detected(1.0, &square());
        let before = ids(&s);
        s.on_pointer_click(Point::new(0.0, 0.0));
        let after = ids(&s);
        assert_eq!(after, before[1..].to_vec());
    }

    #[test]
    fn manual_add_keeps_selection() {
        let mut s = with_detected(1.0, &square());
        s.on_mode_change(Mode::StdDev);
        s.on_pointer_click(Point::new(0.0, 0.0));
        s.on_pointer_click(Point::new(10.0, 0.0));
        let before = s.selection().ids().to_vec();
        assert_eq!(before.len(), 2);

        let id = s.add_manual_point(Point::new(100.0, 100.0)).unwrap();
        assert!(s.shots().contains(id));
        assert_eq!(s.selection().ids(), before.as_slice());
        let g = s.analysis().group.into_ready().unwrap();
        assert_eq!(g.count, 2);
    }

    #[test]
    fn edit_mode_toggle_is_ignored() {
        let mut s = with_detected(1.0, &square());
        assert_eq!(s.mode(), Mode::Edit);
        let first = ids(&s)[0];
        assert_eq!(s.toggle_select(first), ClickOutcome::Ignored);
        assert!(s.selection().is_empty());
        assert_eq!(s.shots().len(), 4);
    }

    #[test]
    fn events_drive_the_same_state_machine() {
        let mut s = Session::default();
        let script: Vec<Event> = serde_json::from_str(
            r#"[
                {"event": "image_ready", "px_per_mm": 5.0},
                {"event": "detection_started"},
                {"event": "detection_completed", "circles": [
                    {"x": 0.0, "y": 0.0, "radius": 3.0},
                    {"x": 30.0, "y": 40.0, "radius": 3.0}
                ]},
                {"event": "set_mode", "mode": "distance"},
                {"event": "click", "x": 1.0, "y": 1.0},
                {"event": "click", "x": 29.0, "y": 41.0}
            ]"#,
        )
        .unwrap();
        for e in script {
            s.apply(e);
        }
        let d = s.analysis().distance.into_ready().unwrap();
        assert_relative_eq!(d.center_mm, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn stale_generation_events_are_dropped() {
        let mut s = Session::default();
        let script: Vec<Event> = serde_json::from_str(
            r#"[
                {"event": "image_ready", "px_per_mm": 2.0},
                {"event": "detection_started"},
                {"event": "detection_started"}
            ]"#,
        )
        .unwrap();
        for e in script {
            s.apply(e);
        }
        assert_eq!(s.detection.in_flight(), Some(DetectionTicket { generation: 2 }));

        let late: Event = serde_json::from_str(
            r#"{"event": "detection_completed", "generation": 1, "circles": [
                {"x": 0.0, "y": 0.0, "radius": 3.0}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            s.apply(late),
            Applied::Detection {
                outcome: DetectionOutcome::Stale
            }
        );
        assert!(s.shots().is_empty());

        let late_failure: Event = serde_json::from_str(
            r#"{"event": "detection_failed", "generation": 1, "message": "timeout"}"#,
        )
        .unwrap();
        assert_eq!(
            s.apply(late_failure),
            Applied::Detection {
                outcome: DetectionOutcome::Stale
            }
        );
        assert!(s.is_processing());
        assert!(s.notices().is_empty());

        let current = Event::DetectionCompleted {
            generation: Some(2),
            circles: vec![Circle::new(0.0, 0.0, 3.0), Circle::new(8.0, 6.0, 3.0)],
        };
        assert_eq!(
            s.apply(current),
            Applied::Detection {
                outcome: DetectionOutcome::Applied { count: 2 }
            }
        );
        assert!(!s.is_processing());
        assert_eq!(s.shots().len(), 2);
    }

    #[test]
    fn invalid_event_scale_falls_back_to_default() {
        let mut s = Session::default();
        s.apply(Event::ImageReady {
            px_per_mm: Some(-1.0),
        });
        // Falls back to the configured default scale.
        assert!(s.scale().is_some());
        assert_eq!(s.notices()[0].kind, NoticeKind::Error);
    }
}
