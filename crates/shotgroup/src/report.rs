//! Presentation-facing views of a session.
//!
//! [`Snapshot`] is the serializable state a renderer needs. [`ResultSummary`]
//! is the result table shown next to the target, with values rounded for
//! display and the derived edge-to-edge distance.

use serde::Serialize;

use crate::calibration::ScaleStatus;
use crate::geometry::Bounds;
use crate::mode::Mode;
use crate::session::{Analysis, Notice, Session};
use crate::shots::{ShotId, ShotOrigin};
use crate::stats::{GroupMetrics, Measurement};

/// Distance between hole edges: center distance minus one bullet diameter,
/// floored at zero.
pub fn edge_distance_mm(center_mm: f64, bullet_diameter_mm: f64) -> f64 {
    (center_mm - bullet_diameter_mm).max(0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShotView {
    pub id: ShotId,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub origin: ShotOrigin,
    pub selected: bool,
}

/// Everything a renderer needs to draw the current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub mode: Mode,
    pub scale: ScaleStatus,
    pub processing: bool,
    pub total_shots: usize,
    pub shots: Vec<ShotView>,
    pub selection: Vec<ShotId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_bounds: Option<Bounds>,
    pub analysis: Analysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_distance_mm: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
}

impl Snapshot {
    pub fn capture(session: &Session) -> Self {
        let selection = session.selection();
        let shots = session
            .shots()
            .iter()
            .map(|s| ShotView {
                id: s.id,
                x: s.circle.x,
                y: s.circle.y,
                radius: s.circle.radius,
                origin: s.origin,
                selected: selection.contains(s.id),
            })
            .collect();
        let analysis = session.analysis();
        let edge_distance_mm = analysis
            .distance
            .ready()
            .map(|d| edge_distance_mm(d.center_mm, session.config().bullet_diameter_mm));

        Self {
            mode: session.mode(),
            scale: session.scale_status(),
            processing: session.is_processing(),
            total_shots: session.shots().len(),
            shots,
            selection: selection.ids().to_vec(),
            selection_bounds: session.selection_bounds(),
            analysis,
            edge_distance_mm,
            notices: session.notices().to_vec(),
        }
    }
}

/// One labelled value in the result table. `value` is `None` when the
/// quantity is unavailable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub label: &'static str,
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
}

impl ResultRow {
    fn mm(label: &'static str, value: f64) -> Self {
        Self {
            label,
            value: Some(format!("{:.2}", value)),
            unit: Some("mm"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSection {
    pub title: String,
    pub rows: Vec<ResultRow>,
}

/// Result table for the current session state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSummary {
    pub header: Vec<ResultRow>,
    pub sections: Vec<ResultSection>,
    /// Guidance shown when nothing could be computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

impl ResultSummary {
    pub fn from_session(session: &Session) -> Self {
        let analysis = session.analysis();
        let total = session.shots().len();

        let scale_row = ResultRow {
            label: "Scale",
            value: match session.scale_status() {
                ScaleStatus::Calibrated { px_per_mm } => Some(format!("{:.2}", px_per_mm)),
                ScaleStatus::Uncalibrated => None,
            },
            unit: Some("px/mm"),
        };
        let header = vec![
            scale_row,
            ResultRow {
                label: "Total Shots",
                value: Some(total.to_string()),
                unit: None,
            },
        ];

        if session.scale().is_none() {
            return Self {
                header,
                sections: Vec::new(),
                hint: Some("Not calibrated. Load an image to set the scale."),
            };
        }

        let mut sections = Vec::new();
        if let Measurement::Ready(d) = analysis.distance {
            let edge = edge_distance_mm(d.center_mm, session.config().bullet_diameter_mm);
            sections.push(ResultSection {
                title: "Distance (2 selected)".to_string(),
                rows: vec![
                    ResultRow::mm("Center Distance", d.center_mm),
                    ResultRow::mm("Edge Distance", edge),
                ],
            });
        }
        if let Measurement::Ready(g) = analysis.group {
            let selected = session.selection().len();
            sections.push(group_section(&g, analysis.mode, selected, total));
        }

        let hint = if sections.is_empty() {
            Some(match analysis.mode {
                Mode::Distance => "Select 2 points to measure distance.",
                Mode::StdDev => "Select 2 or more points for group analysis.",
                Mode::Edit if total < 2 => "At least 2 points needed for analysis.",
                Mode::Edit => "Analysis of all points shown here.",
            })
        } else {
            None
        };

        Self {
            header,
            sections,
            hint,
        }
    }
}

fn group_section(g: &GroupMetrics, mode: Mode, selected: usize, total: usize) -> ResultSection {
    let title = if mode == Mode::StdDev && selected > 0 {
        format!("Group ({} selected)", selected)
    } else {
        format!("Group ({} total)", total)
    };
    ResultSection {
        title,
        rows: vec![
            ResultRow::mm("Extreme Spread", g.extreme_spread),
            ResultRow::mm("Mean Radius", g.mean_radius),
            ResultRow::mm("Std. Dev. (X)", g.std_dev.x),
            ResultRow::mm("Std. Dev. (Y)", g.std_dev.y),
        ],
    }
}

fn write_row(f: &mut std::fmt::Formatter<'_>, row: &ResultRow) -> std::fmt::Result {
    let value = row.value.as_deref().unwrap_or("-");
    match (row.value.is_some(), row.unit) {
        (true, Some(unit)) => writeln!(f, "  {:<16} {:>10} {}", row.label, value, unit),
        _ => writeln!(f, "  {:<16} {:>10}", row.label, value),
    }
}

impl std::fmt::Display for ResultSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Results")?;
        for row in &self.header {
            write_row(f, row)?;
        }
        for section in &self.sections {
            writeln!(f, "{}", section.title)?;
            for row in &section.rows {
                write_row(f, row)?;
            }
        }
        if let Some(hint) = self.hint {
            writeln!(f, "{}", hint)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Scale;
    use crate::geometry::{Circle, Point};

    fn session_with(circles: &[Circle], px_per_mm: f64) -> Session {
        let mut s = Session::default();
        s.on_image_ready(Some(Scale::new(px_per_mm).unwrap()));
        let t = s.begin_detection();
        s.complete_detection(t, Ok(circles.to_vec()));
        s
    }

    #[test]
    fn edge_distance_is_floored() {
        assert_eq!(edge_distance_mm(10.0, 5.56), 10.0 - 5.56);
        assert_eq!(edge_distance_mm(3.0, 5.56), 0.0);
    }

    #[test]
    fn distance_section_has_center_and_edge_rows() {
        let mut s = session_with(&[Circle::new(0.0, 0.0, 3.0), Circle::new(30.0, 40.0, 3.0)], 5.0);
        s.on_mode_change(Mode::Distance);
        s.on_pointer_click(Point::new(0.0, 0.0));
        s.on_pointer_click(Point::new(30.0, 40.0));

        let summary = ResultSummary::from_session(&s);
        assert_eq!(summary.sections.len(), 1);
        let rows = &summary.sections[0].rows;
        assert_eq!(rows[0].value.as_deref(), Some("10.00"));
        assert_eq!(rows[1].value.as_deref(), Some("4.44"));
        assert!(summary.hint.is_none());

        let snap = Snapshot::capture(&s);
        assert!((snap.edge_distance_mm.unwrap() - 4.44).abs() < 1e-9);
        assert_eq!(snap.shots.iter().filter(|v| v.selected).count(), 2);
    }

    #[test]
    fn group_title_depends_on_mode_and_selection() {
        let circles = [
            Circle::new(0.0, 0.0, 2.0),
            Circle::new(10.0, 0.0, 2.0),
            Circle::new(0.0, 10.0, 2.0),
        ];
        let mut s = session_with(&circles, 1.0);
        let summary = ResultSummary::from_session(&s);
        assert_eq!(summary.sections[0].title, "Group (3 total)");

        s.on_mode_change(Mode::StdDev);
        s.on_pointer_click(Point::new(0.0, 0.0));
        s.on_pointer_click(Point::new(10.0, 0.0));
        let summary = ResultSummary::from_session(&s);
        assert_eq!(summary.sections[0].title, "Group (2 selected)");
    }

    #[test]
    fn hints_explain_missing_results() {
        let s = Session::default();
        let summary = ResultSummary::from_session(&s);
        assert_eq!(summary.header[0].value, None);
        assert!(summary.hint.unwrap().starts_with("Not calibrated"));

        let mut s = session_with(&[Circle::new(0.0, 0.0, 2.0)], 1.0);
        assert_eq!(
            ResultSummary::from_session(&s).hint,
            Some("At least 2 points needed for analysis.")
        );
        s.on_mode_change(Mode::Distance);
        assert_eq!(
            ResultSummary::from_session(&s).hint,
            Some("Select 2 points to measure distance.")
        );
    }

    #[test]
    fn text_rendering_lists_rows() {
        let s = session_with(&[Circle::new(0.0, 0.0, 2.0), Circle::new(8.0, 6.0, 2.0)], 2.0);
        let text = ResultSummary::from_session(&s).to_string();
        assert!(text.contains("Extreme Spread"));
        assert!(text.contains("5.00 mm"));
        assert!(text.contains("Group (2 total)"));
    }
}
