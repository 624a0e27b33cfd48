//! Interaction modes and their selection rules.

use serde::{Deserialize, Serialize};

/// Maximum number of shots that can be selected while measuring a distance.
pub const DISTANCE_SELECTION_CAP: usize = 2;

/// Interaction mode. Decides how a click is interpreted and which statistic
/// is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Clicks add or remove shots; group stats cover every shot.
    #[default]
    Edit,
    /// Clicks select up to two shots; their center distance is reported.
    Distance,
    /// Clicks select any number of shots; group stats cover the selection.
    StdDev,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Edit, Mode::Distance, Mode::StdDev];

    pub fn label(self) -> &'static str {
        match self {
            Self::Edit => "Edit Points",
            Self::Distance => "Measure Distance",
            Self::StdDev => "Group Analysis",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Distance => "distance",
            Self::StdDev => "stddev",
        }
    }

    /// Upper bound on the selection size, if any.
    pub fn selection_cap(self) -> Option<usize> {
        match self {
            Self::Distance => Some(DISTANCE_SELECTION_CAP),
            Self::Edit | Self::StdDev => None,
        }
    }

    /// Whether clicks in this mode select shots rather than editing them.
    pub fn selects(self) -> bool {
        !matches!(self, Self::Edit)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "edit" => Ok(Self::Edit),
            "distance" => Ok(Self::Distance),
            "stddev" | "std-dev" | "group" => Ok(Self::StdDev),
            other => Err(format!(
                "unknown mode '{}' (expected edit, distance or stddev)",
                other
            )),
        }
    }
}
