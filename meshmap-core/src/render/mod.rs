//! Diagram rendering: projects the finished model into D2 text.

use serde::{Deserialize, Serialize};

mod d2;
mod icons;
mod theme;

pub use d2::render_d2;
pub use icons::{lookup_icon, lookup_os_icon};
pub use theme::{theme, theme_names, Theme, ThemeColor};

/// Rendering verbosity. Governs icons/tooltips, system-service collapsing,
/// and dependency-edge labeling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Minimal,
    #[default]
    Standard,
    Detailed,
}

impl DetailLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailLevel::Minimal => "minimal",
            DetailLevel::Standard => "standard",
            DetailLevel::Detailed => "detailed",
        }
    }
}

impl std::str::FromStr for DetailLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minimal" => Ok(DetailLevel::Minimal),
            "standard" => Ok(DetailLevel::Standard),
            "detailed" => Ok(DetailLevel::Detailed),
            other => Err(format!(
                "unknown detail level '{other}' (expected minimal, standard, or detailed)"
            )),
        }
    }
}
