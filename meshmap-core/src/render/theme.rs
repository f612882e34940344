//! Color themes for the rendered diagram.

use crate::model::ServerType;

/// Fill and stroke colors for one element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThemeColor {
    pub fill: &'static str,
    pub stroke: &'static str,
}

const fn color(fill: &'static str, stroke: &'static str) -> ThemeColor {
    ThemeColor { fill, stroke }
}

/// Neutral fallback for elements a theme does not name.
const NEUTRAL: ThemeColor = color("#F9FAFB", "#D1D5DB");

/// A named set of colors keyed by server type or element name.
pub struct Theme {
    pub name: &'static str,
    colors: &'static [(&'static str, ThemeColor)],
}

impl Theme {
    fn lookup(&self, key: &str) -> Option<ThemeColor> {
        self.colors
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, c)| *c)
    }

    /// Color for a server type; unknown types fall back to the lab color.
    pub fn server_color(&self, kind: ServerType) -> ThemeColor {
        self.lookup(kind.as_str())
            .or_else(|| self.lookup("lab"))
            .unwrap_or(NEUTRAL)
    }

    /// Color for a named element; unknown elements fall back to a neutral
    /// default.
    pub fn element_color(&self, name: &str) -> ThemeColor {
        self.lookup(name).unwrap_or(NEUTRAL)
    }
}

static THEMES: &[Theme] = &[
    Theme {
        name: "default",
        colors: &[
            ("production", color("#FEE2E2", "#DC2626")),
            ("lab", color("#DCFCE7", "#16A34A")),
            ("local", color("#FEF9C3", "#CA8A04")),
            ("cluster", color("#E0F2FE", "#0284C7")),
            ("hypervisor", color("#FFF7ED", "#EA580C")),
            ("devices", color("#F3F4F6", "#6B7280")),
            ("cloud", color("#DBEAFE", "#2563EB")),
            ("database", color("#EDE9FE", "#7C3AED")),
            ("system", color("#E0E7FF", "#4F46E5")),
        ],
    },
    Theme {
        name: "dark",
        colors: &[
            ("production", color("#450A0A", "#EF4444")),
            ("lab", color("#052E16", "#22C55E")),
            ("local", color("#422006", "#EAB308")),
            ("cluster", color("#082F49", "#0EA5E9")),
            ("hypervisor", color("#431407", "#F97316")),
            ("devices", color("#1F2937", "#9CA3AF")),
            ("cloud", color("#1E3A5F", "#3B82F6")),
            ("database", color("#2E1065", "#A78BFA")),
            ("system", color("#1E1B4B", "#818CF8")),
        ],
    },
    Theme {
        name: "monochrome",
        colors: &[
            ("production", color("#E5E7EB", "#374151")),
            ("lab", color("#F3F4F6", "#6B7280")),
            ("local", color("#F9FAFB", "#9CA3AF")),
            ("cluster", color("#E5E7EB", "#4B5563")),
            ("hypervisor", color("#D1D5DB", "#374151")),
            ("devices", color("#F3F4F6", "#9CA3AF")),
            ("cloud", color("#E5E7EB", "#6B7280")),
            ("database", color("#D1D5DB", "#4B5563")),
            ("system", color("#E5E7EB", "#6B7280")),
        ],
    },
    Theme {
        name: "ocean",
        colors: &[
            ("production", color("#FEE2E2", "#DC2626")),
            ("lab", color("#CFFAFE", "#0891B2")),
            ("local", color("#E0F2FE", "#0284C7")),
            ("cluster", color("#DBEAFE", "#2563EB")),
            ("hypervisor", color("#C7D2FE", "#4F46E5")),
            ("devices", color("#F0F9FF", "#38BDF8")),
            ("cloud", color("#E0F2FE", "#0EA5E9")),
            ("database", color("#C7D2FE", "#6366F1")),
            ("system", color("#DBEAFE", "#3B82F6")),
        ],
    },
];

/// The named theme, or the default theme when the name is unknown.
pub fn theme(name: &str) -> &'static Theme {
    THEMES
        .iter()
        .find(|t| t.name == name)
        .unwrap_or(&THEMES[0])
}

/// All available theme names.
pub fn theme_names() -> Vec<&'static str> {
    THEMES.iter().map(|t| t.name).collect()
}
