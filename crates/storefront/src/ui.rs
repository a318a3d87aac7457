//! Presentation state passed explicitly to templates.
//!
//! The theme preference lives in the session; whether the panel is open is
//! decided per response. Neither is global.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The visitor's chosen color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    Light,
    Dark,
    /// Follow the browser's color scheme.
    #[default]
    System,
}

impl ThemePreference {
    /// The preference after pressing the toggle: dark becomes light,
    /// anything else becomes dark.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light | Self::System => Self::Dark,
        }
    }

    /// The concrete theme to render, given the browser's color scheme.
    #[must_use]
    pub const fn resolve(self, prefers_dark: bool) -> Theme {
        match self {
            Self::Light => Theme::Light,
            Self::Dark => Theme::Dark,
            Self::System if prefers_dark => Theme::Dark,
            Self::System => Theme::Light,
        }
    }

    /// Identifier used in the session and in forms.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }
}

impl fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" => Ok(Self::System),
            other => Err(format!("unknown theme: {other}")),
        }
    }
}

/// A resolved theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    /// Value of the `data-theme` attribute.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// Theme toggle button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeToggleView {
    pub preference: ThemePreference,
}

impl ThemeToggleView {
    /// Accessible label of the button.
    pub const LABEL: &'static str = "Toggle dark mode";

    /// Icon shown on the button: a sun while dark is chosen, a moon otherwise.
    #[must_use]
    pub const fn icon(&self) -> &'static str {
        match self.preference {
            ThemePreference::Dark => "sun",
            ThemePreference::Light | ThemePreference::System => "moon",
        }
    }

    /// The button's accessible label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        Self::LABEL
    }
}

/// Whether the cart panel is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelState {
    #[default]
    Closed,
    Open,
}

impl PanelState {
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Everything a page needs to know about presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UiContext {
    pub theme: ThemePreference,
    /// The browser reported `prefers-color-scheme: dark`.
    pub prefers_dark: bool,
    pub panel: PanelState,
}

impl UiContext {
    /// Context for a theme preference with the panel closed.
    #[must_use]
    pub const fn new(theme: ThemePreference, prefers_dark: bool) -> Self {
        Self {
            theme,
            prefers_dark,
            panel: PanelState::Closed,
        }
    }

    /// The same context with the panel open.
    #[must_use]
    pub const fn with_panel_open(mut self) -> Self {
        self.panel = PanelState::Open;
        self
    }

    /// Value for the `data-theme` attribute.
    #[must_use]
    pub const fn data_theme(&self) -> &'static str {
        self.theme.resolve(self.prefers_dark).as_str()
    }

    /// The toggle button for this context.
    #[must_use]
    pub const fn toggle(&self) -> ThemeToggleView {
        ThemeToggleView {
            preference: self.theme,
        }
    }
}
