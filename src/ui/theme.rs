//! Color schemes for the console.
//!
//! Themes are TOML documents with hex colors for each screen element and log
//! [`Tone`]. Built-in themes are compiled into the binary; custom ones are
//! loaded with [`Theme::from_file`].
//!
//! # Built-in Themes
//!
//! - `catppuccin-mocha`: Dark theme with warm tones (default)
//! - `catppuccin-latte`: Light theme with soft pastels
//!
//! # TOML Format
//!
//! ```toml
//! name = "my-theme"
//!
//! [colors]
//! title_fg = "#1e1e2e"
//! title_bg = "#89b4fa"
//! text = "#cdd6f4"
//! dim = "#6c7086"
//! border = "#45475a"
//! focus_border = "#f5c2e7"
//! prompt = "#a6e3a1"
//! info = "#89b4fa"
//! error = "#f38ba8"
//! timestamp = "#7f849c"
//! author = "#fab387"
//! own_author = "#a6e3a1"
//! attachment = "#94e2d5"
//! notice = "#f9e2af"
//! banner = "#cba6f7"
//! ```

use super::format::Tone;
use ratatui::style::{Color, Modifier, Style};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A named color scheme.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Theme {
    pub name: String,
    pub colors: ThemeColors,
}

/// Hex colors (`"#rrggbb"`) for every styled element.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThemeColors {
    /// Title bar text.
    pub title_fg: String,
    /// Title bar background. Transparent when unset.
    #[serde(default)]
    pub title_bg: Option<String>,

    pub text: String,
    /// Footer and secondary details.
    pub dim: String,

    pub border: String,
    /// Border of the focused pane.
    pub focus_border: String,
    pub prompt: String,

    pub info: String,
    pub error: String,
    pub timestamp: String,
    /// Message authors other than the bot.
    pub author: String,
    /// Messages written by the bot account.
    pub own_author: String,
    pub attachment: String,
    /// Activity in channels other than the selected one.
    pub notice: String,
    /// Section headers and mode banners.
    pub banner: String,
}

impl Theme {
    /// Loads a built-in theme by name.
    ///
    /// Returns `None` for unknown names.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let toml_str = match name {
            "catppuccin-mocha" => include_str!("../../themes/catppuccin-mocha.toml"),
            "catppuccin-latte" => include_str!("../../themes/catppuccin-latte.toml"),
            _ => return None,
        };

        toml::from_str(toml_str).ok()
    }

    /// Loads a theme from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a message if the file cannot be read or does not parse.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents = fs::read_to_string(path).map_err(|e| format!("Failed to read theme file: {e}"))?;

        toml::from_str(&contents).map_err(|e| format!("Failed to parse theme TOML: {e}"))
    }

    /// Parses `#rrggbb`. Malformed values become white.
    fn hex_to_color(hex: &str) -> Color {
        let hex = hex.trim_start_matches('#').trim();
        if hex.len() != 6 || !hex.is_ascii() {
            return Color::White;
        }

        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).unwrap_or(255);
        Color::Rgb(channel(0..2), channel(2..4), channel(4..6))
    }

    /// Foreground-only style for a hex color.
    #[must_use]
    pub fn fg(hex: &str) -> Style {
        Style::default().fg(Self::hex_to_color(hex))
    }

    /// Style for a log tone.
    #[must_use]
    pub fn tone(&self, tone: Tone) -> Style {
        let c = &self.colors;
        match tone {
            Tone::Plain => Self::fg(&c.text),
            Tone::Info => Self::fg(&c.info),
            Tone::Error => Self::fg(&c.error).add_modifier(Modifier::BOLD),
            Tone::Timestamp => Self::fg(&c.timestamp),
            Tone::Author => Self::fg(&c.author).add_modifier(Modifier::BOLD),
            Tone::OwnAuthor => Self::fg(&c.own_author).add_modifier(Modifier::BOLD),
            Tone::Attachment => Self::fg(&c.attachment),
            Tone::Notice => Self::fg(&c.notice).add_modifier(Modifier::ITALIC),
            Tone::Banner => Self::fg(&c.banner).add_modifier(Modifier::BOLD),
            Tone::Dim => Self::fg(&c.dim),
        }
    }

    #[must_use]
    pub fn title(&self) -> Style {
        let style = Self::fg(&self.colors.title_fg).add_modifier(Modifier::BOLD);
        match &self.colors.title_bg {
            Some(bg) => style.bg(Self::hex_to_color(bg)),
            None => style,
        }
    }

    /// Border style, highlighted when the pane has focus.
    #[must_use]
    pub fn border(&self, focused: bool) -> Style {
        if focused {
            Self::fg(&self.colors.focus_border)
        } else {
            Self::fg(&self.colors.border)
        }
    }

    #[must_use]
    pub fn prompt(&self) -> Style {
        Self::fg(&self.colors.prompt).add_modifier(Modifier::BOLD)
    }
}

impl Default for Theme {
    /// Catppuccin Mocha.
    ///
    /// # Panics
    ///
    /// Panics if the built-in theme fails to parse (should never occur).
    fn default() -> Self {
        Self::from_name("catppuccin-mocha").expect("Built-in catppuccin-mocha theme should always parse")
    }
}
