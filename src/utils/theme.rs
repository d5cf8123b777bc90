//! Built-in light and dark palettes.

use ratatui::style::Color;
use std::fmt;
use std::str::FromStr;

use crate::internal::storage::KvStore;

pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeMode {
    Light,
    #[default]
    Dark,
}

impl ThemeMode {
    pub fn toggle(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Stored preference first, then the configured default.
    pub fn resolve(kv: &KvStore, configured: &str) -> Self {
        kv.get(THEME_KEY)
            .and_then(|stored| stored.trim().parse().ok())
            .or_else(|| configured.parse().ok())
            .unwrap_or_default()
    }

    pub fn persist(self, kv: &KvStore) {
        kv.set(THEME_KEY, self.as_str());
    }
}

impl FromStr for ThemeMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(anyhow::anyhow!("unknown theme mode '{}'", other)),
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TuiTheme {
    pub mode: ThemeMode,
    pub background: Color,
    pub foreground: Color,
    pub muted: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub border: Color,
    pub accent: Color,
    pub link: Color,
    pub score: Color,
    pub favorite: Color,
    pub error: Color,
}

impl TuiTheme {
    pub fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Dark => Self {
                mode,
                background: Color::Rgb(0x1d, 0x20, 0x21),
                foreground: Color::Rgb(0xeb, 0xdb, 0xb2),
                muted: Color::Rgb(0x92, 0x83, 0x74),
                selection_bg: Color::Rgb(0x45, 0x85, 0x88),
                selection_fg: Color::Rgb(0xfb, 0xf1, 0xc7),
                border: Color::Rgb(0x66, 0x5c, 0x54),
                accent: Color::Rgb(0x8e, 0xc0, 0x7c),
                link: Color::Rgb(0x83, 0xa5, 0x98),
                score: Color::Rgb(0xfa, 0xbd, 0x2f),
                favorite: Color::Rgb(0xfb, 0x49, 0x34),
                error: Color::Rgb(0xfb, 0x49, 0x34),
            },
            ThemeMode::Light => Self {
                mode,
                background: Color::Rgb(0xfb, 0xf1, 0xc7),
                foreground: Color::Rgb(0x3c, 0x38, 0x36),
                muted: Color::Rgb(0x7c, 0x6f, 0x64),
                selection_bg: Color::Rgb(0x07, 0x66, 0x78),
                selection_fg: Color::Rgb(0xfb, 0xf1, 0xc7),
                border: Color::Rgb(0xa8, 0x99, 0x84),
                accent: Color::Rgb(0x42, 0x7b, 0x58),
                link: Color::Rgb(0x07, 0x66, 0x78),
                score: Color::Rgb(0xb5, 0x76, 0x14),
                favorite: Color::Rgb(0x9d, 0x00, 0x06),
                error: Color::Rgb(0x9d, 0x00, 0x06),
            },
        }
    }
}

impl Default for TuiTheme {
    fn default() -> Self {
        Self::for_mode(ThemeMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_toggle() {
        assert_eq!("Light".parse::<ThemeMode>().unwrap(), ThemeMode::Light);
        assert!("sepia".parse::<ThemeMode>().is_err());
        assert_eq!(ThemeMode::Dark.toggle(), ThemeMode::Light);
        assert_eq!(ThemeMode::Light.to_string(), "light");
    }

    #[test]
    fn test_stored_preference_wins() {
        let dir = tempfile::tempdir().unwrap();
        let kv = KvStore::at(dir.path());
        assert_eq!(ThemeMode::resolve(&kv, "light"), ThemeMode::Light);

        ThemeMode::Dark.persist(&kv);
        assert_eq!(ThemeMode::resolve(&kv, "light"), ThemeMode::Dark);
    }

    #[test]
    fn test_garbage_falls_back_to_default() {
        let kv = KvStore::disabled();
        assert_eq!(ThemeMode::resolve(&kv, "neon"), ThemeMode::Dark);
    }

    #[test]
    fn test_palettes_differ() {
        assert_ne!(
            TuiTheme::for_mode(ThemeMode::Light).background,
            TuiTheme::for_mode(ThemeMode::Dark).background
        );
        assert_eq!(TuiTheme::default().mode, ThemeMode::Dark);
    }
}
