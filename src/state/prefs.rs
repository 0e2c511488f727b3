use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("could not write preferences: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode preferences: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// Colour scheme of the window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    #[default]
    Light,
    Dark,
}

impl ThemeChoice {
    pub const ALL: [ThemeChoice; 2] = [ThemeChoice::Light, ThemeChoice::Dark];

    /// Anything but "dark" is light
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("dark") {
            ThemeChoice::Dark
        } else {
            ThemeChoice::Light
        }
    }
}

impl<'de> Deserialize<'de> for ThemeChoice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(ThemeChoice::parse(&String::deserialize(deserializer)?))
    }
}

impl fmt::Display for ThemeChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ThemeChoice::Light => "Light",
            ThemeChoice::Dark => "Dark",
        })
    }
}

/// Local UI preferences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prefs {
    pub theme: ThemeChoice,
}

/// Preferences file on disk
#[derive(Debug, Clone)]
pub struct PrefsStore {
    path: PathBuf,
}

impl PrefsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `prefs.toml` next to the backend config
    pub fn default_location() -> Option<Self> {
        let mut path = dirs::config_dir().or_else(dirs::home_dir)?;
        path.push("test-case-board");
        path.push("prefs.toml");
        Some(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read preferences, falling back to defaults when the file is
    /// missing or unreadable
    pub fn load(&self) -> Prefs {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Prefs::default(),
            Err(e) => {
                warn!("⚠️  Could not read {}: {}", self.path.display(), e);
                return Prefs::default();
            }
        };
        toml::from_str(&raw).unwrap_or_else(|e| {
            warn!("⚠️  Ignoring invalid preferences in {}: {}", self.path.display(), e);
            Prefs::default()
        })
    }

    pub fn save(&self, prefs: &Prefs) -> Result<(), PrefsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, toml::to_string(prefs)?)?;
        Ok(())
    }
}
