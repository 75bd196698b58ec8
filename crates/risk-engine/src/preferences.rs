//! Durable user settings stored as a flat JSON file

use crate::map::{MAX_ZOOM, MIN_ZOOM};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_ZOOM: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notifications {
    pub email: bool,
    pub push: bool,
    pub risk_alerts: bool,
}

impl Default for Notifications {
    fn default() -> Self {
        Self {
            email: true,
            push: false,
            risk_alerts: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme: Theme,
    pub notifications: Notifications,
    pub default_zoom: u8,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            notifications: Notifications::default(),
            default_zoom: DEFAULT_ZOOM,
        }
    }
}

impl Preferences {
    pub fn sanitized(mut self) -> Self {
        self.default_zoom = self.default_zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self
    }
}

#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file yields defaults
    pub fn load(&self) -> Result<Preferences> {
        if !self.path.exists() {
            debug!("No preferences at {}, using defaults", self.path.display());
            return Ok(Preferences::default());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let prefs: Preferences = serde_json::from_str(&raw)?;
        Ok(prefs.sanitized())
    }

    pub fn save(&self, prefs: &Preferences) -> Result<Preferences> {
        let prefs = prefs.clone().sanitized();
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&prefs)?)?;
        info!("Saved preferences to {}", self.path.display());
        Ok(prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::new(dir.path().join("prefs.json"));
        assert_eq!(store.load().unwrap(), Preferences::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::new(dir.path().join("nested").join("prefs.json"));
        let prefs = Preferences {
            theme: Theme::Dark,
            notifications: Notifications {
                email: false,
                push: true,
                risk_alerts: false,
            },
            default_zoom: 11,
        };
        store.save(&prefs).unwrap();
        assert_eq!(store.load().unwrap(), prefs);
    }

    #[test]
    fn test_zoom_clamped_on_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, r#"{"theme":"auto","default_zoom":40}"#).unwrap();

        let store = PreferenceStore::new(&path);
        let loaded = store.load().unwrap();
        assert_eq!(loaded.theme, Theme::Auto);
        assert_eq!(loaded.default_zoom, MAX_ZOOM);
        assert_eq!(loaded.notifications, Notifications::default());

        let saved = store
            .save(&Preferences {
                default_zoom: 0,
                ..Preferences::default()
            })
            .unwrap();
        assert_eq!(saved.default_zoom, MIN_ZOOM);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(PreferenceStore::new(&path).load().is_err());
    }
}
