//! Locally persisted user choices: unit system, last searched city and the
//! favorites list.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::model::{FavoriteCity, UnitSystem};

/// Storage the screen controller reads and writes. Injected, never global.
pub trait Preferences {
    fn unit(&self) -> UnitSystem;

    /// Flip metric/imperial, store it, and return the new value.
    fn toggle_unit(&mut self) -> Result<UnitSystem>;

    fn last_city(&self) -> Option<String>;

    fn save_last_city(&mut self, name: &str) -> Result<()>;

    fn favorites(&self) -> &[FavoriteCity];

    fn is_favorite(&self, name: &str, country: &str) -> bool {
        self.favorites().iter().any(|f| f.matches(name, country))
    }

    /// Returns `false` when the city was already a favorite.
    fn add_favorite(&mut self, city: FavoriteCity) -> Result<bool>;

    /// Returns `false` when the city was not a favorite.
    fn remove_favorite(&mut self, city: &FavoriteCity) -> Result<bool>;
}

/// The persisted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferenceData {
    #[serde(default)]
    pub unit: UnitSystem,
    #[serde(default)]
    pub last_city: Option<String>,
    #[serde(default)]
    pub favorites: Vec<FavoriteCity>,
}

impl PreferenceData {
    fn toggle_unit(&mut self) -> UnitSystem {
        self.unit = self.unit.toggled();
        self.unit
    }

    fn add_favorite(&mut self, city: FavoriteCity) -> bool {
        if self.favorites.iter().any(|f| f.matches(&city.name, &city.country)) {
            return false;
        }
        self.favorites.push(city);
        true
    }

    fn remove_favorite(&mut self, city: &FavoriteCity) -> bool {
        let before = self.favorites.len();
        self.favorites.retain(|f| !f.matches(&city.name, &city.country));
        self.favorites.len() != before
    }
}

/// In-process preferences. Nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    data: PreferenceData,
}

impl MemoryPreferences {
    pub fn new(data: PreferenceData) -> Self {
        Self { data }
    }
}

impl Preferences for MemoryPreferences {
    fn unit(&self) -> UnitSystem {
        self.data.unit
    }

    fn toggle_unit(&mut self) -> Result<UnitSystem> {
        Ok(self.data.toggle_unit())
    }

    fn last_city(&self) -> Option<String> {
        self.data.last_city.clone()
    }

    fn save_last_city(&mut self, name: &str) -> Result<()> {
        self.data.last_city = Some(name.to_string());
        Ok(())
    }

    fn favorites(&self) -> &[FavoriteCity] {
        &self.data.favorites
    }

    fn add_favorite(&mut self, city: FavoriteCity) -> Result<bool> {
        Ok(self.data.add_favorite(city))
    }

    fn remove_favorite(&mut self, city: &FavoriteCity) -> Result<bool> {
        Ok(self.data.remove_favorite(city))
    }
}

/// JSON-file backed preferences, rewritten after every change.
#[derive(Debug, Clone)]
pub struct FilePreferences {
    path: PathBuf,
    data: PreferenceData,
}

impl FilePreferences {
    /// Open the document at `path`, starting empty if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read preferences: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse preferences: {}", path.display()))?
        } else {
            PreferenceData::default()
        };

        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create preferences directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(&self.data)
            .context("Failed to serialize preferences")?;

        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write preferences: {}", self.path.display()))
    }
}

impl Preferences for FilePreferences {
    fn unit(&self) -> UnitSystem {
        self.data.unit
    }

    fn toggle_unit(&mut self) -> Result<UnitSystem> {
        let unit = self.data.toggle_unit();
        self.persist()?;
        Ok(unit)
    }

    fn last_city(&self) -> Option<String> {
        self.data.last_city.clone()
    }

    fn save_last_city(&mut self, name: &str) -> Result<()> {
        self.data.last_city = Some(name.to_string());
        self.persist()
    }

    fn favorites(&self) -> &[FavoriteCity] {
        &self.data.favorites
    }

    fn add_favorite(&mut self, city: FavoriteCity) -> Result<bool> {
        let added = self.data.add_favorite(city);
        if added {
            self.persist()?;
        }
        Ok(added)
    }

    fn remove_favorite(&mut self, city: &FavoriteCity) -> Result<bool> {
        let removed = self.data.remove_favorite(city);
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city(name: &str, country: &str) -> FavoriteCity {
        FavoriteCity {
            name: name.into(),
            country: country.into(),
            lat: 0.0,
            lon: 0.0,
            added_at: 1,
        }
    }

    #[test]
    fn defaults_to_metric_without_last_city() {
        let prefs = MemoryPreferences::default();
        assert_eq!(prefs.unit(), UnitSystem::Metric);
        assert!(prefs.last_city().is_none());
        assert!(prefs.favorites().is_empty());
    }

    #[test]
    fn duplicate_favorites_are_refused() {
        let mut prefs = MemoryPreferences::default();
        assert!(prefs.add_favorite(city("Nairobi", "KE")).unwrap());
        assert!(!prefs.add_favorite(city("NAIROBI", "ke")).unwrap());
        assert_eq!(prefs.favorites().len(), 1);
    }

    #[test]
    fn remove_matches_ignoring_case() {
        let mut prefs = MemoryPreferences::default();
        prefs.add_favorite(city("Nairobi", "KE")).unwrap();
        prefs.add_favorite(city("Lagos", "NG")).unwrap();

        assert!(prefs.remove_favorite(&city("nairobi", "Ke")).unwrap());
        assert!(!prefs.is_favorite("Nairobi", "KE"));
        assert!(prefs.is_favorite("lagos", "ng"));
        assert!(!prefs.remove_favorite(&city("Nairobi", "KE")).unwrap());
    }

    #[test]
    fn file_preferences_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs").join("preferences.json");

        {
            let mut prefs = FilePreferences::open(&path).unwrap();
            assert_eq!(prefs.toggle_unit().unwrap(), UnitSystem::Imperial);
            prefs.save_last_city("Kisumu").unwrap();
            prefs.add_favorite(city("Kisumu", "KE")).unwrap();
        }

        let prefs = FilePreferences::open(&path).unwrap();
        assert_eq!(prefs.unit(), UnitSystem::Imperial);
        assert_eq!(prefs.last_city().as_deref(), Some("Kisumu"));
        assert!(prefs.is_favorite("Kisumu", "KE"));
    }

    #[test]
    fn file_preferences_reject_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        fs::write(&path, "not json").unwrap();

        let err = FilePreferences::open(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse preferences"));
    }

    #[test]
    fn partial_document_fills_defaults() {
        let data: PreferenceData = serde_json::from_str(r#"{"unit":"imperial"}"#).unwrap();
        assert_eq!(data.unit, UnitSystem::Imperial);
        assert!(data.favorites.is_empty());
    }
}
