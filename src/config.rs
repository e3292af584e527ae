//! Run configuration and persisted settings.
//!
//! [`Settings`] are user defaults stored in
//! `~/.config/twilight-boxart/settings.json`; command-line arguments
//! override them and the result is a [`RunConfig`].

use crate::asset_key::DEFAULT_THUMBNAIL_BASE_URL;
use crate::catalog::source::DEFAULT_CATALOG_BASE_URL;
use crate::resolver::DEFAULT_FUZZY_THRESHOLD;
use crate::thumbnail::BOXART_SUBDIR;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// DAT cache folder relative to the SD card root.
pub const DAT_SUBDIR: &str = "no-intro";

fn default_catalog_base_url() -> String {
    DEFAULT_CATALOG_BASE_URL.to_string()
}

fn default_thumbnail_base_url() -> String {
    DEFAULT_THUMBNAIL_BASE_URL.to_string()
}

/// User settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Mirror of libretro-database's `metadat/no-intro` folder
    #[serde(default = "default_catalog_base_url")]
    pub catalog_base_url: String,

    /// Mirror of the libretro-thumbnails organisation
    #[serde(default = "default_thumbnail_base_url")]
    pub thumbnail_base_url: String,

    /// SD card root used when `--sdcard-dir` is not given
    #[serde(default)]
    pub sdcard_dir: String,

    #[serde(default)]
    pub fuzzy_threshold: Option<f64>,

    #[serde(default)]
    pub jobs: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog_base_url: default_catalog_base_url(),
            thumbnail_base_url: default_thumbnail_base_url(),
            sdcard_dir: String::new(),
            fuzzy_threshold: None,
            jobs: None,
        }
    }
}

impl Settings {
    /// Get the config directory path (~/.config/twilight-boxart)
    fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("twilight-boxart");

        Ok(config_dir)
    }

    /// Get the settings file path
    pub fn settings_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("settings.json"))
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        match Self::try_load() {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Could not load settings: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    fn try_load() -> Result<Self> {
        let path = Self::settings_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;

        serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create {:?}", config_dir))?;

        let path = Self::settings_path()?;
        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        std::fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// SD card root from settings, if set
    pub fn sdcard_dir(&self) -> Option<PathBuf> {
        (!self.sdcard_dir.is_empty()).then(|| PathBuf::from(&self.sdcard_dir))
    }
}

/// Configuration for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory scanned for ROMs
    pub rom_dir: PathBuf,

    /// SD card root (DAT cache and box art live below it)
    pub sdcard_dir: PathBuf,

    /// Rename resolved ROMs to their canonical titles
    pub rename: bool,

    /// Where to write the error log, if requested
    pub error_log: Option<PathBuf>,

    /// Hashing threads
    pub jobs: usize,

    /// Fuzzy match acceptance threshold
    pub fuzzy_threshold: f64,

    /// Download box art (off for identify/rename-only runs)
    pub fetch_artwork: bool,

    /// Replace box art that already exists
    pub force: bool,

    pub catalog_base_url: String,
    pub thumbnail_base_url: String,
}

impl RunConfig {
    /// Config with defaults for everything but the two directories.
    pub fn new(rom_dir: impl Into<PathBuf>, sdcard_dir: impl Into<PathBuf>) -> Self {
        Self {
            rom_dir: rom_dir.into(),
            sdcard_dir: sdcard_dir.into(),
            rename: false,
            error_log: None,
            jobs: 1,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            fetch_artwork: true,
            force: false,
            catalog_base_url: default_catalog_base_url(),
            thumbnail_base_url: default_thumbnail_base_url(),
        }
    }

    /// Fill unset values from settings.
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.catalog_base_url = settings.catalog_base_url.clone();
        self.thumbnail_base_url = settings.thumbnail_base_url.clone();
        if let Some(threshold) = settings.fuzzy_threshold {
            self.fuzzy_threshold = threshold;
        }
        if let Some(jobs) = settings.jobs {
            self.jobs = jobs;
        }
        self
    }

    /// DAT cache directory
    pub fn dat_dir(&self) -> PathBuf {
        self.sdcard_dir.join(DAT_SUBDIR)
    }

    /// TWiLight Menu++ box art directory
    pub fn boxart_dir(&self) -> PathBuf {
        self.sdcard_dir.join(BOXART_SUBDIR)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rom_dir.is_dir() {
            return Err(ConfigError::RomDirNotFound(self.rom_dir.clone()));
        }

        if !self.sdcard_dir.is_dir() {
            return Err(ConfigError::SdCardDirNotFound(self.sdcard_dir.clone()));
        }

        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(ConfigError::InvalidThreshold(self.fuzzy_threshold));
        }

        if self.jobs == 0 {
            return Err(ConfigError::ZeroJobs);
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("ROM directory not found: {0}")]
    RomDirNotFound(PathBuf),

    #[error("SD card directory not found: {0}")]
    SdCardDirNotFound(PathBuf),

    #[error("Fuzzy threshold must be between 0 and 1, got {0}")]
    InvalidThreshold(f64),

    #[error("At least one hashing job is required")]
    ZeroJobs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_derived_paths() {
        let config = RunConfig::new("/roms", "/media/sd");
        assert_eq!(config.jobs, 1);
        assert_eq!(config.dat_dir(), PathBuf::from("/media/sd/no-intro"));
        assert_eq!(config.boxart_dir(), PathBuf::from("/media/sd/_nds/TWiLightMenu/boxart"));
    }

    #[test]
    fn test_validate() {
        let tmp = TempDir::new().unwrap();
        let mut config = RunConfig::new(tmp.path(), tmp.path());
        assert!(config.validate().is_ok());

        config.fuzzy_threshold = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidThreshold(_))));

        config.fuzzy_threshold = 0.7;
        config.jobs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroJobs)));

        let missing = RunConfig::new(tmp.path().join("nope"), tmp.path());
        assert!(matches!(missing.validate(), Err(ConfigError::RomDirNotFound(_))));
    }

    #[test]
    fn test_settings_defaults_and_partial_json() {
        let settings: Settings = serde_json::from_str(r#"{"jobs": 4}"#).unwrap();
        assert_eq!(settings.catalog_base_url, DEFAULT_CATALOG_BASE_URL);
        assert_eq!(settings.thumbnail_base_url, DEFAULT_THUMBNAIL_BASE_URL);
        assert_eq!(settings.jobs, Some(4));
        assert!(settings.sdcard_dir().is_none());

        let config = RunConfig::new("/r", "/s").with_settings(&settings);
        assert_eq!(config.jobs, 4);
        assert_eq!(config.fuzzy_threshold, DEFAULT_FUZZY_THRESHOLD);
    }
}
