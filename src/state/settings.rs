//! Persisted user settings
//!
//! Stored as JSON in the user's configuration directory:
//! - Linux: ~/.config/raw-culler/settings.json
//! - macOS: ~/Library/Application Support/raw-culler/settings.json
//! - Windows: %APPDATA%\raw-culler\settings.json
//!
//! Missing fields fall back to their defaults, so older files keep loading.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SettingsError;
use crate::raw::pipeline::{PipelineConfig, MAX_PARALLEL};
use crate::raw::thumbnail::{DEFAULT_MAX_SIZE, DEFAULT_QUALITY};

pub const MIN_GRID_SIZE: u16 = 120;
pub const MAX_GRID_SIZE: u16 = 400;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// Which preview extraction service RAW files go through
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PreviewBackend {
    /// exiftool when it is installed, the built-in extractor otherwise
    #[default]
    Auto,
    ExifTool,
    Embedded,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub theme: Theme,

    /// Grid cell edge in pixels (120 to 400)
    pub grid_size: u16,

    /// Quiet period before ratings are written
    /// - 0 disables automatic writes (manual save only)
    pub autosave_interval_ms: u64,

    /// Maximum simultaneous thumbnail generations
    pub max_thumbnail_tasks: usize,

    /// Longest edge of generated thumbnails
    pub thumbnail_max_size: u32,

    /// JPEG quality of generated thumbnails (1 to 100)
    pub thumbnail_quality: u8,

    pub preview_backend: PreviewBackend,
    pub exiftool_path: PathBuf,

    /// Keep the display buffers read while scanning a folder.
    /// When off they are dropped and loaded again on demand.
    pub retain_scan_buffers: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            grid_size: 200,
            autosave_interval_ms: 400,
            max_thumbnail_tasks: MAX_PARALLEL,
            thumbnail_max_size: DEFAULT_MAX_SIZE,
            thumbnail_quality: DEFAULT_QUALITY,
            preview_backend: PreviewBackend::Auto,
            exiftool_path: PathBuf::from("exiftool"),
            retain_scan_buffers: true,
        }
    }
}

impl Settings {
    /// Location of the settings file
    pub fn path() -> Result<PathBuf, SettingsError> {
        let mut path = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        path.push("raw-culler");
        path.push("settings.json");
        Ok(path)
    }

    /// Load settings, falling back to defaults on any problem
    pub fn load() -> Self {
        let result = Self::path().and_then(|path| Self::load_from(&path));
        match result {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!("⚠️  Using default settings: {}", err);
                Self::default()
            }
        }
    }

    /// Read settings from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        match fs::read_to_string(path) {
            Ok(json) => Ok(Self::from_json(&json)?.sanitized()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        tracing::debug!("💾 Settings saved to {}", path.display());
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Pull every numeric field back into its accepted range
    pub fn sanitized(mut self) -> Self {
        self.grid_size = self.grid_size.clamp(MIN_GRID_SIZE, MAX_GRID_SIZE);
        self.max_thumbnail_tasks = self.max_thumbnail_tasks.max(1);
        self.thumbnail_max_size = self.thumbnail_max_size.max(16);
        self.thumbnail_quality = self.thumbnail_quality.clamp(1, 100);
        self
    }

    /// Debounce interval, or `None` when autosave is disabled
    pub fn autosave_interval(&self) -> Option<Duration> {
        (self.autosave_interval_ms > 0).then(|| Duration::from_millis(self.autosave_interval_ms))
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            max_parallel: self.max_thumbnail_tasks.max(1),
            max_size: self.thumbnail_max_size,
            quality: self.thumbnail_quality,
        }
    }
}
