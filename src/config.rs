// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Stored as JSON in `$XDG_CONFIG_HOME/edge-viewer/config.json`. Every field
//! has a default, so partial files and files from older versions load.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::{app_info, capture};
use crate::errors::{AppError, AppResult};
use crate::processing::ProcessorKind;

/// Where frames come from
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Real camera through GStreamer
    #[default]
    Camera,
    /// Generated test pattern
    Synthetic,
}

/// Requested capture size and rate
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: capture::WIDTH,
            height: capture::HEIGHT,
            framerate: capture::FRAMERATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceKind,
    /// Device path to open; first back-facing camera when unset
    pub device_path: Option<String>,
    pub capture: CaptureSettings,
    pub processor: ProcessorKind,
    /// Canny hysteresis low threshold
    pub canny_low: f32,
    /// Canny hysteresis high threshold
    pub canny_high: f32,
    /// Where snapshots are written; pictures directory when unset
    pub snapshot_dir: Option<PathBuf>,
    /// Show frame rates in the window title
    pub show_stats: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceKind::Camera,
            device_path: None,
            capture: CaptureSettings::default(),
            processor: ProcessorKind::Canny,
            canny_low: 50.0,
            canny_high: 100.0,
            snapshot_dir: None,
            show_stats: true,
        }
    }
}

impl Config {
    /// Default config file location
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(app_info::APP_DIR).join("config.json"))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> AppResult<Self> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No config directory, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(AppError::Config(format!("{}: {}", path.display(), e))),
        };

        let config: Self = serde_json::from_str(&text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Write to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, text)?;
        debug!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Apply command-line overrides; flags that were given win over the file
    pub fn apply_overrides(
        &mut self,
        synthetic: bool,
        device: Option<String>,
        processor: Option<ProcessorKind>,
    ) {
        if synthetic {
            self.source = SourceKind::Synthetic;
        }
        if let Some(device) = device {
            self.device_path = Some(device);
        }
        if let Some(processor) = processor {
            self.processor = processor;
        }
    }

    /// Directory for snapshots
    pub fn snapshot_dir(&self) -> PathBuf {
        self.snapshot_dir.clone().unwrap_or_else(|| {
            dirs::picture_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."))
                .join(app_info::APP_DIR)
        })
    }
}
