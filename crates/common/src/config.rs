//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ScreenrecError, ScreenrecResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where finished recordings are exported.
    pub output_dir: PathBuf,

    /// Default recording settings.
    pub recording: RecordingDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default recording parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingDefaults {
    /// Requested resolution as `"<width>x<height>"`.
    pub resolution: String,

    /// Requested frame rate.
    pub fps: u32,

    /// Target video bitrate in kbps.
    pub bitrate_kbps: u32,

    /// Ask the display provider for system audio.
    pub system_audio: bool,

    /// Mix the microphone into the recording.
    pub microphone: bool,

    /// Media length covered by one recorder chunk, in milliseconds.
    pub chunk_interval_ms: u64,

    /// Cadence of elapsed-time/size refreshes, in milliseconds.
    pub ui_refresh_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "screenrec=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: dirs_default_recordings(),
            recording: RecordingDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RecordingDefaults {
    fn default() -> Self {
        Self {
            resolution: "1920x1080".to_string(),
            fps: 30,
            bitrate_kbps: 12_000,
            system_audio: true,
            microphone: false,
            chunk_interval_ms: 1000,
            ui_refresh_ms: 250,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

/// Parse a `"<width>x<height>"` string such as `1920x1080`.
pub fn parse_resolution(value: &str) -> ScreenrecResult<(u32, u32)> {
    let (w, h) = value
        .trim()
        .split_once(|c: char| c == 'x' || c == 'X')
        .ok_or_else(|| ScreenrecError::config(format!("Invalid resolution '{value}'")))?;
    let width: u32 = w
        .trim()
        .parse()
        .map_err(|_| ScreenrecError::config(format!("Invalid resolution width '{w}'")))?;
    let height: u32 = h
        .trim()
        .parse()
        .map_err(|_| ScreenrecError::config(format!("Invalid resolution height '{h}'")))?;
    if width == 0 || height == 0 {
        return Err(ScreenrecError::config(format!(
            "Resolution must be non-zero, got {width}x{height}"
        )));
    }
    Ok((width, height))
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> ScreenrecResult<PathBuf> {
        let config_path = config_file_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &std::path::Path) -> ScreenrecResult<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, json)?;
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("screenrec").join("config.json")
}

/// Default export directory.
fn dirs_default_recordings() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("screenrec").join("recordings")
}
