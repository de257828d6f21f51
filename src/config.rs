//! Configuration file handling for stopmo.
//!
//! Loads configuration from `~/.config/stopmo/config.toml` or a custom path.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::camera::Resolution;

/// Configuration file structure for stopmo.
/// Loaded from ~/.config/stopmo/config.toml (or custom path via --config).
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct ProjectConfig {
    /// Directory holding pics/, fullres/, data/ and the rendered video.
    /// Defaults to the current directory.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub device: u32,
    #[serde(default = "default_preview_resolution")]
    pub preview_resolution: [u32; 2],
    #[serde(default = "default_still_resolution")]
    pub still_resolution: [u32; 2],
    #[serde(default = "default_preview_sensor_mode")]
    pub preview_sensor_mode: u8,
    #[serde(default = "default_still_sensor_mode")]
    pub still_sensor_mode: u8,
    /// Milliseconds to let the sensor settle around a full-resolution still.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_saturation")]
    pub saturation: i32,
}

#[derive(Debug, Deserialize)]
pub struct DisplayConfig {
    /// Alpha applied to the live preview when onion skinning is toggled on.
    #[serde(default = "default_half_alpha")]
    pub half_alpha: u8,
    #[serde(default = "default_refresh_hz")]
    pub refresh_hz: u32,
}

#[derive(Debug, Deserialize)]
pub struct PlaybackConfig {
    /// Frame rate for in-terminal playback and the rendered video.
    #[serde(default = "default_fps")]
    pub fps: u32,
}

#[derive(Debug, Deserialize)]
pub struct EncoderConfig {
    /// Encoder executable. `avconv` takes the same arguments.
    #[serde(default = "default_encoder_program")]
    pub program: String,
    #[serde(default = "default_codec")]
    pub codec: String,
    /// Extra arguments inserted before the output path.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_preview_resolution() -> [u32; 2] {
    [Resolution::PREVIEW.width, Resolution::PREVIEW.height]
}

fn default_still_resolution() -> [u32; 2] {
    [Resolution::STILL.width, Resolution::STILL.height]
}

fn default_preview_sensor_mode() -> u8 {
    1
}

fn default_still_sensor_mode() -> u8 {
    2
}

fn default_settle_ms() -> u64 {
    800
}

fn default_saturation() -> i32 {
    25
}

fn default_half_alpha() -> u8 {
    128
}

fn default_refresh_hz() -> u32 {
    30
}

fn default_fps() -> u32 {
    12
}

fn default_encoder_program() -> String {
    "ffmpeg".to_string()
}

fn default_codec() -> String {
    "libx264".to_string()
}

// Manual Default impls so a missing section and an empty section
// deserialize to the same values.
impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: 0,
            preview_resolution: default_preview_resolution(),
            still_resolution: default_still_resolution(),
            preview_sensor_mode: default_preview_sensor_mode(),
            still_sensor_mode: default_still_sensor_mode(),
            settle_ms: default_settle_ms(),
            saturation: default_saturation(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            half_alpha: default_half_alpha(),
            refresh_hz: default_refresh_hz(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { fps: default_fps() }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            program: default_encoder_program(),
            codec: default_codec(),
            extra_args: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
                path: path.clone(),
                source: e,
            })?;
            let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.clone(),
                source: e,
            })?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    directories::ProjectDirs::from("com", "stopmo", "stopmo")
        .map(|d| d.config_dir().to_path_buf().join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/stopmo/config.toml")
        })
}
