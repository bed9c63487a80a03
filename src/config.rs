//! Startup configuration: the JSON file read once before the window opens,
//! plus the marker styling defaults.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default side length of the square window, in logical pixels.
pub const DEFAULT_WINDOW_SIZE: u32 = 700;
pub const DEFAULT_MAX_FRAMERATE: f64 = 60.0;
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// RGB colour for marker and overlay elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// How the robot marker sprite is drawn
#[derive(Debug, Clone)]
pub struct MarkerStyle {
    pub border_color: Color,
    pub border_width: f32,
    pub arrow_color: Color,
    pub arrow_width: f32,
    /// Distance from the sprite's top edge to the arrow tip, in pixels.
    pub arrow_tip_inset: f32,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            border_color: Color::new(0x00, 0xff, 0x00),
            border_width: 2.0,
            arrow_color: Color::new(0xff, 0x00, 0x00),
            arrow_width: 3.0,
            arrow_tip_inset: 10.0,
        }
    }
}

/// Heads-up text styling
#[derive(Debug, Clone)]
pub struct HudStyle {
    pub font_size: f32,
    pub color: Color,
    pub margin: i32,
    pub line_spacing: i32,
}

impl Default for HudStyle {
    fn default() -> Self {
        Self {
            font_size: 18.0,
            color: Color::new(0xff, 0xff, 0xff),
            margin: 8,
            line_spacing: 22,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
}

fn default_window_size() -> u32 {
    DEFAULT_WINDOW_SIZE
}

fn default_max_framerate() -> f64 {
    DEFAULT_MAX_FRAMERATE
}

/// Contents of `config.json`. Robot dimensions are in inches.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct FileConfig {
    pub field_image_path: PathBuf,
    pub robot_width: f64,
    pub robot_height: f64,
    #[serde(default = "default_window_size")]
    pub window_size: u32,
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    #[serde(default = "default_max_framerate")]
    pub max_framerate: f64,
}

impl FileConfig {
    /// Load and validate a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("ROBOT_WIDTH", self.robot_width),
            ("ROBOT_HEIGHT", self.robot_height),
            ("WINDOW_SIZE", self.window_size as f64),
            ("MAX_FRAMERATE", self.max_framerate),
        ];
        for (field, value) in checks {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        Ok(())
    }
}
