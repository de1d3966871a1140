//! Configuration file loading and saving
//!
//! Loads user configuration from `~/.config/loopcam/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::{DeliveryPolicy, SessionConfig, WriteMode};
use crate::error::{LoopcamError, Result};
use crate::formats::PixelFormat;
use crate::types::{DeviceSelection, FrameRate};

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Default frame settings
    #[serde(default)]
    pub defaults: DefaultSettings,

    /// Output device settings
    #[serde(default)]
    pub output: OutputSettings,
}

/// Default frame settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultSettings {
    /// Frame width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Frame height in pixels
    #[serde(default = "default_height")]
    pub height: u32,

    /// Frames per second
    #[serde(default = "default_fps")]
    pub fps: f64,

    /// Source pixel format (rgb, bgr, gray, i420, nv12, yuyv, uyvy)
    #[serde(default = "default_format")]
    pub format: String,

    /// Log the measured frame rate
    #[serde(default)]
    pub log_fps: bool,
}

/// Output device settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Device paths; empty selects the first free loopback device
    #[serde(default)]
    pub devices: Vec<String>,

    /// Delivery policy (best-effort, any, all, at-least:N)
    #[serde(default = "default_policy")]
    pub policy: String,

    /// Write mode (sequential, parallel)
    #[serde(default = "default_write_mode")]
    pub write_mode: String,
}

// Default value functions
fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

fn default_fps() -> f64 {
    30.0
}

fn default_format() -> String {
    "rgb".to_string()
}

fn default_policy() -> String {
    "any".to_string()
}

fn default_write_mode() -> String {
    "sequential".to_string()
}

impl Default for DefaultSettings {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            format: default_format(),
            log_fps: false,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            policy: default_policy(),
            write_mode: default_write_mode(),
        }
    }
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("loopcam").join("config.toml")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("loopcam")
                .join("config.toml")
        } else {
            PathBuf::from("/etc/loopcam/config.toml")
        }
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| LoopcamError::Config(format!("Failed to read config file: {}", e)))?;

        let config: ConfigFile = toml::from_str(&content)?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration, logging warnings but returning defaults on error
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::default_path())
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    LoopcamError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)?;

        std::fs::write(&path, content)
            .map_err(|e| LoopcamError::Config(format!("Failed to write config file: {}", e)))?;

        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Build a session config from the file's settings
    pub fn to_session_config(&self) -> Result<SessionConfig> {
        let format: PixelFormat = self.defaults.format.parse()?;
        let policy: DeliveryPolicy = self
            .output
            .policy
            .parse()
            .map_err(LoopcamError::Config)?;
        let write_mode: WriteMode = self
            .output
            .write_mode
            .parse()
            .map_err(LoopcamError::Config)?;

        let devices = match self.output.devices.as_slice() {
            [] => DeviceSelection::Auto,
            [single] => DeviceSelection::Single(single.clone()),
            many => DeviceSelection::List(many.to_vec()),
        };

        Ok(SessionConfig {
            width: self.defaults.width,
            height: self.defaults.height,
            fps: FrameRate::new(self.defaults.fps),
            format,
            devices,
            policy,
            write_mode,
            log_fps: self.defaults.log_fps,
        })
    }
}

/// Generate a sample configuration file
pub fn sample_config() -> String {
    r#"# loopcam configuration

[defaults]
# Frame size in pixels (even values for rgb, bgr and the YUV formats)
width = 1280
height = 720

# Target frames per second
fps = 30.0

# Pixel format of frames handed to the camera:
#   rgb, bgr  - converted once per frame to I420
#   gray, i420, nv12, yuyv, uyvy - written as-is
format = "rgb"

# Log the measured frame rate about once per second
log_fps = false

[output]
# v4l2loopback devices that receive every frame.
# Leave empty to use the first free device at /dev/video[0-99].
# Create several with: sudo modprobe v4l2loopback devices=3
devices = ["/dev/video0"]

# When a frame counts as delivered:
#   best-effort - always, failures are only logged
#   any         - at least one device took it (default)
#   at-least:N  - at least N devices took it
#   all         - every device took it
policy = "any"

# sequential (default) or parallel (one thread per device)
write_mode = "sequential"
"#
    .to_string()
}
