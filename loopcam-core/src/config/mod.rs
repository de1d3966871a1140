//! Configuration types for loopcam
//!
//! Provides session settings, delivery policies and the config file.

mod file;

pub use file::{sample_config, ConfigFile, DefaultSettings, OutputSettings};

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{LoopcamError, Result};
use crate::formats::PixelFormat;
use crate::types::{DeviceSelection, FrameRate, Resolution};

/// When a frame counts as delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryPolicy {
    /// Succeed once every sink has been attempted, whatever the outcome
    BestEffort,
    /// Succeed if at least one sink took the frame
    #[default]
    Any,
    /// Succeed if at least this many sinks took the frame
    AtLeast(usize),
    /// Succeed only if every sink took the frame
    All,
}

impl DeliveryPolicy {
    /// Whether `delivered` successes out of `attempted` satisfy the policy
    pub fn is_satisfied(&self, delivered: usize, attempted: usize) -> bool {
        match self {
            Self::BestEffort => true,
            Self::Any => delivered >= 1,
            Self::AtLeast(n) => delivered >= *n,
            Self::All => delivered == attempted,
        }
    }
}

impl std::fmt::Display for DeliveryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BestEffort => write!(f, "best-effort"),
            Self::Any => write!(f, "any"),
            Self::AtLeast(n) => write!(f, "at-least:{}", n),
            Self::All => write!(f, "all"),
        }
    }
}

impl std::str::FromStr for DeliveryPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        match lower.as_str() {
            "best-effort" | "besteffort" | "none" => Ok(Self::BestEffort),
            "any" | "one" => Ok(Self::Any),
            "all" => Ok(Self::All),
            _ => lower
                .strip_prefix("at-least:")
                .and_then(|n| n.trim().parse().ok())
                .map(Self::AtLeast)
                .ok_or_else(|| format!("Unknown delivery policy: {}", s)),
        }
    }
}

/// How a frame is written to multiple sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// One sink after another on the caller's thread
    #[default]
    Sequential,
    /// One scoped thread per sink, joined before returning
    Parallel,
}

impl std::fmt::Display for WriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Parallel => write!(f, "parallel"),
        }
    }
}

impl std::str::FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" | "serial" => Ok(Self::Sequential),
            "parallel" | "concurrent" => Ok(Self::Parallel),
            _ => Err(format!("Unknown write mode: {}", s)),
        }
    }
}

/// Full camera session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Target frame rate
    pub fps: FrameRate,
    /// Pixel format of frames passed to `send()`
    #[serde(default)]
    pub format: PixelFormat,
    /// Output devices
    #[serde(default)]
    pub devices: DeviceSelection,
    /// When a frame counts as delivered
    #[serde(default)]
    pub policy: DeliveryPolicy,
    /// Sequential or parallel sink writes
    #[serde(default)]
    pub write_mode: WriteMode,
    /// Log the measured frame rate about once per second
    #[serde(default)]
    pub log_fps: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: FrameRate::default(),
            format: PixelFormat::default(),
            devices: DeviceSelection::default(),
            policy: DeliveryPolicy::default(),
            write_mode: WriteMode::default(),
            log_fps: false,
        }
    }
}

impl SessionConfig {
    /// Create a config for RGB frames at the given size and rate
    pub fn new(width: u32, height: u32, fps: impl Into<FrameRate>) -> Self {
        Self {
            width,
            height,
            fps: fps.into(),
            ..Default::default()
        }
    }

    /// Set the output devices
    pub fn with_devices(mut self, devices: impl Into<DeviceSelection>) -> Self {
        self.devices = devices.into();
        self
    }

    /// Set the source pixel format
    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the delivery policy
    pub fn with_policy(mut self, policy: DeliveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the write mode
    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    /// Enable periodic frame-rate logging
    pub fn with_fps_logging(mut self, enabled: bool) -> Self {
        self.log_fps = enabled;
        self
    }

    /// Frame dimensions
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Time between frames
    pub fn frame_interval(&self) -> Duration {
        self.fps.interval()
    }

    /// Check the settings a session cannot open without
    pub fn validate(&self) -> Result<()> {
        let resolution = self.resolution();
        if !resolution.is_valid() {
            return Err(LoopcamError::config(format!(
                "Resolution must be positive, got {}",
                resolution
            )));
        }

        let native = self.format.native();
        if native.is_subsampled() && !resolution.is_even() {
            return Err(LoopcamError::config(format!(
                "{} output needs even width and height, got {}",
                native, resolution
            )));
        }

        if !self.fps.is_valid() {
            return Err(LoopcamError::config(format!(
                "Frame rate must be finite and at least {}, got {}",
                FrameRate::MIN,
                self.fps.as_f64()
            )));
        }

        match self.devices.to_list() {
            Some(list) if list.is_empty() => {
                return Err(LoopcamError::config("Device list cannot be empty"));
            }
            Some(list) if list.iter().any(|d| d.trim().is_empty()) => {
                return Err(LoopcamError::config("Device identifiers cannot be blank"));
            }
            Some(list) => {
                if let DeliveryPolicy::AtLeast(n) = self.policy {
                    if n > list.len() {
                        return Err(LoopcamError::config(format!(
                            "Policy {} can never be met with {} devices",
                            self.policy,
                            list.len()
                        )));
                    }
                }
            }
            None => {
                // Auto selection opens exactly one device
                if let DeliveryPolicy::AtLeast(n) = self.policy {
                    if n > 1 {
                        return Err(LoopcamError::config(format!(
                            "Policy {} needs an explicit device list; auto selection opens one device",
                            self.policy
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}
