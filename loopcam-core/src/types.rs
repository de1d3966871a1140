//! Core types for loopcam
//!
//! These types describe the frames and devices a camera session works with.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Resolution {
    /// Create a new resolution
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels in one frame
    pub fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether both dimensions are non-zero
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Whether both dimensions are even
    pub fn is_even(&self) -> bool {
        self.width % 2 == 0 && self.height % 2 == 0
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Target frames per second
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameRate(f64);

impl FrameRate {
    /// Slowest accepted rate, one frame every 1000 seconds
    pub const MIN: f64 = 1e-3;

    /// Create a frame rate (validated when the session opens)
    pub const fn new(fps: f64) -> Self {
        Self(fps)
    }

    /// Frames per second
    pub fn as_f64(&self) -> f64 {
        self.0
    }

    /// Whether the rate is finite and at least [`FrameRate::MIN`]
    pub fn is_valid(&self) -> bool {
        self.0.is_finite() && self.0 >= Self::MIN
    }

    /// Time between two frames
    ///
    /// Returns `Duration::ZERO` for invalid rates.
    pub fn interval(&self) -> Duration {
        if !self.is_valid() {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(1.0 / self.0).unwrap_or(Duration::ZERO)
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self(30.0)
    }
}

impl From<f64> for FrameRate {
    fn from(fps: f64) -> Self {
        Self(fps)
    }
}

impl From<u32> for FrameRate {
    fn from(fps: u32) -> Self {
        Self(fps as f64)
    }
}

impl std::fmt::Display for FrameRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}fps", self.0)
    }
}

/// Which output devices a session writes to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum DeviceSelection {
    /// Use the first free loopback device found on the system
    #[default]
    Auto,
    /// A single device identifier
    Single(String),
    /// An ordered list of device identifiers
    List(Vec<String>),
}

impl DeviceSelection {
    /// Normalize to an ordered list; `None` for auto selection
    pub fn to_list(&self) -> Option<Vec<String>> {
        match self {
            Self::Auto => None,
            Self::Single(id) => Some(vec![id.clone()]),
            Self::List(ids) => Some(ids.clone()),
        }
    }

    /// Whether devices are discovered rather than named
    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }
}

impl From<&str> for DeviceSelection {
    fn from(id: &str) -> Self {
        Self::Single(id.to_string())
    }
}

impl From<String> for DeviceSelection {
    fn from(id: String) -> Self {
        Self::Single(id)
    }
}

impl From<Vec<String>> for DeviceSelection {
    fn from(ids: Vec<String>) -> Self {
        Self::List(ids)
    }
}

impl From<Vec<&str>> for DeviceSelection {
    fn from(ids: Vec<&str>) -> Self {
        Self::List(ids.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for DeviceSelection {
    fn from(ids: [&str; N]) -> Self {
        Self::List(ids.iter().map(|id| id.to_string()).collect())
    }
}

impl std::fmt::Display for DeviceSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Single(id) => write!(f, "{}", id),
            Self::List(ids) => write!(f, "{}", ids.join(", ")),
        }
    }
}

/// A caller-supplied frame in the session's source format
///
/// Borrowed for the duration of one `send()`; the session never keeps it.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    data: &'a [u8],
}

impl<'a> RawFrame<'a> {
    /// Wrap a frame buffer
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Frame bytes
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<'a> From<&'a [u8]> for RawFrame<'a> {
    fn from(data: &'a [u8]) -> Self {
        Self::new(data)
    }
}

impl<'a> From<&'a Vec<u8>> for RawFrame<'a> {
    fn from(data: &'a Vec<u8>) -> Self {
        Self::new(data.as_slice())
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for RawFrame<'a> {
    fn from(data: &'a [u8; N]) -> Self {
        Self::new(data.as_slice())
    }
}
