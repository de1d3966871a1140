//! Error types for loopcam

use thiserror::Error;

/// Result type alias using LoopcamError
pub type Result<T> = std::result::Result<T, LoopcamError>;

/// Main error type for loopcam operations
#[derive(Debug, Error)]
pub enum LoopcamError {
    /// Invalid session configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Device path does not exist
    #[error("Device {0} does not exist")]
    DeviceNotFound(String),

    /// Missing permissions on the device node
    #[error("Permission denied for {0}")]
    PermissionDenied(String),

    /// Device is already held by this process
    #[error("Device {0} is already in use")]
    DeviceBusy(String),

    /// Device could not be opened or is not a loopback output
    #[error("Device {device} could not be opened: {reason}")]
    DeviceOpen { device: String, reason: String },

    /// Output format could not be negotiated
    #[error("Device {device} could not be configured: {reason}")]
    DeviceSetup { device: String, reason: String },

    /// Auto selection found no usable loopback device
    #[error("No usable v4l2 loopback device found at /dev/video[0-99]")]
    NoLoopbackDevice,

    /// Raw frame does not match the configured resolution and format
    #[error("Invalid frame size: expected {expected} bytes, got {actual}")]
    InvalidFrameSize { expected: usize, actual: usize },

    /// A single sink failed to take a frame
    #[error("Error writing frame to {device}: {source}")]
    DeviceWrite {
        device: String,
        #[source]
        source: std::io::Error,
    },

    /// Frame did not reach enough sinks to satisfy the delivery policy
    #[error("Frame delivered to {delivered} of {attempted} devices (failed: {})", .failed.join(", "))]
    Delivery {
        delivered: usize,
        attempted: usize,
        failed: Vec<String>,
    },

    /// Session already closed
    #[error("Camera session is closed")]
    SessionClosed,

    /// Unsupported operation or format
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<LoopcamError>,
    },
}

impl LoopcamError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a device open error
    pub fn device_open(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DeviceOpen {
            device: device.into(),
            reason: reason.into(),
        }
    }

    /// Create a device setup error
    pub fn device_setup(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DeviceSetup {
            device: device.into(),
            reason: reason.into(),
        }
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Strip any context wrappers
    pub fn root(&self) -> &LoopcamError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error was raised while acquiring a device
    pub fn is_device_open_error(&self) -> bool {
        matches!(
            self.root(),
            Self::DeviceNotFound(_)
                | Self::PermissionDenied(_)
                | Self::DeviceBusy(_)
                | Self::DeviceOpen { .. }
                | Self::DeviceSetup { .. }
        )
    }

    /// Whether auto selection may move on to the next candidate
    ///
    /// Permission and format failures affect every candidate alike, so they abort.
    pub fn is_skippable_candidate(&self) -> bool {
        matches!(
            self.root(),
            Self::DeviceNotFound(_) | Self::DeviceBusy(_) | Self::DeviceOpen { .. }
        )
    }

    /// Actionable hint for the user, if one applies
    pub fn user_hint(&self) -> Option<&'static str> {
        match self.root() {
            Self::Config(_) => Some(
                "Check width, height, fps and devices, or the config.toml in ~/.config/loopcam",
            ),
            Self::DeviceNotFound(_) | Self::NoLoopbackDevice => Some(
                "Load the module with 'sudo modprobe v4l2loopback devices=N' and run 'loopcam list'",
            ),
            Self::PermissionDenied(_) => Some(
                "Add your user to the 'video' group ('usermod -a -G video $USER') and log in again",
            ),
            Self::DeviceBusy(_) => {
                Some("Each device can only be used once per process; pick another device")
            }
            Self::DeviceOpen { .. } => {
                Some("Make sure the device is a v4l2loopback output device ('loopcam list')")
            }
            Self::InvalidFrameSize { .. } => {
                Some("Frames must match the session resolution and pixel format exactly")
            }
            _ => None,
        }
    }

    /// Whether the user can fix this without code changes
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self.root(),
            Self::Config(_)
                | Self::DeviceNotFound(_)
                | Self::PermissionDenied(_)
                | Self::DeviceBusy(_)
                | Self::DeviceOpen { .. }
                | Self::NoLoopbackDevice
                | Self::InvalidFrameSize { .. }
        )
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl From<toml::de::Error> for LoopcamError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("Failed to parse config file: {}", err))
    }
}

impl From<toml::ser::Error> for LoopcamError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Config(format!("Failed to serialize config: {}", err))
    }
}
