//! V4L2 loopback output
//!
//! Writes frames to v4l2loopback device nodes so other applications can
//! open them as webcams.
//!
//! ## Prerequisites
//!
//! ```bash
//! # One node per consumer
//! sudo modprobe v4l2loopback devices=3
//! ```

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use tracing::{debug, info, warn};
use v4l::capability::Flags;
use v4l::video::Output;
use v4l::{Device, FourCC};

use super::{DeviceBackend, OutputDevice, OutputFormat};
use crate::error::{LoopcamError, Result};

/// Highest `/dev/videoN` index scanned during discovery (exclusive)
pub const MAX_VIDEO_NODES: u32 = 100;

/// Driver name reported by v4l2loopback in `VIDIOC_QUERYCAP`
const LOOPBACK_DRIVER: &str = "v4l2 loopback";

/// Device nodes currently held by this process
///
/// v4l2loopback lets a node be opened any number of times, so this is the
/// only thing stopping two sinks from sharing one node.
static ACTIVE_DEVICES: Mutex<BTreeSet<String>> = parking_lot::const_mutex(BTreeSet::new());

/// Claim on an entry of [`ACTIVE_DEVICES`], released on drop
#[derive(Debug)]
struct Reservation {
    path: String,
}

impl Reservation {
    fn acquire(path: &str) -> Result<Self> {
        let mut active = ACTIVE_DEVICES.lock();
        if !active.insert(path.to_string()) {
            return Err(LoopcamError::DeviceBusy(path.to_string()));
        }
        Ok(Self {
            path: path.to_string(),
        })
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        ACTIVE_DEVICES.lock().remove(&self.path);
    }
}

/// Backend for `/dev/videoN` loopback nodes
#[derive(Debug, Clone, Copy, Default)]
pub struct V4l2Backend;

impl V4l2Backend {
    /// Create the backend
    pub fn new() -> Self {
        Self
    }
}

impl DeviceBackend for V4l2Backend {
    fn open(&self, device: &str, format: &OutputFormat) -> Result<Box<dyn OutputDevice>> {
        Ok(Box::new(V4l2LoopbackDevice::open(device, format)?))
    }

    fn discover(&self) -> Vec<String> {
        find_loopback_devices()
    }
}

/// One configured loopback node
struct V4l2LoopbackDevice {
    path: String,
    /// Write-only handle frames go through
    file: Option<File>,
    /// Control handle used for capability and format ioctls
    control: Option<Device>,
    reservation: Option<Reservation>,
}

impl V4l2LoopbackDevice {
    fn open(path: &str, format: &OutputFormat) -> Result<Self> {
        let reservation = Reservation::acquire(path)?;

        let file = OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => LoopcamError::DeviceNotFound(path.to_string()),
                std::io::ErrorKind::PermissionDenied => {
                    LoopcamError::PermissionDenied(path.to_string())
                }
                _ => LoopcamError::device_open(path, e.to_string()),
            })?;

        let control =
            Device::with_path(path).map_err(|e| LoopcamError::device_open(path, e.to_string()))?;

        let caps = control.query_caps().map_err(|e| {
            LoopcamError::device_open(path, format!("capabilities could not be queried: {}", e))
        })?;
        if !caps.capabilities.contains(Flags::VIDEO_OUTPUT) {
            return Err(LoopcamError::device_open(path, "not a video output device"));
        }
        if caps.driver != LOOPBACK_DRIVER {
            return Err(LoopcamError::device_open(
                path,
                format!("driver '{}' is not v4l2 loopback", caps.driver),
            ));
        }

        // v4l2loopback fills in sizeimage and colorspace itself
        let fourcc = FourCC::new(&format.pixel_format.fourcc());
        let mut requested =
            v4l::Format::new(format.resolution.width, format.resolution.height, fourcc);
        requested.stride = format.bytes_per_line();
        let applied = Output::set_format(&control, &requested)
            .map_err(|e| LoopcamError::device_setup(path, e.to_string()))?;

        if applied.width != requested.width
            || applied.height != requested.height
            || applied.fourcc != fourcc
            || applied.stride != requested.stride
        {
            warn!(
                "{} negotiated {}x{} {} (stride {}) instead of {}x{} {} (stride {})",
                path,
                applied.width,
                applied.height,
                applied.fourcc,
                applied.stride,
                requested.width,
                requested.height,
                fourcc,
                requested.stride
            );
        }
        debug!(
            "Set V4L2 output format on {}: {}x{}, fourcc={}, sizeimage={}",
            path, applied.width, applied.height, applied.fourcc, applied.size
        );

        info!("V4L2 loopback device {} opened ({})", path, caps.card);
        Ok(Self {
            path: path.to_string(),
            file: Some(file),
            control: Some(control),
            reservation: Some(reservation),
        })
    }
}

impl OutputDevice for V4l2LoopbackDevice {
    fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.write_all(frame),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                format!("{} is closed", self.path),
            )),
        }
    }

    fn close(&mut self) -> std::io::Result<()> {
        self.file = None;
        self.control = None;
        self.reservation = None;
        Ok(())
    }
}

impl Drop for V4l2LoopbackDevice {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Find v4l2loopback output nodes at `/dev/video[0-99]`
pub fn find_loopback_devices() -> Vec<String> {
    (0..MAX_VIDEO_NODES)
        .map(|i| format!("/dev/video{}", i))
        .filter(|path| Path::new(path).exists())
        .filter(|path| is_loopback_device(path))
        .collect()
}

/// Check whether `path` is a v4l2loopback output node
pub fn is_loopback_device(path: &str) -> bool {
    let Ok(device) = Device::with_path(path) else {
        return false;
    };
    match device.query_caps() {
        Ok(caps) => {
            caps.capabilities.contains(Flags::VIDEO_OUTPUT) && caps.driver == LOOPBACK_DRIVER
        }
        Err(e) => {
            debug!("Could not query {}: {}", path, e);
            false
        }
    }
}
