//! Camera session lifecycle
//!
//! A [`CameraSession`] holds every device it opened until it is closed or
//! dropped. Typical loop:
//!
//! ```no_run
//! use loopcam_core::{CameraSession, SessionConfig};
//!
//! let config = SessionConfig::new(1280, 720, 20)
//!     .with_devices(["/dev/video0", "/dev/video1"]);
//! let mut cam = CameraSession::open(config)?;
//! let frame = vec![0u8; 1280 * 720 * 3];
//! for _ in 0..60 {
//!     cam.send(&frame)?;
//!     cam.sleep_until_next_frame();
//! }
//! # Ok::<(), loopcam_core::LoopcamError>(())
//! ```
//!
//! `send()` and `close()` both take `&mut self`, so a close can never run
//! while a send is in flight.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::convert::FormatConverter;
use crate::distributor::{DistributionReport, FrameDistributor};
use crate::error::{LoopcamError, Result};
use crate::formats::PixelFormat;
use crate::output::{DeviceBackend, OutputFormat, SinkHandle, V4l2Backend};
use crate::pacer::FramePacer;
use crate::performance::{SessionMetrics, SessionStats};
use crate::types::{FrameRate, RawFrame, Resolution};

/// An open virtual camera writing to one or more devices
#[derive(Debug)]
pub struct CameraSession {
    config: SessionConfig,
    distributor: FrameDistributor,
    pacer: FramePacer,
    metrics: SessionMetrics,
    closed: bool,
}

impl CameraSession {
    /// Open a session on v4l2loopback devices
    pub fn open(config: SessionConfig) -> Result<Self> {
        Self::open_with_backend(config, &V4l2Backend::new())
    }

    /// Open a session through a custom device backend
    ///
    /// If any listed device fails to open, the devices opened before it
    /// are closed and the error is returned.
    pub fn open_with_backend(config: SessionConfig, backend: &dyn DeviceBackend) -> Result<Self> {
        config.validate()?;

        let resolution = config.resolution();
        let format = OutputFormat {
            resolution,
            pixel_format: config.format.native(),
        };

        let sinks = match config.devices.to_list() {
            Some(devices) => open_all(backend, &devices, &format)?,
            None => vec![open_first_available(backend, &format)?],
        };

        let converter = FormatConverter::new(config.format, resolution);
        let distributor =
            FrameDistributor::new(converter, sinks, config.policy, config.write_mode);
        let pacer = FramePacer::new(config.fps).with_fps_logging(config.log_fps);

        info!(
            "Camera session open: {} @ {} ({} -> {}) on {}",
            resolution,
            config.fps,
            config.format,
            format.pixel_format,
            distributor.devices().join(", ")
        );

        Ok(Self {
            config,
            distributor,
            pacer,
            metrics: SessionMetrics::new(),
            closed: false,
        })
    }

    /// Convert a frame once and write it to every device
    ///
    /// A wrongly sized frame fails with `InvalidFrameSize` and leaves the
    /// session usable. Per-device failures are listed in the report; the
    /// call fails with `Delivery` only when the policy is not met.
    pub fn send<'a>(&mut self, frame: impl Into<RawFrame<'a>>) -> Result<DistributionReport> {
        if self.closed {
            return Err(LoopcamError::SessionClosed);
        }

        match self.distributor.distribute(frame.into()) {
            Ok(report) => {
                self.metrics
                    .record_frame(report.conversion, !report.is_complete());
                Ok(report)
            }
            Err(e @ LoopcamError::Delivery { .. }) => {
                self.metrics
                    .record_frame(self.distributor.converter().last_duration(), true);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Block until the next frame is due; returns the time slept
    ///
    /// The first call only records a baseline. Late calls return at once.
    pub fn sleep_until_next_frame(&mut self) -> Duration {
        self.pacer.sleep_until_next_frame()
    }

    /// Close every device; later calls do nothing
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.distributor.close_all();
        self.closed = true;
        info!(
            "Camera session closed after {} frames",
            self.metrics.frames_sent()
        );
        debug!("{}", self.stats().format_line());
    }

    /// Whether the session has been closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Device identifiers in delivery order
    pub fn devices(&self) -> Vec<String> {
        self.distributor.devices()
    }

    /// Device identifiers joined with ", "
    pub fn device_label(&self) -> String {
        self.devices().join(", ")
    }

    /// Frame dimensions
    pub fn resolution(&self) -> Resolution {
        self.config.resolution()
    }

    /// Frame width
    pub fn width(&self) -> u32 {
        self.config.width
    }

    /// Frame height
    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// Target frame rate
    pub fn fps(&self) -> FrameRate {
        self.config.fps
    }

    /// Measured frame rate
    pub fn current_fps(&self) -> f64 {
        self.pacer.current_fps()
    }

    /// Pixel format `send()` expects
    pub fn source_format(&self) -> PixelFormat {
        self.config.format
    }

    /// Pixel format written to the devices
    pub fn native_format(&self) -> PixelFormat {
        self.distributor.converter().target_format()
    }

    /// Bytes `send()` expects per frame
    pub fn frame_size(&self) -> usize {
        self.distributor.converter().input_len()
    }

    /// Frames accepted so far
    pub fn frames_sent(&self) -> u64 {
        self.metrics.frames_sent()
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Statistics snapshot
    pub fn stats(&self) -> SessionStats {
        self.metrics.snapshot(
            self.distributor.converter().conversions(),
            self.pacer.current_fps(),
            self.distributor.sink_stats(),
        )
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Open every device in order, closing the opened ones if any fails
fn open_all(
    backend: &dyn DeviceBackend,
    devices: &[String],
    format: &OutputFormat,
) -> Result<Vec<SinkHandle>> {
    let mut sinks = Vec::with_capacity(devices.len());
    for device in devices {
        match SinkHandle::open(backend, device, format) {
            Ok(sink) => sinks.push(sink),
            Err(e) => {
                if !sinks.is_empty() {
                    warn!(
                        "Opening {} failed, closing {} already open device(s)",
                        device,
                        sinks.len()
                    );
                }
                for sink in &mut sinks {
                    sink.close();
                }
                return Err(e);
            }
        }
    }
    Ok(sinks)
}

/// Open the first discovered device that is free and usable
fn open_first_available(backend: &dyn DeviceBackend, format: &OutputFormat) -> Result<SinkHandle> {
    let candidates = backend.discover();
    debug!("Auto selection candidates: {:?}", candidates);

    for device in &candidates {
        match SinkHandle::open(backend, device, format) {
            Ok(sink) => return Ok(sink),
            Err(e) if e.is_skippable_candidate() => {
                warn!("Skipping {}: {}", device, e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(LoopcamError::NoLoopbackDevice)
}
