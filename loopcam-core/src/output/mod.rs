//! Output devices
//!
//! A session writes to one or more sinks through a [`DeviceBackend`]:
//! - [`V4l2Backend`] for v4l2loopback device nodes
//! - any other implementation (tests use an in-memory recorder)

mod v4l2;

pub use v4l2::{find_loopback_devices, is_loopback_device, V4l2Backend, MAX_VIDEO_NODES};

use tracing::{debug, info};

use crate::convert::ConvertedFrame;
use crate::error::{LoopcamError, Result};
use crate::formats::PixelFormat;
use crate::types::Resolution;

/// Format every sink of a session is configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    /// Frame dimensions
    pub resolution: Resolution,
    /// Device pixel format
    pub pixel_format: PixelFormat,
}

impl OutputFormat {
    /// Size of one frame in bytes
    pub fn frame_size(&self) -> usize {
        self.pixel_format.frame_size(self.resolution)
    }

    /// Bytes per line of the first plane
    pub fn bytes_per_line(&self) -> u32 {
        self.pixel_format.bytes_per_line(self.resolution.width)
    }
}

/// An open device that accepts whole frames
pub trait OutputDevice: Send {
    /// Write one frame
    fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()>;

    /// Release the device
    ///
    /// Called at most once by [`SinkHandle`].
    fn close(&mut self) -> std::io::Result<()>;
}

/// Opens output devices by identifier
pub trait DeviceBackend: Send + Sync {
    /// Open and configure `device` for `format`
    fn open(&self, device: &str, format: &OutputFormat) -> Result<Box<dyn OutputDevice>>;

    /// Candidate devices for automatic selection, in preference order
    fn discover(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Per-sink counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Device identifier
    pub device: String,
    /// Frames written successfully
    pub frames_written: u64,
    /// Failed writes
    pub write_errors: u64,
    /// Message of the most recent failed write
    pub last_error: Option<String>,
}

/// One open output device of a session
pub struct SinkHandle {
    device: String,
    output: Option<Box<dyn OutputDevice>>,
    frames_written: u64,
    write_errors: u64,
    last_error: Option<String>,
}

impl SinkHandle {
    /// Open `device` through `backend`
    pub fn open(backend: &dyn DeviceBackend, device: &str, format: &OutputFormat) -> Result<Self> {
        let output = backend.open(device, format)?;
        info!(
            "Opened sink {} ({} {})",
            device, format.resolution, format.pixel_format
        );
        Ok(Self {
            device: device.to_string(),
            output: Some(output),
            frames_written: 0,
            write_errors: 0,
            last_error: None,
        })
    }

    /// Write a converted frame
    ///
    /// Failures are recorded on this sink only and returned as `DeviceWrite`.
    pub fn write(&mut self, frame: &ConvertedFrame<'_>) -> Result<()> {
        let Some(output) = self.output.as_mut() else {
            return Err(LoopcamError::DeviceWrite {
                device: self.device.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotConnected, "sink is closed"),
            });
        };

        match output.write_frame(frame.data()) {
            Ok(()) => {
                self.frames_written += 1;
                Ok(())
            }
            Err(source) => {
                self.write_errors += 1;
                self.last_error = Some(source.to_string());
                Err(LoopcamError::DeviceWrite {
                    device: self.device.clone(),
                    source,
                })
            }
        }
    }

    /// Release the device; later calls do nothing
    pub fn close(&mut self) {
        if let Some(mut output) = self.output.take() {
            if let Err(e) = output.close() {
                debug!("Error closing {}: {}", self.device, e);
            }
            info!(
                "Closed sink {} (wrote {} frames, {} errors)",
                self.device, self.frames_written, self.write_errors
            );
        }
    }

    /// Whether the device is still held
    pub fn is_open(&self) -> bool {
        self.output.is_some()
    }

    /// Device identifier
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Snapshot of this sink's counters
    pub fn stats(&self) -> SinkStats {
        SinkStats {
            device: self.device.clone(),
            frames_written: self.frames_written,
            write_errors: self.write_errors,
            last_error: self.last_error.clone(),
        }
    }
}

impl std::fmt::Debug for SinkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkHandle")
            .field("device", &self.device)
            .field("open", &self.is_open())
            .field("frames_written", &self.frames_written)
            .field("write_errors", &self.write_errors)
            .finish()
    }
}

impl Drop for SinkHandle {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::FormatConverter;
    use crate::types::RawFrame;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingDevice {
        fail: bool,
        closes: Arc<AtomicUsize>,
    }

    impl OutputDevice for CountingDevice {
        fn write_frame(&mut self, _frame: &[u8]) -> std::io::Result<()> {
            if self.fail {
                Err(std::io::Error::other("device gone"))
            } else {
                Ok(())
            }
        }

        fn close(&mut self) -> std::io::Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct CountingBackend {
        fail_writes: bool,
        closes: Arc<AtomicUsize>,
    }

    impl DeviceBackend for CountingBackend {
        fn open(&self, _device: &str, _format: &OutputFormat) -> Result<Box<dyn OutputDevice>> {
            Ok(Box::new(CountingDevice {
                fail: self.fail_writes,
                closes: self.closes.clone(),
            }))
        }
    }

    fn format() -> OutputFormat {
        OutputFormat {
            resolution: Resolution::new(2, 2),
            pixel_format: PixelFormat::Gray,
        }
    }

    #[test]
    fn test_output_format_layout() {
        let i420 = OutputFormat {
            resolution: Resolution::new(640, 480),
            pixel_format: PixelFormat::I420,
        };
        assert_eq!(i420.bytes_per_line(), 640);
        assert_eq!(i420.frame_size(), 640 * 480 * 3 / 2);

        let yuyv = OutputFormat {
            pixel_format: PixelFormat::Yuyv,
            ..i420
        };
        assert_eq!(yuyv.bytes_per_line(), 1280);
        assert_eq!(yuyv.frame_size(), 640 * 480 * 2);
    }

    #[test]
    fn test_close_is_idempotent() {
        let closes = Arc::new(AtomicUsize::new(0));
        let backend = CountingBackend {
            fail_writes: false,
            closes: closes.clone(),
        };

        let mut sink = SinkHandle::open(&backend, "/dev/video0", &format()).unwrap();
        assert!(sink.is_open());
        sink.close();
        sink.close();
        drop(sink);

        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_write_error_recorded() {
        let backend = CountingBackend {
            fail_writes: true,
            closes: Arc::new(AtomicUsize::new(0)),
        };
        let mut sink = SinkHandle::open(&backend, "/dev/video3", &format()).unwrap();
        let mut converter = FormatConverter::new(PixelFormat::Gray, Resolution::new(2, 2));
        let raw = [0u8; 4];
        let frame = converter.convert(RawFrame::new(&raw)).unwrap();

        let err = sink.write(&frame).unwrap_err();
        assert!(matches!(err, LoopcamError::DeviceWrite { ref device, .. } if device == "/dev/video3"));

        let stats = sink.stats();
        assert_eq!(stats.write_errors, 1);
        assert_eq!(stats.frames_written, 0);
        assert_eq!(stats.last_error.as_deref(), Some("device gone"));
    }

    #[test]
    fn test_write_after_close_fails() {
        let backend = CountingBackend {
            fail_writes: false,
            closes: Arc::new(AtomicUsize::new(0)),
        };
        let mut sink = SinkHandle::open(&backend, "/dev/video0", &format()).unwrap();
        sink.close();

        let mut converter = FormatConverter::new(PixelFormat::Gray, Resolution::new(2, 2));
        let raw = [0u8; 4];
        let frame = converter.convert(RawFrame::new(&raw)).unwrap();
        assert!(sink.write(&frame).is_err());
    }
}
