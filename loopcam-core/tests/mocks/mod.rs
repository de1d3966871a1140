//! Mock infrastructure for testing
//!
//! Provides an in-memory device backend that records every open, write and
//! close, plus helpers for building test frames.

#![allow(dead_code)]

use loopcam_core::error::{LoopcamError, Result};
use loopcam_core::output::{DeviceBackend, OutputDevice, OutputFormat};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Everything the mock backend has seen
#[derive(Debug, Default)]
pub struct MockState {
    /// Devices currently open
    pub open: BTreeSet<String>,
    /// Frames written, per device
    pub writes: BTreeMap<String, Vec<Vec<u8>>>,
    /// Close calls, per device
    pub closes: BTreeMap<String, usize>,
    /// Format each device was opened with
    pub formats: BTreeMap<String, OutputFormat>,
    /// Devices whose open fails with `DeviceNotFound`
    pub missing: BTreeSet<String>,
    /// Devices whose open fails with `DeviceSetup`
    pub broken: BTreeSet<String>,
    /// Devices whose writes fail
    pub failing_writes: BTreeSet<String>,
    /// Devices returned by `discover`
    pub discoverable: Vec<String>,
}

/// Recording backend shared between a session and the test body
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a backend where every device opens and accepts writes
    pub fn new() -> Self {
        Self::default()
    }

    /// Make opening `device` fail as if the node did not exist
    pub fn with_missing(self, device: &str) -> Self {
        self.state.lock().missing.insert(device.to_string());
        self
    }

    /// Make opening `device` fail during format setup
    pub fn with_broken(self, device: &str) -> Self {
        self.state.lock().broken.insert(device.to_string());
        self
    }

    /// Make every write to `device` fail
    pub fn with_failing_writes(self, device: &str) -> Self {
        self.state.lock().failing_writes.insert(device.to_string());
        self
    }

    /// Set the devices offered for automatic selection
    pub fn with_discoverable(self, devices: &[&str]) -> Self {
        self.state.lock().discoverable = devices.iter().map(|d| d.to_string()).collect();
        self
    }

    /// Start failing writes to `device` from now on
    pub fn fail_writes(&self, device: &str) {
        self.state.lock().failing_writes.insert(device.to_string());
    }

    /// Devices currently open
    pub fn open_devices(&self) -> Vec<String> {
        self.state.lock().open.iter().cloned().collect()
    }

    /// Frames written to `device`
    pub fn frames(&self, device: &str) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .writes
            .get(device)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of frames written to `device`
    pub fn write_count(&self, device: &str) -> usize {
        self.state.lock().writes.get(device).map_or(0, Vec::len)
    }

    /// Number of close calls for `device`
    pub fn close_count(&self, device: &str) -> usize {
        self.state.lock().closes.get(device).copied().unwrap_or(0)
    }

    /// Format `device` was opened with
    pub fn format_of(&self, device: &str) -> Option<OutputFormat> {
        self.state.lock().formats.get(device).copied()
    }
}

impl DeviceBackend for MockBackend {
    fn open(&self, device: &str, format: &OutputFormat) -> Result<Box<dyn OutputDevice>> {
        let mut state = self.state.lock();
        if state.missing.contains(device) {
            return Err(LoopcamError::DeviceNotFound(device.to_string()));
        }
        if state.broken.contains(device) {
            return Err(LoopcamError::device_setup(device, "format rejected"));
        }
        if !state.open.insert(device.to_string()) {
            return Err(LoopcamError::DeviceBusy(device.to_string()));
        }
        state.formats.insert(device.to_string(), *format);

        Ok(Box::new(MockDevice {
            device: device.to_string(),
            state: self.state.clone(),
        }))
    }

    fn discover(&self) -> Vec<String> {
        self.state.lock().discoverable.clone()
    }
}

struct MockDevice {
    device: String,
    state: Arc<Mutex<MockState>>,
}

impl OutputDevice for MockDevice {
    fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()> {
        let mut state = self.state.lock();
        if state.failing_writes.contains(&self.device) {
            return Err(std::io::Error::other("mock write failure"));
        }
        state
            .writes
            .entry(self.device.clone())
            .or_default()
            .push(frame.to_vec());
        Ok(())
    }

    fn close(&mut self) -> std::io::Result<()> {
        let mut state = self.state.lock();
        state.open.remove(&self.device);
        *state.closes.entry(self.device.clone()).or_default() += 1;
        Ok(())
    }
}

/// Create a packed RGB frame of one color
pub fn solid_rgb(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    color
        .iter()
        .copied()
        .cycle()
        .take((width * height * 3) as usize)
        .collect()
}

/// Create a packed RGB frame with a diagonal gradient
pub fn gradient_rgb(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let r = ((x as f32 / width as f32) * 255.0) as u8;
            let g = ((y as f32 / height as f32) * 255.0) as u8;
            let b = (((x + y) as f32 / (width + height) as f32) * 255.0) as u8;
            data.extend_from_slice(&[r, g, b]);
        }
    }
    data
}

/// Decode one I420 pixel back to RGB with the BT.601 limited-range matrix
pub fn i420_pixel_to_rgb(frame: &[u8], width: u32, height: u32, x: u32, y: u32) -> [u8; 3] {
    let (w, h) = (width as usize, height as usize);
    let (x, y) = (x as usize, y as usize);
    let chroma = (y / 2) * (w / 2) + x / 2;

    let luma = frame[y * w + x] as f32 - 16.0;
    let u = frame[w * h + chroma] as f32 - 128.0;
    let v = frame[w * h + (w / 2) * (h / 2) + chroma] as f32 - 128.0;

    let clamp = |c: f32| c.round().clamp(0.0, 255.0) as u8;
    [
        clamp(1.164 * luma + 1.596 * v),
        clamp(1.164 * luma - 0.392 * u - 0.813 * v),
        clamp(1.164 * luma + 2.017 * u),
    ]
}
