//! Loopcam Core Library
//!
//! Virtual camera output that fans one frame stream out to any number of
//! v4l2loopback devices.
//!
//! This library provides:
//! - A single RGB/BGR to I420 conversion per frame, shared by every device
//! - Passthrough for frames already in a device format (GRAY, I420, NV12, YUYV, UYVY)
//! - Delivery policies for partial device failure
//! - Monotonic frame pacing
//!
//! # Architecture
//!
//! ```text
//!                                          ┌──────────────┐
//!                                     ┌───▶│ /dev/video0  │
//! ┌─────────────┐    ┌─────────────┐  │    └──────────────┘
//! │ send(frame) │───▶│ Convert x1  │──┼───▶ /dev/video1 ...
//! └─────────────┘    └─────────────┘  │    ┌──────────────┐
//!                                     └───▶│ /dev/videoN  │
//!                                          └──────────────┘
//! ```

pub mod config;
pub mod convert;
pub mod distributor;
pub mod error;
pub mod formats;
pub mod output;
pub mod pacer;
pub mod performance;
pub mod session;
pub mod types;

pub use config::{DeliveryPolicy, SessionConfig, WriteMode};
pub use distributor::DistributionReport;
pub use error::{LoopcamError, Result};
pub use formats::PixelFormat;
pub use session::CameraSession;
pub use types::{DeviceSelection, FrameRate, RawFrame, Resolution};
