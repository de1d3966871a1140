//! Pixel format constants and conversions
//!
//! Centralizes V4L2 fourcc handling and frame size arithmetic so the
//! converter, the sinks and the config layer agree on buffer layouts.

use serde::{Deserialize, Serialize};

use crate::error::LoopcamError;
use crate::types::Resolution;

/// V4L2 fourcc constants
///
/// See: <https://github.com/torvalds/linux/blob/master/include/uapi/linux/videodev2.h>
pub mod fourcc {
    /// YU12 - YUV 4:2:0 planar (I420)
    pub const YUV420: [u8; 4] = *b"YU12";
    /// GREY - 8-bit greyscale
    pub const GREY: [u8; 4] = *b"GREY";
    /// NV12 - YUV 4:2:0 semi-planar
    pub const NV12: [u8; 4] = *b"NV12";
    /// YUYV - YUV 4:2:2 packed
    pub const YUYV: [u8; 4] = *b"YUYV";
    /// UYVY - YUV 4:2:2 packed, chroma first
    pub const UYVY: [u8; 4] = *b"UYVY";
    /// RGB3 - 24-bit RGB
    pub const RGB24: [u8; 4] = *b"RGB3";
    /// BGR3 - 24-bit BGR
    pub const BGR24: [u8; 4] = *b"BGR3";

    /// Pack a fourcc into its little-endian u32 code
    pub const fn code(fourcc: [u8; 4]) -> u32 {
        u32::from_le_bytes(fourcc)
    }
}

/// Pixel layout of a frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// RGB24, interleaved R, G, B
    #[default]
    Rgb,
    /// BGR24, interleaved B, G, R
    Bgr,
    /// 8-bit luma only
    Gray,
    /// YUV 4:2:0 planar: Y, then U, then V
    I420,
    /// YUV 4:2:0 semi-planar: Y, then interleaved UV
    Nv12,
    /// YUV 4:2:2 packed: Y0 U Y1 V
    Yuyv,
    /// YUV 4:2:2 packed: U Y0 V Y1
    Uyvy,
}

impl PixelFormat {
    /// All supported formats
    pub const ALL: [PixelFormat; 7] = [
        Self::Rgb,
        Self::Bgr,
        Self::Gray,
        Self::I420,
        Self::Nv12,
        Self::Yuyv,
        Self::Uyvy,
    ];

    /// Format written to the device for frames supplied in this format
    ///
    /// Loopback consumers handle packed RGB poorly, so RGB and BGR are
    /// converted to I420. Everything else is passed through.
    pub fn native(&self) -> PixelFormat {
        match self {
            Self::Rgb | Self::Bgr => Self::I420,
            other => *other,
        }
    }

    /// Whether frames in this format are written without conversion
    pub fn is_passthrough(&self) -> bool {
        self.native() == *self
    }

    /// V4L2 fourcc for this format
    pub fn fourcc(&self) -> [u8; 4] {
        match self {
            Self::Rgb => fourcc::RGB24,
            Self::Bgr => fourcc::BGR24,
            Self::Gray => fourcc::GREY,
            Self::I420 => fourcc::YUV420,
            Self::Nv12 => fourcc::NV12,
            Self::Yuyv => fourcc::YUYV,
            Self::Uyvy => fourcc::UYVY,
        }
    }

    /// Whether the layout subsamples chroma and needs even dimensions
    pub fn is_subsampled(&self) -> bool {
        matches!(self, Self::I420 | Self::Nv12 | Self::Yuyv | Self::Uyvy)
    }

    /// Bytes per line of the first plane
    pub fn bytes_per_line(&self, width: u32) -> u32 {
        match self {
            Self::Rgb | Self::Bgr => width * 3,
            Self::Yuyv | Self::Uyvy => width * 2,
            Self::Gray | Self::I420 | Self::Nv12 => width,
        }
    }

    /// Exact buffer size of one frame
    pub fn frame_size(&self, resolution: Resolution) -> usize {
        let pixels = resolution.pixels();
        match self {
            Self::Rgb | Self::Bgr => pixels * 3,
            Self::Gray => pixels,
            Self::I420 | Self::Nv12 => pixels * 3 / 2,
            Self::Yuyv | Self::Uyvy => pixels * 2,
        }
    }

    /// Lowercase name used in config files and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rgb => "rgb",
            Self::Bgr => "bgr",
            Self::Gray => "gray",
            Self::I420 => "i420",
            Self::Nv12 => "nv12",
            Self::Yuyv => "yuyv",
            Self::Uyvy => "uyvy",
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PixelFormat {
    type Err = LoopcamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rgb" | "rgb24" => Ok(Self::Rgb),
            "bgr" | "bgr24" => Ok(Self::Bgr),
            "gray" | "grey" | "j400" => Ok(Self::Gray),
            "i420" | "yu12" | "yuv420" => Ok(Self::I420),
            "nv12" => Ok(Self::Nv12),
            "yuyv" | "yuy2" => Ok(Self::Yuyv),
            "uyvy" => Ok(Self::Uyvy),
            _ => Err(LoopcamError::Unsupported(format!("pixel format '{}'", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_format() {
        assert_eq!(PixelFormat::Rgb.native(), PixelFormat::I420);
        assert_eq!(PixelFormat::Bgr.native(), PixelFormat::I420);
        assert_eq!(PixelFormat::Nv12.native(), PixelFormat::Nv12);
        assert!(PixelFormat::Gray.is_passthrough());
        assert!(!PixelFormat::Rgb.is_passthrough());
    }

    #[test]
    fn test_frame_size() {
        let res = Resolution::new(1280, 720);
        assert_eq!(PixelFormat::Rgb.frame_size(res), 1280 * 720 * 3);
        assert_eq!(PixelFormat::I420.frame_size(res), 1280 * 720 * 3 / 2);
        assert_eq!(PixelFormat::Yuyv.frame_size(res), 1280 * 720 * 2);
        assert_eq!(PixelFormat::Gray.frame_size(res), 1280 * 720);
    }

    #[test]
    fn test_fourcc_code() {
        assert_eq!(fourcc::code(fourcc::YUV420), 0x3231_5559);
        assert_eq!(PixelFormat::I420.fourcc(), *b"YU12");
    }

    #[test]
    fn test_parse_and_display() {
        for format in PixelFormat::ALL {
            let parsed: PixelFormat = format.to_string().parse().unwrap();
            assert_eq!(parsed, format);
        }
        assert_eq!("GREY".parse::<PixelFormat>().unwrap(), PixelFormat::Gray);
        assert!("mjpeg".parse::<PixelFormat>().is_err());
    }
}
