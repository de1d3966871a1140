//! Source-to-device pixel conversion
//!
//! One converter per session. It owns a single output buffer that is reused
//! for every frame, and hands out a borrowed [`ConvertedFrame`] that all
//! sinks read from.

use std::time::{Duration, Instant};
use tracing::trace;

use crate::error::{LoopcamError, Result};
use crate::formats::PixelFormat;
use crate::types::{RawFrame, Resolution};

/// A frame in the device pixel format
///
/// Borrows either the converter's pooled buffer or, for pass-through
/// formats, the caller's raw buffer. Lives no longer than one `send()`.
#[derive(Debug, Clone, Copy)]
pub struct ConvertedFrame<'a> {
    data: &'a [u8],
    format: PixelFormat,
    resolution: Resolution,
}

impl<'a> ConvertedFrame<'a> {
    /// Frame bytes in device layout
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Device pixel format
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Frame dimensions
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the frame is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Converts caller frames into the device pixel format
#[derive(Debug)]
pub struct FormatConverter {
    src_format: PixelFormat,
    dst_format: PixelFormat,
    resolution: Resolution,
    /// Reused output buffer; empty for pass-through formats
    output_buffer: Vec<u8>,
    conversions: u64,
    last_duration: Duration,
}

impl FormatConverter {
    /// Create a converter for frames supplied in `src_format`
    pub fn new(src_format: PixelFormat, resolution: Resolution) -> Self {
        let dst_format = src_format.native();
        let output_buffer = if src_format.is_passthrough() {
            Vec::new()
        } else {
            vec![0u8; dst_format.frame_size(resolution)]
        };

        Self {
            src_format,
            dst_format,
            resolution,
            output_buffer,
            conversions: 0,
            last_duration: Duration::ZERO,
        }
    }

    /// Convert one frame
    ///
    /// Fails with `InvalidFrameSize` when the input does not match the
    /// configured resolution and source format. The converter is left
    /// untouched in that case.
    pub fn convert<'a>(&'a mut self, raw: RawFrame<'a>) -> Result<ConvertedFrame<'a>> {
        let expected = self.input_len();
        if raw.len() != expected {
            return Err(LoopcamError::InvalidFrameSize {
                expected,
                actual: raw.len(),
            });
        }

        let start = Instant::now();
        let width = self.resolution.width as usize;
        let height = self.resolution.height as usize;

        let data: &'a [u8] = match self.src_format {
            PixelFormat::Rgb => {
                rgb_to_i420(raw.data(), &mut self.output_buffer, width, height);
                &self.output_buffer
            }
            PixelFormat::Bgr => {
                bgr_to_i420(raw.data(), &mut self.output_buffer, width, height);
                &self.output_buffer
            }
            _ => raw.data(),
        };

        if !self.src_format.is_passthrough() {
            self.conversions += 1;
        }
        self.last_duration = start.elapsed();
        trace!(
            "Converted {} -> {} in {:?}",
            self.src_format, self.dst_format, self.last_duration
        );

        Ok(ConvertedFrame {
            data,
            format: self.dst_format,
            resolution: self.resolution,
        })
    }

    /// Expected raw frame length in bytes
    pub fn input_len(&self) -> usize {
        self.src_format.frame_size(self.resolution)
    }

    /// Converted frame length in bytes
    pub fn output_len(&self) -> usize {
        self.dst_format.frame_size(self.resolution)
    }

    /// Source pixel format
    pub fn source_format(&self) -> PixelFormat {
        self.src_format
    }

    /// Device pixel format
    pub fn target_format(&self) -> PixelFormat {
        self.dst_format
    }

    /// Frame dimensions
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Number of frames converted so far
    pub fn conversions(&self) -> u64 {
        self.conversions
    }

    /// Time spent on the most recent conversion
    pub fn last_duration(&self) -> Duration {
        self.last_duration
    }
}

/// Convert interleaved RGB24 to I420
///
/// BT.601 limited range, integer coefficients. Chroma is taken from the
/// average of each 2x2 block. Width and height must be even.
pub fn rgb_to_i420(rgb: &[u8], i420: &mut [u8], width: usize, height: usize) {
    packed_to_i420::<0, 2>(rgb, i420, width, height);
}

/// Convert interleaved BGR24 to I420
pub fn bgr_to_i420(bgr: &[u8], i420: &mut [u8], width: usize, height: usize) {
    packed_to_i420::<2, 0>(bgr, i420, width, height);
}

/// R and B are at byte offsets `R` and `B` of each 3-byte pixel; G is always 1
fn packed_to_i420<const R: usize, const B: usize>(
    src: &[u8],
    dst: &mut [u8],
    width: usize,
    height: usize,
) {
    let y_size = width * height;
    let chroma_width = width / 2;
    let chroma_size = chroma_width * (height / 2);
    let (y_plane, chroma) = dst.split_at_mut(y_size);
    let (u_plane, v_plane) = chroma.split_at_mut(chroma_size);

    for (row, y_row) in y_plane.chunks_exact_mut(width).enumerate() {
        let src_row = &src[row * width * 3..(row + 1) * width * 3];
        for (y, px) in y_row.iter_mut().zip(src_row.chunks_exact(3)) {
            *y = luma(px[R] as i32, px[1] as i32, px[B] as i32);
        }
    }

    let stride = width * 3;
    for cy in 0..height / 2 {
        let top = &src[cy * 2 * stride..(cy * 2 + 1) * stride];
        let bottom = &src[(cy * 2 + 1) * stride..(cy * 2 + 2) * stride];
        for cx in 0..chroma_width {
            let i = cx * 6;
            let sum = |c: usize| {
                top[i + c] as i32 + top[i + 3 + c] as i32 + bottom[i + c] as i32
                    + bottom[i + 3 + c] as i32
            };
            // rounded 2x2 average
            let r = (sum(R) + 2) >> 2;
            let g = (sum(1) + 2) >> 2;
            let b = (sum(B) + 2) >> 2;

            let idx = cy * chroma_width + cx;
            u_plane[idx] = chroma_u(r, g, b);
            v_plane[idx] = chroma_v(r, g, b);
        }
    }
}

#[inline]
fn luma(r: i32, g: i32, b: i32) -> u8 {
    (((66 * r + 129 * g + 25 * b + 128) >> 8) + 16).clamp(0, 255) as u8
}

#[inline]
fn chroma_u(r: i32, g: i32, b: i32) -> u8 {
    (((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128).clamp(0, 255) as u8
}

#[inline]
fn chroma_v(r: i32, g: i32, b: i32) -> u8 {
    (((112 * r - 94 * g - 18 * b + 128) >> 8) + 128).clamp(0, 255) as u8
}
