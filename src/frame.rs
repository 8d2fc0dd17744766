//! Camera frames.
//!
//! A `Frame` is an immutable decoded image buffer: pixel format, dimensions,
//! stride and an orientation tag. The pixel buffer is reference-counted so a
//! frame can be handed to an in-flight online search without copying; clones
//! share the same buffer.
//!
//! Frames are produced by an ingestion source and consumed by the session
//! within the same admission tick. The session never retains a frame past
//! its tick; only an online search holds one longer, for the duration of
//! the call.

use anyhow::{anyhow, Result};
use std::sync::Arc;

/// Pixel layout of a frame buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit grayscale, one byte per pixel.
    Gray8,
    /// YCrCb 4:2:0 bi-planar (Android camera preview layout).
    Nv21,
    /// 32-bit RGB, four bytes per pixel.
    Rgb32,
}

impl PixelFormat {
    /// Minimum buffer length for the given geometry.
    ///
    /// `stride` is bytes per row of the luma/primary plane.
    pub fn min_buffer_len(self, stride: usize, height: usize) -> usize {
        match self {
            PixelFormat::Gray8 | PixelFormat::Rgb32 => stride * height,
            // NV21 carries a half-height interleaved chroma plane.
            PixelFormat::Nv21 => stride * height + stride * height.div_ceil(2),
        }
    }

    /// Bytes per pixel of the primary plane.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Gray8 | PixelFormat::Nv21 => 1,
            PixelFormat::Rgb32 => 4,
        }
    }
}

/// Capture orientation of a frame, quadrant granularity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Up,
    Down,
    Left,
    Right,
}

/// An immutable decoded camera frame.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Arc<[u8]>,
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
    orientation: Orientation,
}

impl Frame {
    /// Wrap a decoded pixel buffer.
    ///
    /// Rejects zero dimensions, a stride narrower than a row, and a buffer
    /// shorter than the geometry requires.
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        stride: usize,
        format: PixelFormat,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("frame dimensions must be non-zero"));
        }
        let min_stride = width as usize * format.bytes_per_pixel();
        if stride < min_stride {
            return Err(anyhow!(
                "stride {} too small for {} pixels per row",
                stride,
                width
            ));
        }
        let needed = format.min_buffer_len(stride, height as usize);
        if data.len() < needed {
            return Err(anyhow!(
                "frame buffer too short: got {} bytes, need {}",
                data.len(),
                needed
            ));
        }
        Ok(Self {
            data: data.into(),
            width,
            height,
            stride,
            format,
            orientation: Orientation::Up,
        })
    }

    /// Tag the frame with a capture orientation.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exact_gray8_buffer() {
        let frame =
            Frame::new(vec![0u8; 640 * 480], 640, 480, 640, PixelFormat::Gray8).expect("frame");
        assert_eq!(frame.width(), 640);
        assert_eq!(frame.pixels().len(), 640 * 480);
        assert_eq!(frame.orientation(), Orientation::Up);
    }

    #[test]
    fn nv21_needs_chroma_plane() {
        // Luma-only buffer is not enough for NV21.
        assert!(Frame::new(vec![0u8; 4 * 4], 4, 4, 4, PixelFormat::Nv21).is_err());
        let full = 4 * 4 + 4 * 2;
        assert!(Frame::new(vec![0u8; full], 4, 4, 4, PixelFormat::Nv21).is_ok());
    }

    #[test]
    fn rejects_bad_geometry() {
        assert!(Frame::new(vec![], 0, 480, 640, PixelFormat::Gray8).is_err());
        assert!(Frame::new(vec![0u8; 100], 640, 480, 640, PixelFormat::Gray8).is_err());
        // Stride narrower than a pixel row.
        assert!(Frame::new(vec![0u8; 640 * 480 * 4], 640, 480, 640, PixelFormat::Rgb32).is_err());
    }

    #[test]
    fn clones_share_the_buffer() {
        let frame = Frame::new(vec![7u8; 16], 4, 4, 4, PixelFormat::Gray8).expect("frame");
        let clone = frame.clone().with_orientation(Orientation::Left);
        assert!(std::ptr::eq(frame.pixels().as_ptr(), clone.pixels().as_ptr()));
        assert_eq!(frame.orientation(), Orientation::Up);
        assert_eq!(clone.orientation(), Orientation::Left);
    }
}
