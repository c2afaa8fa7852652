//! Raster frames and the ordered buffer that holds them.

use std::sync::Arc;

use framepress_common::error::{FramepressError, FramepressResult};
use serde::{Deserialize, Serialize};

/// Byte layout of a frame's pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 8-bit red, green, blue, alpha.
    #[default]
    Rgba8,
    /// 8-bit blue, green, red, alpha.
    Bgra8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        4
    }

    /// Raw-video format name understood by media frameworks.
    pub fn raw_video_name(self) -> &'static str {
        match self {
            PixelFormat::Rgba8 => "RGBA",
            PixelFormat::Bgra8 => "BGRA",
        }
    }
}

/// One rendered image.
///
/// Pixel data is shared, never mutated: cloning a frame clones a handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Arc<[u8]>,
}

impl Frame {
    /// Wrap a pixel buffer. Fails unless `data` holds exactly
    /// `width * height * 4` bytes and both dimensions are non-zero.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: impl Into<Arc<[u8]>>,
    ) -> FramepressResult<Self> {
        let data = data.into();
        if width == 0 || height == 0 {
            return Err(FramepressError::invalid_frame(format!(
                "frame dimensions must be non-zero, got {width}x{height}"
            )));
        }

        let expected = frame_byte_len(width, height, format).ok_or_else(|| {
            FramepressError::invalid_frame(format!("frame {width}x{height} is too large"))
        })?;
        if data.len() != expected {
            return Err(FramepressError::invalid_frame(format!(
                "{width}x{height} {:?} frame needs {expected} bytes, got {}",
                format,
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// A frame filled with a single RGBA color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> FramepressResult<Self> {
        let pixels = width as usize * height as usize;
        let data: Vec<u8> = rgba.iter().copied().cycle().take(pixels * 4).collect();
        Self::new(width, height, PixelFormat::Rgba8, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw pixel bytes, row-major, no padding.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Shared handle to the pixel bytes, for sinks that hand frames to
    /// another thread without copying.
    pub fn shared_data(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }
}

fn frame_byte_len(width: u32, height: u32, format: PixelFormat) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(format.bytes_per_pixel())
}

/// An ordered, finite sequence of frames sharing one size and format.
///
/// Filled once by the renderer, then read (never mutated) by exactly one
/// export attempt.
#[derive(Debug, Clone, Default)]
pub struct FrameBuffer {
    frames: Vec<Frame>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: Vec::with_capacity(capacity),
        }
    }

    /// Build a buffer from already-rendered frames.
    pub fn from_frames(frames: impl IntoIterator<Item = Frame>) -> FramepressResult<Self> {
        let mut buffer = Self::new();
        for frame in frames {
            buffer.push(frame)?;
        }
        Ok(buffer)
    }

    /// Append the next frame. Every frame must match the first frame's
    /// dimensions and pixel format.
    pub fn push(&mut self, frame: Frame) -> FramepressResult<()> {
        if let Some(first) = self.frames.first() {
            if (first.width, first.height) != (frame.width, frame.height) {
                return Err(FramepressError::invalid_frame(format!(
                    "frame {} is {}x{}, buffer holds {}x{} frames",
                    self.frames.len(),
                    frame.width,
                    frame.height,
                    first.width,
                    first.height
                )));
            }
            if first.format != frame.format {
                return Err(FramepressError::invalid_frame(format!(
                    "frame {} is {:?}, buffer holds {:?} frames",
                    self.frames.len(),
                    frame.format,
                    first.format
                )));
            }
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Shared `(width, height)` of the frames, if any.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.frames.first().map(|f| (f.width, f.height))
    }

    /// Shared pixel format of the frames, if any.
    pub fn format(&self) -> Option<PixelFormat> {
        self.frames.first().map(|f| f.format)
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    /// Total pixel bytes held.
    pub fn byte_len(&self) -> usize {
        self.frames.iter().map(|f| f.data.len()).sum()
    }
}

impl<'a> IntoIterator for &'a FrameBuffer {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
