use std::fmt::{Display, Formatter};

use bytes::Bytes;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Gray8,
    Rgb8,
    Jpeg,
}

impl PixelFormat {
    /// Bytes per pixel for raw formats, `None` for compressed ones.
    pub fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            PixelFormat::Gray8 => Some(1),
            PixelFormat::Rgb8 => Some(3),
            PixelFormat::Jpeg => None,
        }
    }

    pub fn is_raw(self) -> bool {
        self.bytes_per_pixel().is_some()
    }
}

/// Largest width or height any unit negotiates (the JPEG header limit).
pub const MAX_DIMENSION: u32 = u16::MAX as u32;
/// Largest raw frame a unit will allocate.
pub const MAX_FRAME_BYTES: usize = 256 << 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameFormat {
    pub pixel: PixelFormat,
    pub width: u32,
    pub height: u32,
}

impl FrameFormat {
    pub fn new(pixel: PixelFormat, width: u32, height: u32) -> Self {
        Self {
            pixel,
            width,
            height,
        }
    }

    /// Expected payload length of a raw frame in this format; `None` for
    /// compressed formats or on overflow.
    pub fn frame_size(&self) -> Option<usize> {
        let bpp = self.pixel.bytes_per_pixel()?;
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(bpp)
    }
}

impl Display for FrameFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{:?} {}x{}", self.pixel, self.width, self.height)
    }
}

/// One image travelling through a chain. The payload is shared, never copied,
/// when the same frame is handed to several downstream units.
#[derive(Clone, Debug)]
pub struct Frame {
    pub data: Bytes,
    pub format: FrameFormat,
    // microseconds since the source started
    pub timestamp: i64,
}

impl Frame {
    pub fn new(data: impl Into<Bytes>, format: FrameFormat, timestamp: i64) -> Self {
        Self {
            data: data.into(),
            format,
            timestamp,
        }
    }

    pub fn width(&self) -> u32 {
        self.format.width
    }

    pub fn height(&self) -> u32 {
        self.format.height
    }
}

impl Display for Frame {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "Frame {{ {}, data: {}, ts: {} }}",
            self.format,
            self.data.len(),
            self.timestamp
        )
    }
}
