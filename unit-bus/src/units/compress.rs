use jpeg_encoder::{ColorType, Encoder};

use crate::{
    control::Controls,
    error::BusError,
    frame::{Frame, FrameFormat, MAX_DIMENSION, PixelFormat},
    unit::Unit,
    units::require_input,
};

pub struct JpegCompress {
    id: String,
    controls: Controls,
    streaming: bool,
}

impl JpegCompress {
    pub const ID: &'static str = "convert.jpeg_compress";

    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            controls: Controls::new(id).with("quality", 94),
            streaming: false,
        }
    }

    fn quality(&self) -> u8 {
        // jpeg-encoder rejects 0
        self.controls.int("quality").clamp(1, 100) as u8
    }
}

impl Unit for JpegCompress {
    fn id(&self) -> &str {
        &self.id
    }

    fn controls(&self) -> &Controls {
        &self.controls
    }

    fn controls_mut(&mut self) -> &mut Controls {
        &mut self.controls
    }

    fn stream_init(&mut self, input: Option<&FrameFormat>) -> anyhow::Result<FrameFormat> {
        let input = require_input(&self.id, input)?;
        if !input.pixel.is_raw() {
            return Err(BusError::UnsupportedFormat {
                unit: self.id.clone(),
                format: *input,
            }
            .into());
        }
        if input.width > MAX_DIMENSION || input.height > MAX_DIMENSION {
            anyhow::bail!("{}: {} is too large for JPEG", self.id, input);
        }
        let quality = self.controls.int("quality");
        if !(0..=100).contains(&quality) {
            anyhow::bail!("{}: quality {} is outside 0..=100", self.id, quality);
        }
        self.streaming = true;
        Ok(FrameFormat::new(PixelFormat::Jpeg, input.width, input.height))
    }

    fn stream_shutdown(&mut self) {
        self.streaming = false;
    }

    fn process(&mut self, input: Option<&Frame>) -> anyhow::Result<Option<Frame>> {
        let Some(frame) = input else {
            return Ok(None);
        };
        if !self.streaming {
            anyhow::bail!("{} is not streaming", self.id);
        }

        let color = match frame.format.pixel {
            PixelFormat::Rgb8 => ColorType::Rgb,
            PixelFormat::Gray8 => ColorType::Luma,
            PixelFormat::Jpeg => return Ok(Some(frame.clone())),
        };

        let mut jpeg = Vec::new();
        let encoder = Encoder::new(&mut jpeg, self.quality());
        encoder
            .encode(&frame.data, frame.width() as u16, frame.height() as u16, color)
            .map_err(|e| anyhow::anyhow!("{}: jpeg encode: {}", self.id, e))?;

        let format = FrameFormat::new(PixelFormat::Jpeg, frame.width(), frame.height());
        Ok(Some(Frame::new(jpeg, format, frame.timestamp)))
    }
}
