use crate::{
    control::Controls,
    error::BusError,
    frame::{Frame, FrameFormat, MAX_DIMENSION, MAX_FRAME_BYTES},
    unit::Unit,
    units::require_input,
};

/// Nearest-neighbour scaler for raw frames.
pub struct Resize {
    id: String,
    controls: Controls,
    output: Option<FrameFormat>,
}

impl Resize {
    pub const ID: &'static str = "ipp.resize";

    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            controls: Controls::new(id)
                .with("width", 640)
                .with("height", 480)
                .with("lock-aspect", true),
            output: None,
        }
    }

    fn target_size(&self, input: &FrameFormat) -> anyhow::Result<(u32, u32)> {
        let width = self.controls.int("width");
        let mut height = self.controls.int("height");
        if self.controls.bool("lock-aspect") && input.width > 0 {
            height = width.saturating_mul(input.height as i64) / input.width as i64;
        }
        let limit = MAX_DIMENSION as i64;
        if width <= 0 || height <= 0 || width > limit || height > limit {
            anyhow::bail!("{}: invalid output size {}x{}", self.id, width, height);
        }
        Ok((width as u32, height as u32))
    }
}

impl Unit for Resize {
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
        let (width, height) = self.target_size(input)?;
        let output = FrameFormat::new(input.pixel, width, height);
        if !output.frame_size().is_some_and(|size| size <= MAX_FRAME_BYTES) {
            anyhow::bail!("{}: {} does not fit in memory", self.id, output);
        }
        self.output = Some(output);
        Ok(output)
    }

    fn stream_shutdown(&mut self) {
        self.output = None;
    }

    fn process(&mut self, input: Option<&Frame>) -> anyhow::Result<Option<Frame>> {
        let Some(frame) = input else {
            return Ok(None);
        };
        let output = self
            .output
            .ok_or_else(|| anyhow::anyhow!("{} is not streaming", self.id))?;
        if output.width == frame.width() && output.height == frame.height() {
            return Ok(Some(frame.clone()));
        }

        let bpp = frame
            .format
            .pixel
            .bytes_per_pixel()
            .ok_or_else(|| anyhow::anyhow!("{}: compressed input", self.id))?;
        let expected = frame.format.frame_size().unwrap_or(0);
        if frame.data.len() < expected {
            anyhow::bail!(
                "{}: short frame, {} bytes for {}",
                self.id,
                frame.data.len(),
                frame.format
            );
        }

        let (src_w, src_h) = (frame.width() as usize, frame.height() as usize);
        let (dst_w, dst_h) = (output.width as usize, output.height as usize);
        let mut data = Vec::with_capacity(dst_w * dst_h * bpp);
        for y in 0..dst_h {
            let sy = y * src_h / dst_h;
            for x in 0..dst_w {
                let sx = x * src_w / dst_w;
                let offset = (sy * src_w + sx) * bpp;
                data.extend_from_slice(&frame.data[offset..offset + bpp]);
            }
        }

        Ok(Some(Frame::new(data, output, frame.timestamp)))
    }
}
