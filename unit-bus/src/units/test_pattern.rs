use std::time::Duration;

use crate::{
    control::Controls,
    frame::{Frame, FrameFormat, PixelFormat},
    unit::Unit,
};

/// Synthetic RGB source: a diagonal gradient that scrolls one pixel per frame.
pub struct TestPattern {
    id: String,
    controls: Controls,
    format: Option<FrameFormat>,
    frame_count: u64,
}

impl TestPattern {
    pub const ID: &'static str = "input.test_pattern";

    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            controls: Controls::new(id)
                .with("width", 640)
                .with("height", 480)
                .with("fps", 30),
            format: None,
            frame_count: 0,
        }
    }

    fn fps(&self) -> i64 {
        self.controls.int("fps").max(1)
    }
}

impl Unit for TestPattern {
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
        if input.is_some() {
            anyhow::bail!("{} is a source and takes no input", self.id);
        }
        let width = self.controls.int("width");
        let height = self.controls.int("height");
        if width <= 0 || height <= 0 {
            anyhow::bail!("{}: invalid size {}x{}", self.id, width, height);
        }
        let format = FrameFormat::new(PixelFormat::Rgb8, width as u32, height as u32);
        self.format = Some(format);
        self.frame_count = 0;
        Ok(format)
    }

    fn stream_shutdown(&mut self) {
        self.format = None;
    }

    fn process(&mut self, _input: Option<&Frame>) -> anyhow::Result<Option<Frame>> {
        let format = self
            .format
            .ok_or_else(|| anyhow::anyhow!("{} is not streaming", self.id))?;
        let (width, height) = (format.width as usize, format.height as usize);
        let shift = self.frame_count as usize;

        let mut data = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                data.push(((x + shift) % 256) as u8);
                data.push(((y + shift) % 256) as u8);
                data.push(((x + y) % 256) as u8);
            }
        }

        // integer timestamps keep whole-second boundaries exact
        let timestamp = (self.frame_count as i64 * 1_000_000) / self.fps();
        self.frame_count += 1;
        Ok(Some(Frame::new(data, format, timestamp)))
    }

    fn frame_interval(&self) -> Option<Duration> {
        Some(Duration::from_micros(1_000_000 / self.fps() as u64))
    }
}
