use std::sync::Arc;

use crate::{
    control::Controls,
    frame::{Frame, FrameFormat},
    transport::{ImageMessage, Transport},
    unit::Unit,
    units::require_input,
};

/// Sink that hands every frame to the transport under the `channel` name.
/// Emits the published frame so frame-ready observers see it.
pub struct ImagePublish {
    id: String,
    controls: Controls,
    transport: Arc<dyn Transport>,
}

impl ImagePublish {
    pub const ID: &'static str = "bus.image_publish";

    pub fn new(id: &str, transport: Arc<dyn Transport>) -> Self {
        Self {
            id: id.to_string(),
            controls: Controls::new(id)
                .with("publish", false)
                .with("channel", "")
                .with("data-rate", ""),
            transport,
        }
    }
}

impl Unit for ImagePublish {
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
        if self.controls.str("channel").is_empty() {
            anyhow::bail!("{}: no channel configured", self.id);
        }
        Ok(*input)
    }

    fn process(&mut self, input: Option<&Frame>) -> anyhow::Result<Option<Frame>> {
        let Some(frame) = input else {
            return Ok(None);
        };
        if !self.controls.bool("publish") {
            return Ok(None);
        }
        self.transport
            .publish(self.controls.str("channel"), ImageMessage::from(frame))?;
        Ok(Some(frame.clone()))
    }
}
