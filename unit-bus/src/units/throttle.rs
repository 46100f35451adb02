use crate::{
    control::Controls,
    frame::{Frame, FrameFormat},
    unit::Unit,
    units::require_input,
};

/// Forward every frame.
pub const THROTTLE_MODE_NONE: i64 = 0;
/// Forward at most `throttle-rate` frames per second of frame time.
pub const THROTTLE_MODE_RATE: i64 = 1;

pub struct Throttle {
    id: String,
    controls: Controls,
    next_due: Option<i64>,
    last_frame: Option<Frame>,
}

impl Throttle {
    pub const ID: &'static str = "util.throttle";

    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            controls: Controls::new(id)
                .with("pause", false)
                .with("repeat", false)
                .with("throttle-mode", THROTTLE_MODE_NONE)
                .with("throttle-rate", 30.0),
            next_due: None,
            last_frame: None,
        }
    }

    fn rate_allows(&mut self, timestamp: i64) -> bool {
        let rate = self.controls.float("throttle-rate");
        if rate <= 0.0 {
            return false;
        }
        let interval = (1_000_000.0 / rate) as i64;
        match self.next_due {
            Some(due) if timestamp < due => false,
            Some(due) => {
                // stay on the original grid unless the source fell behind it
                let next = due + interval;
                self.next_due = Some(if next > timestamp { next } else { timestamp + interval });
                true
            }
            None => {
                self.next_due = Some(timestamp + interval);
                true
            }
        }
    }
}

impl Unit for Throttle {
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
        self.next_due = None;
        self.last_frame = None;
        Ok(*input)
    }

    fn process(&mut self, input: Option<&Frame>) -> anyhow::Result<Option<Frame>> {
        let Some(frame) = input else {
            return Ok(None);
        };

        if self.controls.bool("pause") {
            if self.controls.bool("repeat") {
                return Ok(self.last_frame.clone());
            }
            return Ok(None);
        }

        let pass = match self.controls.int("throttle-mode") {
            THROTTLE_MODE_RATE => self.rate_allows(frame.timestamp),
            _ => true,
        };
        if !pass {
            return Ok(None);
        }

        self.last_frame = Some(frame.clone());
        Ok(Some(frame.clone()))
    }
}
