use std::time::Duration;

use crate::{
    control::{ControlValue, Controls},
    error::BusError,
    frame::{Frame, FrameFormat},
};

/// Called with every frame a unit emits.
pub type FrameObserver = Box<dyn Fn(&Frame) + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitStatus {
    Idle,
    Streaming(FrameFormat),
}

impl UnitStatus {
    pub fn is_streaming(&self) -> bool {
        matches!(self, UnitStatus::Streaming(_))
    }
}

/// A single stage of a processing graph.
pub trait Unit: Send {
    /// Identity string, `<type id>` optionally followed by `:<device>`.
    fn id(&self) -> &str;

    fn name(&self) -> &str {
        self.id()
    }

    fn controls(&self) -> &Controls;

    fn controls_mut(&mut self) -> &mut Controls;

    fn set_control(&mut self, name: &str, value: ControlValue) -> Result<(), BusError> {
        self.controls_mut().set(name, value)
    }

    /// Negotiate the output format for the given input format. Sources are
    /// initialised with `None`.
    fn stream_init(&mut self, input: Option<&FrameFormat>) -> anyhow::Result<FrameFormat>;

    fn stream_shutdown(&mut self) {}

    /// Sources are called with `None` and produce a frame, other units get
    /// their input's frame. `Ok(None)` drops the frame for everything
    /// downstream.
    fn process(&mut self, input: Option<&Frame>) -> anyhow::Result<Option<Frame>>;

    /// Pacing of a source unit.
    fn frame_interval(&self) -> Option<Duration> {
        None
    }
}
