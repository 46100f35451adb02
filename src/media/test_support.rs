//! Fakes shared by the media tests.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use serde_json::{Value, json};
use unit_bus::{Controls, Frame, FrameFormat, PixelFormat, Unit, UnitManager};

use crate::param::JsonParam;

/// Camera "west" with a complete "wide" (quality defaulted) and "narrow"
/// stream, plus the chain description entry.
pub(crate) fn west_config() -> Value {
    json!({
        "cameras": { "west": { "streams": {
            "wide": { "hz": 10, "width": 320, "height": 240, "channel": "WEST_WIDE" },
            "narrow": {
                "hz": 5, "width": 640, "height": 480,
                "jpeg_quality": 90, "channel": "WEST_NARROW"
            },
            "cam_units": "west_units.json"
        } } }
    })
}

pub(crate) fn west_param() -> JsonParam {
    JsonParam::from_value(west_config())
}

pub(crate) const PATTERN_CHAIN: &str = r#"{ "units": [
    { "unit": "input.test_pattern", "controls": { "width": 64, "height": 48, "fps": 200 } }
] }"#;

/// Register an `input.dc1394` camera on `manager`. Creating it fails
/// `create_failures` times (as when the device backend is not up yet), then
/// every instance shares `init_failures` and counts its drops in `drops`.
pub(crate) fn register_flaky_camera(
    manager: &mut UnitManager,
    create_failures: usize,
    init_failures: usize,
    drops: Arc<AtomicUsize>,
) {
    let create_failures = AtomicUsize::new(create_failures);
    let init_failures = Arc::new(AtomicUsize::new(init_failures));
    manager.register("input.dc1394", move |_, id| {
        if create_failures.load(Ordering::SeqCst) > 0 {
            create_failures.fetch_sub(1, Ordering::SeqCst);
            anyhow::bail!("no dc1394 backend for {}", id);
        }
        Ok(Box::new(FlakySource::new(id, init_failures.clone(), drops.clone())))
    });
}

/// Gray source that fails `stream_init` a number of times and counts drops.
pub(crate) struct FlakySource {
    id: String,
    controls: Controls,
    failures_left: Arc<AtomicUsize>,
    drops: Arc<AtomicUsize>,
}

impl FlakySource {
    pub(crate) fn new(id: &str, failures_left: Arc<AtomicUsize>, drops: Arc<AtomicUsize>) -> Self {
        Self {
            id: id.to_string(),
            controls: Controls::new(id).with("packet-size", 4096),
            failures_left,
            drops,
        }
    }
}

impl Unit for FlakySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn controls(&self) -> &Controls {
        &self.controls
    }

    fn controls_mut(&mut self) -> &mut Controls {
        &mut self.controls
    }

    fn stream_init(&mut self, _input: Option<&FrameFormat>) -> anyhow::Result<FrameFormat> {
        if self.failures_left.load(Ordering::SeqCst) > 0 {
            self.failures_left.fetch_sub(1, Ordering::SeqCst);
            anyhow::bail!("camera still warming up");
        }
        Ok(FrameFormat::new(PixelFormat::Gray8, 16, 12))
    }

    fn process(&mut self, _input: Option<&Frame>) -> anyhow::Result<Option<Frame>> {
        let format = FrameFormat::new(PixelFormat::Gray8, 16, 12);
        Ok(Some(Frame::new(vec![128u8; 16 * 12], format, 0)))
    }
}

impl Drop for FlakySource {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}
