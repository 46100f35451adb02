//! Built-in units.
//!
//! ```text
//! input.test_pattern ─► util.throttle ─► ipp.resize ─► convert.jpeg_compress ─► bus.image_publish
//! ```

pub mod compress;
pub mod publish;
pub mod resize;
pub mod test_pattern;
pub mod throttle;

use crate::frame::FrameFormat;

/// Input format of a non-source unit, or an error naming the unit.
pub(crate) fn require_input<'a>(
    unit: &str,
    input: Option<&'a FrameFormat>,
) -> anyhow::Result<&'a FrameFormat> {
    input.ok_or_else(|| anyhow::anyhow!("{} needs an input unit", unit))
}
