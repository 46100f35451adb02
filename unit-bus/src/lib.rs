//! Processing-unit library: named units, the shared source chain they are
//! wired into, and the transport seam publish units write to.

pub mod chain;
pub mod control;
pub mod error;
pub mod frame;
pub mod manager;
pub mod transport;
pub mod unit;
pub mod units;

pub use chain::{Chain, FaultyUnit, UnitId};
pub use control::{ControlKind, ControlValue, Controls};
pub use error::BusError;
pub use frame::{Frame, FrameFormat, MAX_DIMENSION, MAX_FRAME_BYTES, PixelFormat};
pub use manager::{UnitContext, UnitManager};
pub use transport::{BroadcastTransport, ImageMessage, Transport};
pub use unit::{FrameObserver, Unit, UnitStatus};
