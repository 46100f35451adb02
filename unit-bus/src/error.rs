use thiserror::Error;

use crate::{chain::UnitId, control::ControlKind, frame::FrameFormat};

#[derive(Debug, Error)]
pub enum BusError {
    #[error("unknown unit type {0:?}")]
    UnknownUnit(String),
    #[error("unit {unit} has no control {control:?}")]
    UnknownControl { unit: String, control: String },
    #[error("control {control:?} of unit {unit} expects {expected:?}, got {got:?}")]
    ControlType {
        unit: String,
        control: String,
        expected: ControlKind,
        got: ControlKind,
    },
    #[error("no unit with id {0}")]
    UnknownNode(UnitId),
    #[error("unit {0} has no input")]
    NoInput(String),
    #[error("input of unit {0} is not streaming")]
    InputNotReady(String),
    #[error("unit {unit} cannot take {format} input")]
    UnsupportedFormat { unit: String, format: FrameFormat },
    #[error("invalid chain description: {0}")]
    Description(#[from] serde_json::Error),
    #[error("chain description has no units")]
    EmptyDescription,
}
