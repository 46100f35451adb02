use thiserror::Error;

use crate::{media::supervisor::ChainState, param::ParamError};

/// Problems with the static configuration of a run. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No camera input specified!")]
    NoCamera,
    #[error("No configuration path: pass --config-dir or --param, or set {0}")]
    NoConfigPath(&'static str),
    #[error("Could not read configuration store {path}: {reason}")]
    Store { path: String, reason: String },
    #[error("Could not get contents of file: {path} ({reason})")]
    ChainFile { path: String, reason: String },
    #[error("Could not find configuration for \"{0}\"")]
    MissingStreams(String),
    #[error("No {path} value in conf file!  Could not add {stream} stream.")]
    MissingField { path: String, stream: String },
    #[error("{path} = {value} is out of range ({expected})")]
    InvalidField {
        path: String,
        value: i64,
        expected: &'static str,
    },
    #[error(transparent)]
    Param(#[from] ParamError),
    #[error("No streams to stream for camera \"{0}\"!  Aborting.")]
    NoStreams(String),
    #[error("{0} environment variable is not set.  Set it and rerun this.")]
    SimulationGate(&'static str),
    #[error("Simulated camera mode currently not supported")]
    SimulationUnsupported,
}

/// A branch could not be put together. The run is aborted.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Could not create {unit} unit for {stream} stream: {reason}")]
    Create {
        unit: &'static str,
        stream: String,
        reason: String,
    },
    #[error("Could not set {control} on {stage} unit for {stream} stream: {reason}")]
    Control {
        stage: &'static str,
        control: &'static str,
        stream: String,
        reason: String,
    },
    #[error("Could not wire {stage} unit for {stream} stream: {reason}")]
    Wiring {
        stage: &'static str,
        stream: String,
        reason: String,
    },
    #[error("chain is not running (state {0:?})")]
    NotRunning(ChainState),
}

/// A termination request arrived before the chain came up.
#[derive(Debug, Error)]
#[error("interrupted while {0}")]
pub struct Interrupted(pub &'static str);
