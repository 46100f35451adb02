use unit_bus::{
    Chain, ControlValue, Frame, Unit, UnitId, UnitManager,
    units::{
        compress::JpegCompress,
        publish::ImagePublish,
        resize::Resize,
        throttle::{THROTTLE_MODE_RATE, Throttle},
    },
};

use crate::{console::Console, error::PipelineError, media::types::StreamDescriptor};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Throttle,
    Resize,
    Compress,
    Publish,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Throttle, Stage::Resize, Stage::Compress, Stage::Publish];

    pub fn unit_type(self) -> &'static str {
        match self {
            Stage::Throttle => Throttle::ID,
            Stage::Resize => Resize::ID,
            Stage::Compress => JpegCompress::ID,
            Stage::Publish => ImagePublish::ID,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Throttle => "throttle",
            Stage::Resize => "resize",
            Stage::Compress => "JPEG compress",
            Stage::Publish => "image publish",
        }
    }

    /// Controls a stage gets for `stream`, in the order they are set.
    fn controls(self, stream: &StreamDescriptor) -> Vec<(&'static str, ControlValue)> {
        match self {
            Stage::Throttle => vec![
                ("pause", false.into()),
                ("repeat", false.into()),
                ("throttle-mode", THROTTLE_MODE_RATE.into()),
                ("throttle-rate", (stream.hz() as f64).into()),
            ],
            Stage::Resize => vec![
                ("lock-aspect", false.into()),
                ("width", stream.width().into()),
                ("height", stream.height().into()),
            ],
            Stage::Compress => vec![("quality", stream.jpeg_quality().into())],
            Stage::Publish => vec![
                ("publish", true.into()),
                ("channel", stream.channel().into()),
                ("data-rate", "".into()),
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BranchInit {
    Ready,
    Failed { stage: Stage, reason: String },
}

/// One stream's throttle → resize → compress → publish sequence.
#[derive(Clone, Debug)]
pub struct Branch {
    pub key: String,
    pub channel: String,
    pub throttle: UnitId,
    pub resize: UnitId,
    pub compress: UnitId,
    pub publish: UnitId,
    pub init: BranchInit,
}

impl Branch {
    pub fn nodes(&self) -> [UnitId; 4] {
        [self.throttle, self.resize, self.compress, self.publish]
    }
}

pub struct PipelineBuilder<'a> {
    manager: &'a UnitManager,
    console: Console,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(manager: &'a UnitManager, console: Console) -> Self {
        Self { manager, console }
    }

    /// Attach one branch per descriptor to `source`, in descriptor order.
    /// A branch that cannot be created or wired is removed again and the
    /// error returned; branches already built stay in the chain.
    pub fn build(
        &self,
        chain: &mut Chain,
        source: UnitId,
        streams: &[StreamDescriptor],
    ) -> Result<Vec<Branch>, PipelineError> {
        let mut branches = Vec::with_capacity(streams.len());
        for stream in streams {
            branches.push(self.build_branch(chain, source, stream)?);
        }
        Ok(branches)
    }

    fn build_branch(
        &self,
        chain: &mut Chain,
        source: UnitId,
        stream: &StreamDescriptor,
    ) -> Result<Branch, PipelineError> {
        let mut nodes = Vec::with_capacity(Stage::ALL.len());
        let mut init = BranchInit::Ready;
        let mut input = source;

        for stage in Stage::ALL {
            let id = match self.add_stage(chain, stage, input, stream, &mut init) {
                Ok(id) => id,
                Err(e) => {
                    for id in nodes.into_iter().rev() {
                        chain.remove(id);
                    }
                    return Err(e);
                }
            };
            nodes.push(id);
            input = id;
        }

        // a partly streaming branch would still run its upstream stages
        if init != BranchInit::Ready {
            for &id in nodes.iter().rev() {
                if let Err(e) = chain.stream_shutdown(id) {
                    log::warn!("({}) could not idle stage: {}", stream.key(), e);
                }
            }
        }

        let branch = Branch {
            key: stream.key().to_string(),
            channel: stream.channel().to_string(),
            throttle: nodes[0],
            resize: nodes[1],
            compress: nodes[2],
            publish: nodes[3],
            init,
        };

        if self.console.is_verbose() {
            let console = self.console.clone();
            let (key, channel) = (branch.key.clone(), branch.channel.clone());
            let observer = move |_: &Frame| {
                console.line(format!("({}) Publishing on \"{}\"", key, channel));
            };
            if let Err(e) = chain.on_frame_ready(branch.publish, Box::new(observer)) {
                log::warn!("({}) frame observer not registered: {}", branch.key, e);
            }
        }

        Ok(branch)
    }

    /// Create, configure, wire and initialise one stage. Init failures are
    /// recorded in `init` (first one wins) and do not abort the branch; the
    /// whole branch is left idle instead.
    fn add_stage(
        &self,
        chain: &mut Chain,
        stage: Stage,
        input: UnitId,
        stream: &StreamDescriptor,
        init: &mut BranchInit,
    ) -> Result<UnitId, PipelineError> {
        let unit = create_stage(self.manager, stage, stream)?;
        let id = chain.insert(unit);

        if let Err(e) = chain.set_input(id, input) {
            chain.remove(id);
            return Err(PipelineError::Wiring {
                stage: stage.label(),
                stream: stream.key().to_string(),
                reason: e.to_string(),
            });
        }

        match chain.stream_init(id) {
            Ok(format) => {
                log::debug!(
                    "({}) Successfully created {} ({})",
                    stream.key(),
                    stage.label(),
                    format
                );
            }
            Err(e) => {
                self.console.break_line();
                log::warn!(
                    "({}) {} unit did not initialize: {:#}",
                    stream.key(),
                    stage.label(),
                    e
                );
                if *init == BranchInit::Ready {
                    *init = BranchInit::Failed {
                        stage,
                        reason: format!("{:#}", e),
                    };
                }
            }
        }
        Ok(id)
    }
}

/// Create the unit for `stage` and apply the stream's controls to it.
pub fn create_stage(
    manager: &UnitManager,
    stage: Stage,
    stream: &StreamDescriptor,
) -> Result<Box<dyn Unit>, PipelineError> {
    let mut unit = manager
        .create_unit(stage.unit_type())
        .map_err(|e| PipelineError::Create {
            unit: stage.unit_type(),
            stream: stream.key().to_string(),
            reason: format!("{:#}", e),
        })?;

    for (control, value) in stage.controls(stream) {
        unit.set_control(control, value)
            .map_err(|e| PipelineError::Control {
                stage: stage.label(),
                control,
                stream: stream.key().to_string(),
                reason: e.to_string(),
            })?;
    }
    Ok(unit)
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod builder_test;
