use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use unit_bus::{Chain, UnitManager};

use crate::{
    console::Console,
    error::{Interrupted, PipelineError},
    media::{
        builder::{Branch, BranchInit, PipelineBuilder},
        quirks::{DEVICE_QUIRKS, DeviceQuirk, apply_device_quirks},
        types::StreamDescriptor,
    },
};

/// Fixed-interval retry timings. Both stages retry until they succeed or
/// the run is cancelled.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// One progress dot is printed per step while waiting to reload.
    pub load_step: Duration,
    pub load_steps: u32,
    pub init_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            load_step: Duration::from_secs(1),
            load_steps: 5,
            init_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainState {
    Unloaded,
    Loading,
    PartiallyFailedInit,
    Running,
    ShuttingDown,
    Stopped,
}

/// Per-stream view for the rest of the program.
#[derive(Clone, Debug)]
pub struct StreamStatus {
    pub key: String,
    pub channel: String,
    pub init: BranchInit,
    pub published: u64,
}

/// Owner of the one chain of this process.
pub struct ChainSupervisor {
    manager: Arc<UnitManager>,
    chain: Chain,
    branches: Vec<Branch>,
    state: ChainState,
    history: Vec<ChainState>,
    retry: RetryPolicy,
    quirks: &'static [DeviceQuirk],
    console: Console,
    cancel: CancellationToken,
    load_attempts: u32,
    init_attempts: u32,
    released: usize,
}

impl ChainSupervisor {
    pub fn new(
        manager: Arc<UnitManager>,
        retry: RetryPolicy,
        console: Console,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            manager,
            chain: Chain::new(),
            branches: Vec::new(),
            state: ChainState::Unloaded,
            history: vec![ChainState::Unloaded],
            retry,
            quirks: DEVICE_QUIRKS,
            console,
            cancel,
            load_attempts: 0,
            init_attempts: 0,
            released: 0,
        }
    }

    pub fn with_quirks(mut self, quirks: &'static [DeviceQuirk]) -> Self {
        self.quirks = quirks;
        self
    }

    fn transition(&mut self, state: ChainState) {
        if self.state != state {
            log::debug!("chain {:?} -> {:?}", self.state, state);
            self.state = state;
            self.history.push(state);
        }
    }

    async fn wait(&self, delay: Duration, during: &'static str) -> Result<(), Interrupted> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(Interrupted(during)),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    /// Instantiate the chain from `description`, retrying while parsing or
    /// unit creation fails. The text itself is read once by the caller.
    pub async fn load(&mut self, description: &str) -> Result<(), Interrupted> {
        if self.cancel.is_cancelled() {
            return Err(Interrupted("loading the chain"));
        }
        self.transition(ChainState::Loading);
        loop {
            self.load_attempts += 1;
            match self.chain.load_from_str(&self.manager, description) {
                Ok(()) => {
                    log::info!(
                        "loaded chain ({} units, attempt {})",
                        self.chain.units().len(),
                        self.load_attempts
                    );
                    return Ok(());
                }
                Err(e) => {
                    self.console.break_line();
                    log::warn!("could not load chain: {:#}", e);
                    self.console.partial(" Waiting to try again");
                    for _ in 0..self.retry.load_steps {
                        self.console.partial(" .");
                        self.wait(self.retry.load_step, "loading the chain").await?;
                    }
                    self.console.break_line();
                }
            }
        }
    }

    /// Bring every unit of the source chain to streaming, retrying after
    /// `init_delay` while any unit fails. Applies device quirks once the
    /// chain runs.
    pub async fn initialize(&mut self) -> Result<(), Interrupted> {
        loop {
            self.init_attempts += 1;
            match self.chain.all_units_stream_init() {
                Ok(()) => break,
                Err(faulty) => {
                    self.transition(ChainState::PartiallyFailedInit);
                    self.console.break_line();
                    log::error!(
                        "Unit [{}] is not streaming ({:#}).  Waiting...",
                        faulty.name,
                        faulty.reason
                    );
                    self.wait(self.retry.init_delay, "initializing the chain").await?;
                }
            }
        }

        apply_device_quirks(&mut self.chain, self.quirks);
        self.transition(ChainState::Running);
        Ok(())
    }

    /// Build one branch per stream off the last unit of the chain and attach
    /// the graph to the runtime loop.
    pub fn attach_streams(&mut self, streams: &[StreamDescriptor]) -> Result<(), PipelineError> {
        let source = match (self.state, self.chain.last_unit()) {
            (ChainState::Running, Some(source)) => source,
            (state, _) => return Err(PipelineError::NotRunning(state)),
        };

        let builder = PipelineBuilder::new(&self.manager, self.console.clone());
        let branches = builder.build(&mut self.chain, source, streams)?;
        for branch in &branches {
            match &branch.init {
                BranchInit::Ready => {
                    log::info!("({}) streaming on \"{}\"", branch.key, branch.channel)
                }
                BranchInit::Failed { stage, reason } => log::warn!(
                    "({}) {} did not come up, stream stays idle: {}",
                    branch.key,
                    stage.label(),
                    reason
                ),
            }
        }
        self.branches.extend(branches);
        self.chain.attach();
        Ok(())
    }

    /// Detach and release the graph. Calling it again is a no-op; returns
    /// whether anything was released by this call.
    pub fn shutdown(&mut self) -> bool {
        if self.state == ChainState::Stopped {
            return false;
        }
        self.transition(ChainState::ShuttingDown);
        self.chain.detach();
        self.branches.clear();
        self.released += self.chain.clear();
        self.transition(ChainState::Stopped);
        log::info!("chain stopped, {} units released", self.released);
        true
    }

    pub fn stream_status(&self) -> Vec<StreamStatus> {
        self.branches
            .iter()
            .map(|b| StreamStatus {
                key: b.key.clone(),
                channel: b.channel.clone(),
                init: b.init.clone(),
                published: self.chain.frames_out(b.publish),
            })
            .collect()
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    /// Every state the chain has been in, oldest first.
    pub fn history(&self) -> &[ChainState] {
        &self.history
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn chain_mut(&mut self) -> &mut Chain {
        &mut self.chain
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn load_attempts(&self) -> u32 {
        self.load_attempts
    }

    pub fn init_attempts(&self) -> u32 {
        self.init_attempts
    }

    /// Units released by shutdown so far.
    pub fn released(&self) -> usize {
        self.released
    }
}

impl Drop for ChainSupervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "supervisor_test.rs"]
mod supervisor_test;
