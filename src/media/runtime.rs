use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::media::supervisor::ChainSupervisor;

const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(33);
const STATUS_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames the source emitted into the graph.
    pub frames: u64,
    pub source_errors: u64,
}

/// Drive the attached chain until `cancel` fires. Cancellation is checked
/// between frames, never in the middle of one.
pub async fn run(
    supervisor: &mut ChainSupervisor,
    cancel: CancellationToken,
) -> anyhow::Result<RunSummary> {
    if !supervisor.chain().is_attached() {
        anyhow::bail!("chain is not attached, nothing to run");
    }

    let period = supervisor
        .chain()
        .frame_interval()
        .filter(|d| !d.is_zero())
        .unwrap_or(DEFAULT_FRAME_INTERVAL);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    supervisor.console().verbose("Camera is streaming!");
    log::info!("streaming, one frame every {:?}", period);

    let mut summary = RunSummary::default();
    let mut last_status = Instant::now();
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match supervisor.chain_mut().deliver() {
            Ok(true) => summary.frames += 1,
            Ok(false) => {}
            Err(e) => {
                summary.source_errors += 1;
                log::warn!("source did not produce a frame: {:#}", e);
            }
        }

        if last_status.elapsed() >= STATUS_INTERVAL {
            last_status = Instant::now();
            for status in supervisor.stream_status() {
                log::debug!(
                    "({}) {} frames on \"{}\" ({:?})",
                    status.key,
                    status.published,
                    status.channel,
                    status.init
                );
            }
        }
    }

    for status in supervisor.stream_status() {
        log::info!(
            "({}) published {} frames on \"{}\"",
            status.key,
            status.published,
            status.channel
        );
    }
    log::info!(
        "stopped streaming after {} frames ({} source errors)",
        summary.frames,
        summary.source_errors
    );
    Ok(summary)
}
