// ============================================================================
// Chain Supervisor Tests
// ============================================================================

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use unit_bus::{BroadcastTransport, ControlValue, PixelFormat, UnitManager};

use super::{ChainState, ChainSupervisor, RetryPolicy};
use crate::{
    console::tests::{SharedBuf, capture},
    error::PipelineError,
    media::{
        loader::{OmitSet, load_streams},
        quirks::DeviceQuirk,
        runtime,
        test_support::{PATTERN_CHAIN, register_flaky_camera, west_param},
    },
};

const FAST: RetryPolicy = RetryPolicy {
    load_step: Duration::from_millis(1),
    load_steps: 5,
    init_delay: Duration::from_millis(1),
};

const DC1394_CHAIN: &str = r#"{ "units": [ { "unit": "input.dc1394:0x00b09d01" } ] }"#;

fn supervisor(
    manager: UnitManager,
    verbose: bool,
) -> (ChainSupervisor, SharedBuf, CancellationToken) {
    let (console, out) = capture(verbose);
    let cancel = CancellationToken::new();
    let supervisor = ChainSupervisor::new(Arc::new(manager), FAST, console, cancel.clone());
    (supervisor, out, cancel)
}

fn flaky_manager(
    create_failures: usize,
    init_failures: usize,
    drops: Arc<AtomicUsize>,
) -> UnitManager {
    let mut manager = UnitManager::new(Arc::new(BroadcastTransport::new()));
    register_flaky_camera(&mut manager, create_failures, init_failures, drops);
    manager
}

fn pattern_manager() -> UnitManager {
    UnitManager::new(Arc::new(BroadcastTransport::new()))
}

// ------------------------------------------------------------------------
// Load Tests
// ------------------------------------------------------------------------

#[tokio::test]
async fn test_load_retries_until_units_can_be_created() -> anyhow::Result<()> {
    let drops = Arc::new(AtomicUsize::new(0));
    let (mut supervisor, out, _cancel) = supervisor(flaky_manager(2, 0, drops), false);

    supervisor.load(DC1394_CHAIN).await?;

    assert_eq!(supervisor.load_attempts(), 3);
    assert_eq!(supervisor.chain().units().len(), 1);
    let printed = out.contents();
    assert_eq!(printed.matches(" Waiting to try again").count(), 2);
    assert_eq!(printed.matches(" .").count(), 10);
    assert_eq!(supervisor.state(), ChainState::Loading);
    Ok(())
}

#[tokio::test]
async fn test_load_success_prints_no_retry() -> anyhow::Result<()> {
    let (mut supervisor, out, _cancel) = supervisor(pattern_manager(), false);

    supervisor.load(PATTERN_CHAIN).await?;

    assert_eq!(supervisor.load_attempts(), 1);
    assert_eq!(out.contents(), "");
    Ok(())
}

#[tokio::test]
async fn test_unparsable_description_is_retried() -> anyhow::Result<()> {
    let (mut supervisor, out, cancel) = supervisor(pattern_manager(), false);

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(40)).await;
        canceller.cancel();
    });

    assert!(supervisor.load("{ \"units\": [ ").await.is_err());
    assert!(supervisor.load_attempts() > 1);
    assert!(supervisor.chain().is_empty());
    assert!(out.contents().contains(" Waiting to try again"));
    Ok(())
}

#[tokio::test]
async fn test_cancel_before_load_interrupts() {
    let (mut supervisor, _out, cancel) = supervisor(pattern_manager(), false);
    cancel.cancel();

    assert!(supervisor.load(PATTERN_CHAIN).await.is_err());
    assert_eq!(supervisor.load_attempts(), 0);
}

// ------------------------------------------------------------------------
// Initialisation Tests
// ------------------------------------------------------------------------

#[tokio::test]
async fn test_flaky_init_reaches_running_once() -> anyhow::Result<()> {
    let drops = Arc::new(AtomicUsize::new(0));
    let (mut supervisor, _out, _cancel) = supervisor(flaky_manager(0, 2, drops), false);
    supervisor.load(DC1394_CHAIN).await?;

    supervisor.initialize().await?;

    assert_eq!(supervisor.init_attempts(), 3);
    assert_eq!(supervisor.state(), ChainState::Running);
    let history = supervisor.history();
    assert_eq!(history.iter().filter(|s| **s == ChainState::Running).count(), 1);
    assert_eq!(
        history,
        &[
            ChainState::Unloaded,
            ChainState::Loading,
            ChainState::PartiallyFailedInit,
            ChainState::Running
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_dc1394_packet_size_forced() -> anyhow::Result<()> {
    let drops = Arc::new(AtomicUsize::new(0));
    let (mut supervisor, _out, _cancel) = supervisor(flaky_manager(0, 0, drops), false);
    supervisor.load(DC1394_CHAIN).await?;
    supervisor.initialize().await?;

    let head = supervisor.chain().units()[0];
    assert_eq!(
        supervisor.chain().control(head, "packet-size"),
        Some(&ControlValue::Int(1000))
    );
    Ok(())
}

static JUMBO_PACKETS: &[DeviceQuirk] = &[DeviceQuirk {
    id_prefix: "input.dc1394:0x00b0",
    control: "packet-size",
    value: 8192,
}];

#[tokio::test]
async fn test_custom_quirk_table_replaces_default() -> anyhow::Result<()> {
    let drops = Arc::new(AtomicUsize::new(0));
    let (supervisor, _out, _cancel) = supervisor(flaky_manager(0, 0, drops), false);
    let mut supervisor = supervisor.with_quirks(JUMBO_PACKETS);
    supervisor.load(DC1394_CHAIN).await?;
    supervisor.initialize().await?;

    let head = supervisor.chain().units()[0];
    assert_eq!(
        supervisor.chain().control(head, "packet-size"),
        Some(&ControlValue::Int(8192))
    );
    Ok(())
}

// ------------------------------------------------------------------------
// Attach and Shutdown Tests
// ------------------------------------------------------------------------

#[tokio::test]
async fn test_attach_requires_running_chain() -> anyhow::Result<()> {
    let (mut supervisor, _out, _cancel) = supervisor(pattern_manager(), false);
    supervisor.load(PATTERN_CHAIN).await?;

    let streams = load_streams(&west_param(), "west", &OmitSet::default())?;
    assert!(matches!(
        supervisor.attach_streams(&streams.descriptors),
        Err(PipelineError::NotRunning(ChainState::Loading))
    ));
    Ok(())
}

#[tokio::test]
async fn test_shutdown_releases_once() -> anyhow::Result<()> {
    let drops = Arc::new(AtomicUsize::new(0));
    let (mut supervisor, _out, _cancel) = supervisor(flaky_manager(0, 0, drops.clone()), false);
    supervisor.load(DC1394_CHAIN).await?;
    supervisor.initialize().await?;
    let streams = load_streams(&west_param(), "west", &OmitSet::default())?;
    supervisor.attach_streams(&streams.descriptors)?;

    assert!(supervisor.shutdown());
    assert_eq!(supervisor.released(), 9);
    assert_eq!(drops.load(Ordering::SeqCst), 1);

    assert!(!supervisor.shutdown());
    drop(supervisor);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
    Ok(())
}

// ------------------------------------------------------------------------
// End-to-end Tests
// ------------------------------------------------------------------------

#[tokio::test]
async fn test_streams_publish_until_cancelled() -> anyhow::Result<()> {
    let transport = Arc::new(BroadcastTransport::new());
    let mut wide = transport.subscribe_stream("WEST_WIDE").boxed();
    let mut narrow = transport.subscribe("WEST_NARROW");
    let (mut supervisor, out, cancel) = supervisor(UnitManager::new(transport.clone()), true);

    supervisor.load(PATTERN_CHAIN).await?;
    supervisor.initialize().await?;
    let streams = load_streams(&west_param(), "west", &OmitSet::default())?;
    supervisor.attach_streams(&streams.descriptors)?;

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        canceller.cancel();
    });
    let summary = runtime::run(&mut supervisor, cancel).await?;
    assert!(summary.frames > 0);
    assert_eq!(summary.source_errors, 0);

    let message = wide
        .next()
        .await
        .ok_or_else(|| anyhow::anyhow!("nothing published on WEST_WIDE"))?;
    assert_eq!(message.pixel, PixelFormat::Jpeg);
    assert_eq!((message.width, message.height), (320, 240));
    assert_eq!(&message.data[..2], &[0xFF, 0xD8]);
    let message = narrow.try_recv()?;
    assert_eq!((message.width, message.height), (640, 480));

    let status = supervisor.stream_status();
    assert_eq!(status.len(), 2);
    assert!(status.iter().all(|s| s.published > 0));

    let printed = out.contents();
    assert!(printed.contains("Camera is streaming!"));
    assert!(printed.contains("(narrow) Publishing on \"WEST_NARROW\""));

    assert!(supervisor.shutdown());
    assert!(transport.channels().contains(&"WEST_WIDE".to_string()));
    Ok(())
}
