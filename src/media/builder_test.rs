// ============================================================================
// Pipeline Builder Tests
// ============================================================================

use std::sync::Arc;

use unit_bus::{
    BroadcastTransport, Chain, ControlValue, UnitId, UnitManager,
    units::{resize::Resize, throttle::Throttle},
};

use super::{BranchInit, PipelineBuilder, Stage};
use crate::{
    console::tests::capture,
    error::PipelineError,
    media::{test_support::PATTERN_CHAIN, types::StreamDescriptor},
};

fn streaming_chain(manager: &UnitManager) -> anyhow::Result<(Chain, UnitId)> {
    let mut chain = Chain::new();
    chain.load_from_str(manager, PATTERN_CHAIN)?;
    chain
        .all_units_stream_init()
        .map_err(|faulty| faulty.reason)?;
    let source = chain.last_unit().ok_or_else(|| anyhow::anyhow!("empty chain"))?;
    Ok((chain, source))
}

fn wide() -> StreamDescriptor {
    StreamDescriptor::new("wide", "WEST_WIDE", 10, 320, 240, 75)
}

// ------------------------------------------------------------------------
// Branch Layout Tests
// ------------------------------------------------------------------------

#[test]
fn test_branch_stages_in_order_with_stream_controls() -> anyhow::Result<()> {
    let manager = UnitManager::new(Arc::new(BroadcastTransport::new()));
    let (mut chain, source) = streaming_chain(&manager)?;
    let (console, _) = capture(false);

    let branches = PipelineBuilder::new(&manager, console).build(&mut chain, source, &[wide()])?;
    assert_eq!(branches.len(), 1);
    let branch = &branches[0];
    assert_eq!(branch.init, BranchInit::Ready);

    assert_eq!(chain.input_of(branch.throttle), Some(source));
    assert_eq!(chain.input_of(branch.resize), Some(branch.throttle));
    assert_eq!(chain.input_of(branch.compress), Some(branch.resize));
    assert_eq!(chain.input_of(branch.publish), Some(branch.compress));
    for (stage, id) in Stage::ALL.iter().zip(branch.nodes()) {
        assert_eq!(chain.unit_identity(id), Some(stage.unit_type()));
    }

    assert_eq!(chain.control(branch.throttle, "throttle-rate"), Some(&ControlValue::Float(10.0)));
    assert_eq!(chain.control(branch.throttle, "pause"), Some(&ControlValue::Bool(false)));
    assert_eq!(chain.control(branch.resize, "width"), Some(&ControlValue::Int(320)));
    assert_eq!(chain.control(branch.resize, "height"), Some(&ControlValue::Int(240)));
    assert_eq!(chain.control(branch.resize, "lock-aspect"), Some(&ControlValue::Bool(false)));
    assert_eq!(chain.control(branch.compress, "quality"), Some(&ControlValue::Int(75)));
    assert_eq!(chain.control(branch.publish, "publish"), Some(&ControlValue::Bool(true)));
    assert_eq!(
        chain.control(branch.publish, "channel"),
        Some(&ControlValue::Str("WEST_WIDE".to_string()))
    );
    Ok(())
}

#[test]
fn test_branches_share_one_source() -> anyhow::Result<()> {
    let manager = UnitManager::new(Arc::new(BroadcastTransport::new()));
    let (mut chain, source) = streaming_chain(&manager)?;
    let (console, _) = capture(false);
    let streams = [wide(), StreamDescriptor::new("narrow", "WEST_NARROW", 5, 640, 480, 90)];

    let branches = PipelineBuilder::new(&manager, console).build(&mut chain, source, &streams)?;
    let keys: Vec<&str> = branches.iter().map(|b| b.key.as_str()).collect();
    assert_eq!(keys, vec!["wide", "narrow"]);
    assert!(branches.iter().all(|b| chain.input_of(b.throttle) == Some(source)));
    assert_eq!(chain.len(), 1 + 8);
    Ok(())
}

// ------------------------------------------------------------------------
// Failure Tests
// ------------------------------------------------------------------------

#[test]
fn test_unknown_unit_rolls_back_branch() -> anyhow::Result<()> {
    let mut manager = UnitManager::new(Arc::new(BroadcastTransport::new()));
    let (mut chain, source) = streaming_chain(&manager)?;
    let before = chain.len();

    // only the first two stages can be created
    manager = UnitManager::empty(Arc::clone(manager.transport()));
    manager.register(Throttle::ID, |_, id| Ok(Box::new(Throttle::new(id))));
    manager.register(Resize::ID, |_, id| Ok(Box::new(Resize::new(id))));

    let (console, _) = capture(false);
    let result = PipelineBuilder::new(&manager, console).build(&mut chain, source, &[wide()]);
    match result {
        Err(PipelineError::Create { unit, stream, .. }) => {
            assert_eq!(unit, Stage::Compress.unit_type());
            assert_eq!(stream, "wide");
        }
        other => panic!("expected a create error, got {:?}", other),
    }
    assert_eq!(chain.len(), before);
    Ok(())
}

#[test]
fn test_init_failure_is_recorded_not_fatal() -> anyhow::Result<()> {
    let manager = UnitManager::new(Arc::new(BroadcastTransport::new()));
    let (mut chain, source) = streaming_chain(&manager)?;
    let (console, _) = capture(false);
    let bad_quality = StreamDescriptor::new("bad", "BAD", 10, 320, 240, 140);

    let streams = [bad_quality, wide()];
    let branches = PipelineBuilder::new(&manager, console).build(&mut chain, source, &streams)?;
    assert!(matches!(
        &branches[0].init,
        BranchInit::Failed { stage: Stage::Compress, .. }
    ));
    for id in branches[0].nodes() {
        assert!(!chain.status(id).is_some_and(|s| s.is_streaming()));
    }
    assert_eq!(branches[1].init, BranchInit::Ready);
    Ok(())
}

#[test]
fn test_oversized_branch_stays_out_of_delivery() -> anyhow::Result<()> {
    let manager = UnitManager::new(Arc::new(BroadcastTransport::new()));
    let (mut chain, source) = streaming_chain(&manager)?;
    let (console, _) = capture(false);
    let huge = StreamDescriptor::new("huge", "HUGE", 10, 2_000_000, 2_000_000, 75);

    let streams = [huge, wide()];
    let branches = PipelineBuilder::new(&manager, console).build(&mut chain, source, &streams)?;
    assert!(matches!(
        &branches[0].init,
        BranchInit::Failed { stage: Stage::Resize, .. }
    ));

    chain.attach();
    assert!(chain.deliver()?);
    assert!(chain.deliver()?);
    assert_eq!(chain.frames_out(branches[0].throttle), 0);
    assert_eq!(chain.frames_out(branches[0].publish), 0);
    assert_eq!(chain.frames_out(branches[1].publish), 1);
    Ok(())
}

// ------------------------------------------------------------------------
// Verbose Output Tests
// ------------------------------------------------------------------------

#[test]
fn test_verbose_console_reports_publishes() -> anyhow::Result<()> {
    let manager = UnitManager::new(Arc::new(BroadcastTransport::new()));
    let (mut chain, source) = streaming_chain(&manager)?;
    let (console, out) = capture(true);

    let branches = PipelineBuilder::new(&manager, console).build(&mut chain, source, &[wide()])?;
    chain.set_control(branches[0].throttle, "throttle-mode", 0)?;
    chain.attach();
    assert!(chain.deliver()?);

    assert!(out.contents().contains("(wide) Publishing on \"WEST_WIDE\""));
    Ok(())
}
