use std::{collections::BTreeMap, collections::VecDeque, time::Duration};

use serde::Deserialize;

use crate::{
    control::ControlValue,
    error::BusError,
    frame::{Frame, FrameFormat},
    manager::UnitManager,
    unit::{FrameObserver, Unit, UnitStatus},
};

pub type UnitId = usize;

/// Chain description document.
///
/// ```json
/// { "units": [ { "unit": "input.test_pattern", "controls": { "fps": 15 } } ] }
/// ```
#[derive(Debug, Deserialize)]
pub struct ChainDescription {
    pub units: Vec<UnitDescription>,
}

#[derive(Debug, Deserialize)]
pub struct UnitDescription {
    pub unit: String,
    /// Display name, defaults to the unit's own.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub controls: BTreeMap<String, ControlValue>,
}

/// A unit of the source chain that did not come up.
#[derive(Debug)]
pub struct FaultyUnit {
    pub id: UnitId,
    pub name: String,
    pub reason: anyhow::Error,
}

struct Node {
    unit: Box<dyn Unit>,
    name: Option<String>,
    input: Option<UnitId>,
    status: UnitStatus,
    observers: Vec<FrameObserver>,
    frames_out: u64,
}

impl Node {
    fn new(unit: Box<dyn Unit>, input: Option<UnitId>) -> Self {
        Self {
            unit,
            name: None,
            input,
            status: UnitStatus::Idle,
            observers: Vec::new(),
            frames_out: 0,
        }
    }

    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.unit.name())
    }
}

/// The shared source chain plus every node hanging off it.
///
/// Units loaded from a description form the linear source chain; further
/// nodes are inserted detached and wired with [`Chain::set_input`]. A frame
/// produced by the head of the chain is handed by reference to every
/// downstream node, so no consumer can alter what its siblings see.
#[derive(Default)]
pub struct Chain {
    nodes: Vec<Option<Node>>,
    source: Vec<UnitId>,
    attached: bool,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the source chain with the units named in `description`.
    /// On error the chain is left untouched.
    pub fn load_from_str(
        &mut self,
        manager: &UnitManager,
        description: &str,
    ) -> anyhow::Result<()> {
        let description: ChainDescription =
            serde_json::from_str(description).map_err(BusError::Description)?;
        if description.units.is_empty() {
            return Err(BusError::EmptyDescription.into());
        }

        let mut units = Vec::with_capacity(description.units.len());
        for entry in &description.units {
            let mut unit = manager.create_unit(&entry.unit)?;
            for (name, value) in &entry.controls {
                unit.set_control(name, value.clone())?;
            }
            units.push((unit, entry.name.clone()));
        }

        self.clear();
        for (unit, name) in units {
            let id = self.append(unit);
            if let Some(node) = self.nodes[id].as_mut() {
                node.name = name;
            }
        }
        Ok(())
    }

    /// Append a unit to the source chain, fed by the current last unit.
    pub fn append(&mut self, unit: Box<dyn Unit>) -> UnitId {
        let input = self.last_unit();
        let id = self.push(Node::new(unit, input));
        self.source.push(id);
        id
    }

    /// Add a detached node to the graph.
    pub fn insert(&mut self, unit: Box<dyn Unit>) -> UnitId {
        self.push(Node::new(unit, None))
    }

    fn push(&mut self, node: Node) -> UnitId {
        self.nodes.push(Some(node));
        self.nodes.len() - 1
    }

    fn node(&self, id: UnitId) -> Result<&Node, BusError> {
        self.nodes
            .get(id)
            .and_then(Option::as_ref)
            .ok_or(BusError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: UnitId) -> Result<&mut Node, BusError> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(BusError::UnknownNode(id))
    }

    pub fn set_input(&mut self, id: UnitId, upstream: UnitId) -> Result<(), BusError> {
        self.node(upstream)?;
        let node = self.node_mut(id)?;
        node.input = Some(upstream);
        node.status = UnitStatus::Idle;
        Ok(())
    }

    pub fn set_control(
        &mut self,
        id: UnitId,
        name: &str,
        value: impl Into<ControlValue>,
    ) -> Result<(), BusError> {
        self.node_mut(id)?.unit.set_control(name, value.into())
    }

    pub fn control(&self, id: UnitId, name: &str) -> Option<&ControlValue> {
        self.node(id).ok()?.unit.controls().get(name)
    }

    /// Bring one node to the streaming state. Its input must be streaming
    /// already; only the head of the source chain may be initialised without
    /// an input.
    pub fn stream_init(&mut self, id: UnitId) -> anyhow::Result<FrameFormat> {
        let node = self.node(id)?;
        let input_format = match node.input {
            Some(upstream) => match self.node(upstream)?.status {
                UnitStatus::Streaming(format) => Some(format),
                UnitStatus::Idle => {
                    return Err(BusError::InputNotReady(node.display_name().to_string()).into());
                }
            },
            None if self.source.first() == Some(&id) => None,
            None => return Err(BusError::NoInput(node.display_name().to_string()).into()),
        };

        let node = self.node_mut(id)?;
        let format = node.unit.stream_init(input_format.as_ref())?;
        node.status = UnitStatus::Streaming(format);
        Ok(format)
    }

    /// Return a node to `Idle`. `deliver` skips idle nodes, so nothing
    /// downstream of it sees frames until it is initialised again.
    pub fn stream_shutdown(&mut self, id: UnitId) -> Result<(), BusError> {
        let node = self.node_mut(id)?;
        if node.status.is_streaming() {
            node.unit.stream_shutdown();
            node.status = UnitStatus::Idle;
        }
        Ok(())
    }

    /// Initialise every source-chain unit that is not streaming yet, in
    /// order. Stops at the first unit that fails.
    pub fn all_units_stream_init(&mut self) -> Result<(), FaultyUnit> {
        for id in self.source.clone() {
            if self.status(id).is_some_and(|s| s.is_streaming()) {
                continue;
            }
            if let Err(reason) = self.stream_init(id) {
                return Err(FaultyUnit {
                    id,
                    name: self.unit_name(id).unwrap_or_default().to_string(),
                    reason,
                });
            }
        }
        Ok(())
    }

    /// Units of the source chain, head first.
    pub fn units(&self) -> &[UnitId] {
        &self.source
    }

    pub fn last_unit(&self) -> Option<UnitId> {
        self.source.last().copied()
    }

    pub fn unit_identity(&self, id: UnitId) -> Option<&str> {
        self.node(id).ok().map(|n| n.unit.id())
    }

    pub fn unit_name(&self, id: UnitId) -> Option<&str> {
        self.node(id).ok().map(Node::display_name)
    }

    pub fn status(&self, id: UnitId) -> Option<UnitStatus> {
        self.node(id).ok().map(|n| n.status)
    }

    pub fn input_of(&self, id: UnitId) -> Option<UnitId> {
        self.node(id).ok()?.input
    }

    /// Number of frames the node has emitted.
    pub fn frames_out(&self, id: UnitId) -> u64 {
        self.node(id).map(|n| n.frames_out).unwrap_or(0)
    }

    pub fn on_frame_ready(&mut self, id: UnitId, observer: FrameObserver) -> Result<(), BusError> {
        self.node_mut(id)?.observers.push(observer);
        Ok(())
    }

    /// Take a node out of the graph. Nodes fed by it lose their input.
    pub fn remove(&mut self, id: UnitId) -> Option<Box<dyn Unit>> {
        let mut node = self.nodes.get_mut(id)?.take()?;
        self.source.retain(|&s| s != id);
        for other in self.nodes.iter_mut().flatten() {
            if other.input == Some(id) {
                other.input = None;
                other.status = UnitStatus::Idle;
            }
        }
        node.unit.stream_shutdown();
        Some(node.unit)
    }

    pub fn attach(&mut self) {
        self.attached = true;
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn frame_interval(&self) -> Option<Duration> {
        let head = *self.source.first()?;
        self.node(head).ok()?.unit.frame_interval()
    }

    /// Drop every node. Returns how many were released.
    pub fn clear(&mut self) -> usize {
        let mut released = 0;
        for mut node in self.nodes.drain(..).flatten() {
            node.unit.stream_shutdown();
            released += 1;
        }
        self.source.clear();
        self.attached = false;
        released
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push one frame from the head of the source chain through every
    /// streaming node. Returns `Ok(false)` when the chain is detached or the
    /// source had nothing to emit. Failures of downstream nodes are logged
    /// and only cut off that node's subtree.
    pub fn deliver(&mut self) -> anyhow::Result<bool> {
        if !self.attached {
            return Ok(false);
        }
        let Some(&head) = self.source.first() else {
            return Ok(false);
        };
        if !self.status(head).is_some_and(|s| s.is_streaming()) {
            return Ok(false);
        }

        let mut children: Vec<Vec<UnitId>> = vec![Vec::new(); self.nodes.len()];
        for (id, node) in self.nodes.iter().enumerate() {
            if let Some(input) = node.as_ref().and_then(|n| n.input) {
                children[input].push(id);
            }
        }

        let Some(frame) = self.run_node(head, None)? else {
            return Ok(false);
        };

        let mut pending = VecDeque::from([(head, frame)]);
        while let Some((id, frame)) = pending.pop_front() {
            for &child in &children[id] {
                if !self.status(child).is_some_and(|s| s.is_streaming()) {
                    continue;
                }
                match self.run_node(child, Some(&frame)) {
                    Ok(Some(out)) => pending.push_back((child, out)),
                    Ok(None) => {}
                    Err(e) => {
                        log::warn!(
                            "unit {} failed on {}: {:#}",
                            self.unit_name(child).unwrap_or("?"),
                            frame,
                            e
                        );
                    }
                }
            }
        }
        Ok(true)
    }

    fn run_node(&mut self, id: UnitId, input: Option<&Frame>) -> anyhow::Result<Option<Frame>> {
        let node = self.node_mut(id)?;
        let output = node.unit.process(input)?;
        if let Some(frame) = &output {
            node.frames_out += 1;
            for observer in &node.observers {
                observer(frame);
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
#[path = "chain_test.rs"]
mod chain_test;
