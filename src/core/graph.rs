//! Node storage and wiring shared by the live graph and prototype templates.

use crate::core::arena::Arena;
use crate::core::error::{EngineError, Result};
use crate::core::node::{NodeId, NodeKey, NodeLogic, Socket};
use crate::core::prototype::reference::Reference;
use crate::core::signal::Signal;
use std::collections::BTreeSet;

/// What a node does when it fires.
pub(crate) enum NodeBody {
    Native(Box<dyn NodeLogic>),
    Reference(Reference),
}

impl NodeBody {
    /// A fresh copy for another graph: natives are cloned, references start unbound.
    fn duplicate(&self) -> NodeBody {
        match self {
            NodeBody::Native(logic) => NodeBody::Native(logic.clone_box()),
            NodeBody::Reference(reference) => {
                NodeBody::Reference(Reference::unbound(reference.key.clone()))
            }
        }
    }
}

/// A node plus its scheduling state.
pub(crate) struct NodeSlot {
    pub body: NodeBody,
    /// Values pulsed since the last firing, one slot per input.
    pub inputs: Vec<Option<Signal>>,
    /// Fan-out per output port.
    pub outputs: Vec<BTreeSet<Socket>>,
    pub scheduled: bool,
    /// Owned by an instance; hidden from the public graph API.
    pub internal: bool,
}

impl NodeSlot {
    fn with_body(body: NodeBody, inputs: usize, outputs: usize) -> Self {
        NodeSlot {
            body,
            inputs: vec![None; inputs],
            outputs: vec![BTreeSet::new(); outputs],
            scheduled: false,
            internal: false,
        }
    }

    pub fn native(logic: Box<dyn NodeLogic>) -> Self {
        let (inputs, outputs) = (logic.inputs(), logic.outputs());
        Self::with_body(NodeBody::Native(logic), inputs, outputs)
    }

    pub fn reference(key: NodeKey, inputs: usize, outputs: usize) -> Self {
        Self::with_body(NodeBody::Reference(Reference::unbound(key)), inputs, outputs)
    }

    /// Same body and arity, empty buffers and no wiring, owned by an instance.
    pub fn duplicate_internal(&self) -> Self {
        let mut slot = Self::with_body(self.body.duplicate(), self.inputs.len(), self.outputs.len());
        slot.internal = true;
        slot
    }

    pub fn input_arity(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_arity(&self) -> usize {
        self.outputs.len()
    }

    pub fn label(&self) -> String {
        match &self.body {
            NodeBody::Native(logic) => logic.label(),
            NodeBody::Reference(reference) => reference.key.to_string(),
        }
    }

    pub fn key(&self) -> NodeKey {
        match &self.body {
            NodeBody::Native(logic) => logic.key(),
            NodeBody::Reference(reference) => reference.key.clone(),
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match &self.body {
            NodeBody::Reference(reference) => Some(reference),
            NodeBody::Native(_) => None,
        }
    }

    pub fn as_reference_mut(&mut self) -> Option<&mut Reference> {
        match &mut self.body {
            NodeBody::Reference(reference) => Some(reference),
            NodeBody::Native(_) => None,
        }
    }

    /// Stores a pulse; returns `None` when the port does not exist.
    pub fn store(&mut self, port: usize, signal: Signal) -> Option<()> {
        *self.inputs.get_mut(port)? = Some(signal);
        Some(())
    }

    pub fn ready(&self) -> bool {
        !self.inputs.is_empty() && self.inputs.iter().all(Option::is_some)
    }

    /// Swaps the buffer out, leaving every slot empty.
    pub fn take_inputs(&mut self) -> Vec<Signal> {
        self.inputs
            .iter_mut()
            .map(|slot| slot.take().unwrap_or_default())
            .collect()
    }
}

#[derive(Default)]
pub(crate) struct Graph {
    nodes: Arena<NodeSlot>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, slot: NodeSlot) -> NodeId {
        self.nodes.insert(slot)
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeSlot> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeSlot> {
        self.nodes.get_mut(id)
    }

    pub fn remove(&mut self, id: NodeId) -> Option<NodeSlot> {
        self.nodes.remove(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &NodeSlot)> {
        self.nodes.iter()
    }

    pub fn try_get(&self, id: NodeId) -> Result<&NodeSlot> {
        self.nodes.get(id).ok_or(EngineError::MissingNode(id))
    }

    pub fn check_output(&self, socket: Socket) -> Result<()> {
        let arity = self.try_get(socket.node)?.output_arity();
        check_port(socket, arity)
    }

    pub fn check_input(&self, socket: Socket) -> Result<()> {
        let arity = self.try_get(socket.node)?.input_arity();
        check_port(socket, arity)
    }

    /// Adds a fan-out edge; connecting the same pair twice is a no-op.
    pub fn connect(&mut self, from: Socket, to: Socket) -> Result<()> {
        self.check_output(from)?;
        self.check_input(to)?;
        if let Some(slot) = self.nodes.get_mut(from.node) {
            slot.outputs[from.port].insert(to);
        }
        Ok(())
    }

    pub fn disconnect_all(&mut self, from: Socket) -> Result<()> {
        self.check_output(from)?;
        if let Some(slot) = self.nodes.get_mut(from.node) {
            slot.outputs[from.port].clear();
        }
        Ok(())
    }

    pub fn outputs_of(&self, from: Socket) -> Result<Vec<Socket>> {
        self.check_output(from)?;
        let slot = self.try_get(from.node)?;
        Ok(slot.outputs[from.port].iter().copied().collect())
    }

    /// Removes a node and every edge pointing at it. The id is never handed
    /// out again.
    pub fn detach(&mut self, id: NodeId) -> Result<NodeSlot> {
        let slot = self.nodes.retire(id).ok_or(EngineError::MissingNode(id))?;
        for (_, other) in self.nodes.iter_mut() {
            for fan_out in other.outputs.iter_mut() {
                fan_out.retain(|to| to.node != id);
            }
        }
        Ok(slot)
    }

    /// Removes a node, first splicing every edge that fed input `k` through to
    /// the destinations of output `k`.
    pub fn splice_out(&mut self, id: NodeId) -> Result<NodeSlot> {
        let removed = self.try_get(id)?;
        let bypass: Vec<BTreeSet<Socket>> = removed
            .outputs
            .iter()
            .map(|fan_out| fan_out.iter().copied().filter(|to| to.node != id).collect())
            .collect();
        for (_, other) in self.nodes.iter_mut() {
            for fan_out in other.outputs.iter_mut() {
                let fed: Vec<usize> = fan_out
                    .iter()
                    .filter(|to| to.node == id)
                    .map(|to| to.port)
                    .collect();
                for port in fed {
                    if let Some(destinations) = bypass.get(port) {
                        fan_out.extend(destinations.iter().copied());
                    }
                }
            }
        }
        self.detach(id)
    }
}

fn check_port(socket: Socket, arity: usize) -> Result<()> {
    if socket.port < arity {
        Ok(())
    } else {
        Err(EngineError::PortOutOfRange {
            node: socket.node,
            port: socket.port,
            arity,
        })
    }
}
