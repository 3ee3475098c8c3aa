//! Custom nodes: reusable subgraphs placed into other graphs.
//!
//! A [`Prototype`] is a named template subgraph with boundary placeholder
//! nodes for its inputs and outputs. Placing it somewhere creates a
//! *reference*, a lightweight node that owns no subgraph until it first
//! fires. At that point it acquires an [`Instance`]: an idle one from the
//! prototype's pool if there is one, else a fresh clone of the template in
//! the live graph. Once nothing inside the instance has pending work, the
//! scheduler detaches it and returns it to the pool.

pub mod builder;
pub mod reference;

use crate::core::error::{EngineError, Result};
use crate::core::graph::{Graph, NodeBody, NodeSlot};
use crate::core::native::flow::{Constant, Passthrough};
use crate::core::node::{NodeId, NodeKey, Socket};
use crate::core::signal::Signal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Editor canvas size stored with a prototype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSize {
    fn default() -> Self {
        CanvasSize {
            width: 800,
            height: 600,
        }
    }
}

/// Editor position of a node. The engine only stores it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
}

/// Identity of one clone of a prototype's subgraph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstanceId(Uuid);

impl InstanceId {
    fn new() -> Self {
        InstanceId(Uuid::new_v4())
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// A live copy of a prototype's template. All ids address the live graph.
pub(crate) struct Instance {
    pub id: InstanceId,
    /// Prototype revision this instance was cloned from.
    pub revision: u64,
    pub nodes: Vec<NodeId>,
    pub inputs: Vec<NodeId>,
    pub outputs: Vec<NodeId>,
}

pub struct Prototype {
    key: NodeKey,
    pub(crate) graph: Graph,
    inputs: Vec<NodeId>,
    outputs: Vec<NodeId>,
    pub(crate) revision: u64,
    /// Idle instances, most recently released last.
    pub(crate) pool: Vec<Instance>,
    pub(crate) canvas: CanvasSize,
    pub(crate) placements: HashMap<NodeId, Placement>,
}

impl Prototype {
    pub(crate) fn new(key: NodeKey, inputs: usize, outputs: usize) -> Self {
        let mut graph = Graph::new();
        let inputs = (0..inputs)
            .map(|_| graph.insert(NodeSlot::native(Box::new(Passthrough))))
            .collect();
        let outputs = (0..outputs)
            .map(|_| graph.insert(NodeSlot::native(Box::new(Passthrough))))
            .collect();
        Prototype {
            key,
            graph,
            inputs,
            outputs,
            revision: 0,
            pool: Vec::new(),
            canvas: CanvasSize::default(),
            placements: HashMap::new(),
        }
    }

    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Boundary input placeholders; port `i` of a reference feeds `inputs()[i]`.
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    /// Boundary output placeholders; pulses reaching `outputs()[i]` leave the
    /// reference on port `i`.
    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    pub fn is_boundary(&self, id: NodeId) -> bool {
        self.inputs.contains(&id) || self.outputs.contains(&id)
    }

    /// Template nodes other than the boundary placeholders.
    pub fn inner_nodes(&self) -> Vec<NodeId> {
        self.graph
            .iter()
            .map(|(id, _)| id)
            .filter(|id| !self.is_boundary(*id))
            .collect()
    }

    pub fn node_key(&self, id: NodeId) -> Option<NodeKey> {
        self.graph.get(id).map(NodeSlot::key)
    }

    pub fn node_label(&self, id: NodeId) -> Option<String> {
        self.graph.get(id).map(NodeSlot::label)
    }

    /// The value of a constant node, if `id` is one.
    pub fn constant_value(&self, id: NodeId) -> Option<Signal> {
        match &self.graph.get(id)?.body {
            NodeBody::Native(logic) => logic
                .as_ref()
                .as_any()
                .downcast_ref::<Constant>()
                .map(|constant| constant.value().clone()),
            NodeBody::Reference(_) => None,
        }
    }

    pub fn outputs_of(&self, from: Socket) -> Result<Vec<Socket>> {
        self.graph.outputs_of(from)
    }

    /// Bumped by every structural edit.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn idle_instances(&self) -> usize {
        self.pool.len()
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    pub fn placement(&self, id: NodeId) -> Placement {
        self.placements.get(&id).copied().unwrap_or_default()
    }

    pub(crate) fn boundary_input(&self, port: usize) -> Result<NodeId> {
        self.inputs.get(port).copied().ok_or_else(|| EngineError::NoSuchBoundary {
            prototype: self.key.clone(),
            port,
        })
    }

    pub(crate) fn boundary_output(&self, port: usize) -> Result<NodeId> {
        self.outputs.get(port).copied().ok_or_else(|| EngineError::NoSuchBoundary {
            prototype: self.key.clone(),
            port,
        })
    }

    /// Copies the template into `live`, remapping every internal edge from
    /// template ids to the new live ids.
    pub(crate) fn instantiate(&self, live: &mut Graph) -> Instance {
        let remap: HashMap<NodeId, NodeId> = self
            .graph
            .iter()
            .map(|(old, slot)| (old, live.insert(slot.duplicate_internal())))
            .collect();

        for (old, slot) in self.graph.iter() {
            let Some(new) = remap.get(&old).copied() else {
                continue;
            };
            let wiring: Vec<_> = slot
                .outputs
                .iter()
                .map(|fan_out| {
                    fan_out
                        .iter()
                        .filter_map(|to| remap.get(&to.node).map(|n| Socket::new(*n, to.port)))
                        .collect()
                })
                .collect();
            if let Some(copy) = live.get_mut(new) {
                copy.outputs = wiring;
            }
        }

        let lookup = |ids: &[NodeId]| -> Vec<NodeId> {
            ids.iter().filter_map(|id| remap.get(id).copied()).collect()
        };
        let mut nodes: Vec<NodeId> = remap.values().copied().collect();
        nodes.sort();
        Instance {
            id: InstanceId::new(),
            revision: self.revision,
            inputs: lookup(&self.inputs),
            outputs: lookup(&self.outputs),
            nodes,
        }
    }
}

impl fmt::Debug for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prototype")
            .field("key", &self.key)
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .field("nodes", &self.graph.len())
            .field("revision", &self.revision)
            .field("idle", &self.pool.len())
            .finish()
    }
}
