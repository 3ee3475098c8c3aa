//! Binding references to instances and returning them to the pool.

use super::Instance;
use crate::core::engine::Engine;
use crate::core::error::{EngineError, Result};
use crate::core::node::{NodeId, NodeKey};
use crate::core::signal::Signal;

/// The body of a node that stands for a prototype.
pub(crate) struct Reference {
    pub key: NodeKey,
    pub instance: Option<Instance>,
}

impl Reference {
    pub fn unbound(key: NodeKey) -> Self {
        Reference {
            key,
            instance: None,
        }
    }
}

impl Engine {
    /// Forwards a reference's inputs into its instance, binding one first if
    /// needed. Values reach the input placeholders' destinations right away,
    /// without a step for the placeholder itself.
    pub(crate) fn fire_reference(&mut self, id: NodeId, inputs: Vec<Signal>) -> Result<()> {
        let entries = match self.bound_inputs(id) {
            Some(entries) => entries,
            None => {
                self.bind(id)?;
                self.bound_inputs(id).unwrap_or_default()
            }
        };
        for (placeholder, signal) in entries.into_iter().zip(inputs) {
            self.emit(placeholder, 0, signal);
        }
        Ok(())
    }

    fn bound_inputs(&self, id: NodeId) -> Option<Vec<NodeId>> {
        let reference = self.graph.get(id)?.as_reference()?;
        reference.instance.as_ref().map(|instance| instance.inputs.clone())
    }

    /// Takes an idle instance (or clones a new one), routes its output
    /// placeholders to the reference's own destinations and starts watching it.
    fn bind(&mut self, id: NodeId) -> Result<()> {
        let key = match self.graph.get(id).and_then(|slot| slot.as_reference()) {
            Some(reference) => reference.key.clone(),
            None => return Err(EngineError::MissingNode(id)),
        };
        let prototype = self
            .library
            .prototypes
            .get_mut(&key)
            .ok_or_else(|| EngineError::UnknownPrototype(key.clone()))?;

        let instance = match prototype.pool.pop() {
            Some(instance) => {
                log::debug!("reusing instance {} of {}", instance.id, key);
                instance
            }
            None => {
                let instance = prototype.instantiate(&mut self.graph);
                log::debug!(
                    "instantiated {} for {} ({} nodes)",
                    key,
                    id,
                    instance.nodes.len()
                );
                instance
            }
        };

        let routes = self
            .graph
            .get(id)
            .map(|slot| slot.outputs.clone())
            .unwrap_or_default();
        for (placeholder, fan_out) in instance.outputs.iter().zip(routes) {
            if let Some(slot) = self.graph.get_mut(*placeholder) {
                slot.outputs[0] = fan_out;
            }
        }

        if let Some(reference) = self.graph.get_mut(id).and_then(|slot| slot.as_reference_mut()) {
            reference.instance = Some(instance);
        }
        self.watch.push(id);
        Ok(())
    }

    /// Whether a node, or anything inside the instance it is bound to, is
    /// still waiting to fire.
    pub fn is_active(&self, id: NodeId) -> bool {
        let Some(slot) = self.graph.get(id) else {
            return false;
        };
        if slot.scheduled {
            return true;
        }
        slot.as_reference()
            .and_then(|reference| reference.instance.as_ref())
            .is_some_and(|instance| instance.nodes.iter().any(|node| self.is_active(*node)))
    }

    /// Unbinds every watched reference whose instance has gone quiet.
    pub(crate) fn recycle(&mut self) {
        let idle: Vec<NodeId> = self
            .watch
            .iter()
            .copied()
            .filter(|id| !self.is_active(*id))
            .collect();
        for id in idle {
            self.unbind(id);
        }
    }

    /// Detaches a reference from its instance, if it has one. Bound
    /// references nested inside the instance are unbound first.
    pub(crate) fn unbind(&mut self, id: NodeId) {
        let taken = self
            .graph
            .get_mut(id)
            .and_then(|slot| slot.as_reference_mut())
            .map(|reference| (reference.key.clone(), reference.instance.take()));
        let Some((key, Some(instance))) = taken else {
            return;
        };
        self.watch.retain(|watched| *watched != id);

        for node in &instance.nodes {
            self.unbind(*node);
        }
        for placeholder in &instance.outputs {
            if let Some(slot) = self.graph.get_mut(*placeholder) {
                slot.outputs[0].clear();
            }
        }
        self.release(&key, instance);
    }

    /// Returns an instance to its prototype's pool, or drops it when the
    /// prototype was edited since or the pool is full.
    fn release(&mut self, key: &NodeKey, instance: Instance) {
        let capacity = self.config.pool_capacity;
        let Some(prototype) = self.library.prototypes.get_mut(key) else {
            self.discard(instance);
            return;
        };
        let fits = capacity.is_none_or(|capacity| prototype.pool.len() < capacity);
        if instance.revision == prototype.revision && fits {
            log::debug!("instance {} of {} returned to pool", instance.id, key);
            prototype.pool.push(instance);
        } else {
            self.discard(instance);
        }
    }

    /// Unbinds a reference that is leaving the graph. An instance that still
    /// holds pulses is discarded with everything nested in it, so no pooled
    /// instance carries work from a previous user.
    pub(crate) fn retire(&mut self, id: NodeId) {
        if !self.is_active(id) {
            self.unbind(id);
            return;
        }
        let taken = self
            .graph
            .get_mut(id)
            .and_then(|slot| slot.as_reference_mut())
            .and_then(|reference| reference.instance.take());
        let Some(instance) = taken else {
            return;
        };
        self.watch.retain(|watched| *watched != id);
        self.discard(instance);
    }

    /// Frees an instance's nodes from the live graph.
    pub(crate) fn discard(&mut self, instance: Instance) {
        log::debug!("discarding instance {}", instance.id);
        for node in &instance.nodes {
            self.retire(*node);
            self.graph.remove(*node);
        }
        self.pending.retain(|id| !instance.nodes.contains(id));
    }
}
