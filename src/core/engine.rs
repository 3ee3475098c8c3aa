//! The live graph and its batched step scheduler.

use crate::core::config::EngineConfig;
use crate::core::console::{Console, StdConsole};
use crate::core::error::{EngineError, Result};
use crate::core::graph::{Graph, NodeBody, NodeSlot};
use crate::core::library::Library;
use crate::core::native::NativeLibrary;
use crate::core::native::flow::Constant;
use crate::core::node::{FireContext, NodeId, NodeKey, NodeLogic, Socket};
use crate::core::prototype::builder::PrototypeBuilder;
use crate::core::prototype::{InstanceId, Prototype};
use crate::core::signal::Signal;

/// Owns a graph of nodes, the registry of everything that can be placed in
/// it, and the pending set driving execution.
///
/// Execution proceeds in waves: each [`step`](Engine::step) fires every node
/// that was ready when the step began. Nodes made ready during a step fire
/// in the next one.
pub struct Engine {
    pub(crate) graph: Graph,
    pub(crate) library: Library,
    /// Nodes waiting to fire, in scheduling order.
    pub(crate) pending: Vec<NodeId>,
    /// Bound references, checked for recycling after every step.
    pub(crate) watch: Vec<NodeId>,
    pub(crate) console: Box<dyn Console>,
    pub(crate) config: EngineConfig,
    steps: u64,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine with the standard native library, default configuration
    /// and the process console.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Engine {
            graph: Graph::new(),
            library: Library::new(NativeLibrary::standard()),
            pending: Vec::new(),
            watch: Vec::new(),
            console: Box::new(StdConsole::new()),
            config,
            steps: 0,
        }
    }

    /// Replaces the console used by `IO` nodes.
    pub fn with_console(mut self, console: impl Console + 'static) -> Self {
        self.console = Box::new(console);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Steps taken since the engine was created.
    pub fn steps_taken(&self) -> u64 {
        self.steps
    }

    // ------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------

    /// Makes a custom native node available by its key.
    pub fn register_native(&mut self, logic: Box<dyn NodeLogic>) -> Result<()> {
        let key = logic.key();
        if self.library.prototypes.contains_key(&key) {
            return Err(EngineError::DuplicateNode(key));
        }
        self.library.natives.register(logic)
    }

    /// Registers an empty prototype with fixed arity.
    pub fn declare_prototype(
        &mut self,
        category: &str,
        identifier: &str,
        inputs: usize,
        outputs: usize,
    ) -> Result<()> {
        let key = NodeKey::new(category, identifier);
        if self.library.contains(&key) {
            return Err(EngineError::DuplicateNode(key));
        }
        log::debug!("declared prototype {} ({} -> {})", key, inputs, outputs);
        self.library
            .prototypes
            .insert(key.clone(), Prototype::new(key, inputs, outputs));
        Ok(())
    }

    /// Registers a prototype and fills its template with `build`.
    ///
    /// The prototype is registered before `build` runs, so the template may
    /// contain references to itself.
    pub fn register_prototype<F>(
        &mut self,
        category: &str,
        identifier: &str,
        inputs: usize,
        outputs: usize,
        build: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut PrototypeBuilder<'_>) -> Result<()>,
    {
        self.declare_prototype(category, identifier, inputs, outputs)?;
        self.edit_prototype(category, identifier, build)
    }

    /// Applies a structural edit to a prototype's template.
    ///
    /// Idle pooled instances are discarded; instances bound right now keep
    /// their old structure and are discarded when recycled.
    pub fn edit_prototype<F, R>(&mut self, category: &str, identifier: &str, edit: F) -> Result<R>
    where
        F: FnOnce(&mut PrototypeBuilder<'_>) -> Result<R>,
    {
        let key = NodeKey::new(category, identifier);
        let mut prototype = self
            .library
            .prototypes
            .remove(&key)
            .ok_or_else(|| EngineError::UnknownPrototype(key.clone()))?;

        let result = edit(&mut PrototypeBuilder::new(&mut prototype, &self.library));

        prototype.revision += 1;
        let stale = std::mem::take(&mut prototype.pool);
        log::debug!(
            "edited prototype {} (revision {}, {} idle instances dropped)",
            key,
            prototype.revision,
            stale.len()
        );
        self.library.prototypes.insert(key, prototype);
        for instance in stale {
            self.discard(instance);
        }
        result
    }

    /// Drops every idle instance of a prototype.
    pub fn clear_recycled_instances(&mut self, category: &str, identifier: &str) -> Result<()> {
        let key = NodeKey::new(category, identifier);
        let prototype = self
            .library
            .prototypes
            .get_mut(&key)
            .ok_or_else(|| EngineError::UnknownPrototype(key.clone()))?;
        let stale = std::mem::take(&mut prototype.pool);
        log::debug!("cleared {} idle instances of {}", stale.len(), key);
        for instance in stale {
            self.discard(instance);
        }
        Ok(())
    }

    pub fn prototype(&self, category: &str, identifier: &str) -> Option<&Prototype> {
        self.library
            .prototypes
            .get(&NodeKey::new(category, identifier))
    }

    pub fn prototypes(&self) -> impl Iterator<Item = &Prototype> {
        self.library.prototypes.values()
    }

    /// Every category with at least one native node or prototype, sorted.
    pub fn categories(&self) -> Vec<String> {
        self.library.categories()
    }

    pub fn identifiers(&self, category: &str) -> Vec<String> {
        self.library.identifiers(category)
    }

    // ------------------------------------------------------------------
    // Graph edits
    // ------------------------------------------------------------------

    /// Places a node by name: a native clone or a fresh reference to a prototype.
    pub fn create_node(&mut self, category: &str, identifier: &str) -> Result<NodeId> {
        let slot = self
            .library
            .create_slot(&NodeKey::new(category, identifier), None)?;
        Ok(self.graph.insert(slot))
    }

    pub fn add_logic(&mut self, logic: Box<dyn NodeLogic>) -> NodeId {
        self.graph.insert(NodeSlot::native(logic))
    }

    pub fn add_constant(&mut self, value: impl Into<Signal>) -> NodeId {
        self.add_logic(Box::new(Constant::new(value)))
    }

    fn visible(&self, id: NodeId) -> Result<&NodeSlot> {
        match self.graph.get(id) {
            Some(slot) if !slot.internal => Ok(slot),
            _ => Err(EngineError::MissingNode(id)),
        }
    }

    /// Adds a fan-out edge. Connecting the same pair twice is a no-op.
    pub fn connect(&mut self, from: Socket, to: Socket) -> Result<()> {
        self.visible(from.node)?;
        self.visible(to.node)?;
        self.graph.connect(from, to)?;
        if let Some(placeholder) = self.bound_output(from) {
            self.graph.connect(placeholder.port(0), to)?;
        }
        Ok(())
    }

    pub fn disconnect_all(&mut self, from: Socket) -> Result<()> {
        self.visible(from.node)?;
        self.graph.disconnect_all(from)?;
        if let Some(placeholder) = self.bound_output(from) {
            self.graph.disconnect_all(placeholder.port(0))?;
        }
        Ok(())
    }

    pub fn outputs_of(&self, from: Socket) -> Result<Vec<Socket>> {
        self.visible(from.node)?;
        self.graph.outputs_of(from)
    }

    /// The output placeholder currently standing in for a bound reference's port.
    fn bound_output(&self, from: Socket) -> Option<NodeId> {
        let instance = self.graph.get(from.node)?.as_reference()?.instance.as_ref()?;
        instance.outputs.get(from.port).copied()
    }

    /// Removes a node and every edge into it.
    ///
    /// A bound reference gives up its instance first: an idle one goes back to
    /// the pool, one still holding pulses is discarded. The removed id stays
    /// dead and later calls with it fail with [`EngineError::MissingNode`].
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        self.visible(id)?;
        self.retire(id);
        self.pending.retain(|pending| *pending != id);
        self.graph.detach(id)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Nodes placed directly in this engine's graph.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.graph
            .iter()
            .filter(|(_, slot)| !slot.internal)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn node_key(&self, id: NodeId) -> Option<NodeKey> {
        self.visible(id).ok().map(NodeSlot::key)
    }

    pub fn node_label(&self, id: NodeId) -> Option<String> {
        self.visible(id).ok().map(NodeSlot::label)
    }

    /// `(inputs, outputs)` of a node.
    pub fn arity(&self, id: NodeId) -> Option<(usize, usize)> {
        self.visible(id)
            .ok()
            .map(|slot| (slot.input_arity(), slot.output_arity()))
    }

    pub fn is_scheduled(&self, id: NodeId) -> bool {
        self.graph.get(id).is_some_and(|slot| slot.scheduled)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// The instance currently backing a reference, if it is bound.
    pub fn instance_of(&self, reference: NodeId) -> Option<InstanceId> {
        let slot = self.graph.get(reference)?;
        slot.as_reference()?.instance.as_ref().map(|instance| instance.id)
    }

    pub fn idle_instances(&self, category: &str, identifier: &str) -> usize {
        self.prototype(category, identifier)
            .map_or(0, Prototype::idle_instances)
    }

    /// References currently bound to an instance.
    pub fn watched(&self) -> &[NodeId] {
        &self.watch
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    /// Delivers `signal` to one input. The node is scheduled once all of its
    /// inputs hold a value.
    pub fn pulse_input(&mut self, to: Socket, signal: impl Into<Signal>) -> Result<()> {
        self.visible(to.node)?;
        self.graph.check_input(to)?;
        self.deliver(to, signal.into());
        Ok(())
    }

    pub(crate) fn deliver(&mut self, to: Socket, signal: Signal) {
        let Some(slot) = self.graph.get_mut(to.node) else {
            log::warn!("dropped pulse for missing node {}", to.node);
            return;
        };
        if slot.store(to.port, signal).is_none() {
            log::warn!("dropped pulse for missing port {}", to);
            return;
        }
        if slot.ready() && !slot.scheduled {
            slot.scheduled = true;
            self.pending.push(to.node);
        }
    }

    /// Sends `signal` to every destination of output `port` of `from`.
    pub(crate) fn emit(&mut self, from: NodeId, port: usize, signal: Signal) {
        let destinations: Vec<Socket> = match self.graph.get(from).and_then(|s| s.outputs.get(port)) {
            Some(fan_out) => fan_out.iter().copied().collect(),
            None => {
                log::warn!("node {} emitted on missing output {}", from, port);
                return;
            }
        };
        for to in destinations {
            self.deliver(to, signal.clone());
        }
    }

    /// Runs one wave. Returns whether work remains for another.
    ///
    /// The pending set is snapshotted and every snapshotted node has its
    /// inputs swapped out before any of them fires, so pulses produced while
    /// firing only ever schedule work for the next step. Afterwards, bound
    /// references that went idle are recycled.
    pub fn step(&mut self) -> Result<bool> {
        let pulsing = std::mem::take(&mut self.pending);
        let mut wave = Vec::with_capacity(pulsing.len());
        for id in pulsing {
            if let Some(slot) = self.graph.get_mut(id) {
                slot.scheduled = false;
                wave.push((id, slot.take_inputs()));
            }
        }

        for (id, inputs) in wave {
            self.fire(id, inputs)?;
        }

        self.recycle();
        self.steps += 1;
        Ok(!self.pending.is_empty())
    }

    /// Steps until nothing is pending; returns the number of steps taken.
    ///
    /// Stops with [`EngineError::StepLimitExceeded`] when `max_steps` is
    /// configured and reached first.
    pub fn run_until_idle(&mut self) -> Result<u64> {
        let mut taken = 0;
        while self.has_pending() {
            if let Some(limit) = self.config.max_steps {
                if taken >= limit {
                    return Err(EngineError::StepLimitExceeded(limit));
                }
            }
            self.step()?;
            taken += 1;
        }
        Ok(taken)
    }

    fn fire(&mut self, id: NodeId, inputs: Vec<Signal>) -> Result<()> {
        let Some(slot) = self.graph.get(id) else {
            return Ok(());
        };
        if self.config.trace_firing {
            log::trace!("firing {} {}", id, slot.label());
        }
        if slot.as_reference().is_some() {
            return self.fire_reference(id, inputs);
        }
        let Some(NodeBody::Native(logic)) = self.graph.get_mut(id).map(|slot| &mut slot.body) else {
            return Ok(());
        };
        let mut ctx = FireContext::new(self.console.as_mut());
        logic.fire(&inputs, &mut ctx);
        for (port, signal) in ctx.into_emitted() {
            self.emit(id, port, signal);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::console::BufferConsole;

    fn engine() -> (Engine, BufferConsole) {
        let console = BufferConsole::new();
        (Engine::new().with_console(console.clone()), console)
    }

    #[test]
    fn test_node_waits_for_every_input() {
        let (mut engine, console) = engine();
        let add = engine.create_node("Math", "Add").unwrap();
        let print = engine.create_node("IO", "Print").unwrap();
        engine.connect(add.port(0), print.port(0)).unwrap();

        engine.pulse_input(add.port(0), 1).unwrap();
        assert!(!engine.has_pending());
        engine.pulse_input(add.port(0), 2).unwrap();
        assert!(!engine.has_pending());
        engine.pulse_input(add.port(1), 10).unwrap();
        assert!(engine.is_scheduled(add));

        engine.run_until_idle().unwrap();
        assert_eq!(console.writes(), vec!["12".to_string()]);

        // Firing consumed both slots.
        engine.pulse_input(add.port(1), 5).unwrap();
        assert!(!engine.has_pending());
    }

    #[test]
    fn test_pulses_during_a_step_wait_for_the_next() {
        let (mut engine, console) = engine();
        let a = engine.create_node("Core", "Socket").unwrap();
        let b = engine.create_node("IO", "Print").unwrap();
        engine.connect(a.port(0), b.port(0)).unwrap();
        engine.pulse_input(a.port(0), 1).unwrap();

        assert!(engine.step().unwrap());
        assert!(console.writes().is_empty());
        assert!(engine.is_scheduled(b));
        assert!(!engine.step().unwrap());
        assert_eq!(console.writes(), vec!["1".to_string()]);
    }

    #[test]
    fn test_feedback_loop_spreads_across_steps() {
        let (mut engine, console) = engine();
        let print = engine.create_node("IO", "Print").unwrap();
        let add = engine.create_node("Math", "Add").unwrap();
        let one = engine.add_constant(1);
        let less = engine.create_node("Compare", "LessThan").unwrap();
        let limit = engine.add_constant(3);

        engine.connect(print.port(0), add.port(0)).unwrap();
        engine.connect(print.port(0), one.port(0)).unwrap();
        engine.connect(one.port(0), add.port(1)).unwrap();
        engine.connect(add.port(0), less.port(0)).unwrap();
        engine.connect(add.port(0), limit.port(0)).unwrap();
        engine.connect(limit.port(0), less.port(1)).unwrap();
        engine.connect(less.port(0), print.port(0)).unwrap();

        engine.pulse_input(print.port(0), 0).unwrap();
        let steps = engine.run_until_idle().unwrap();
        assert_eq!(console.transcript().output(), "012");
        assert!(steps > 3);
    }

    #[test]
    fn test_step_limit() {
        let config = EngineConfig::new().max_steps(5);
        let mut engine = Engine::with_config(config).with_console(BufferConsole::new());
        let echo = engine.create_node("Core", "Socket").unwrap();
        engine.connect(echo.port(0), echo.port(0)).unwrap();
        engine.pulse_input(echo.port(0), 1).unwrap();
        assert!(matches!(
            engine.run_until_idle(),
            Err(EngineError::StepLimitExceeded(5))
        ));
        assert_eq!(engine.steps_taken(), 5);
    }

    #[test]
    fn test_structural_errors() {
        let (mut engine, _) = engine();
        assert!(matches!(
            engine.create_node("Math", "Exponent"),
            Err(EngineError::UnknownNode { .. })
        ));
        let add = engine.create_node("Math", "Add").unwrap();
        assert!(matches!(
            engine.pulse_input(add.port(2), 1),
            Err(EngineError::PortOutOfRange { port: 2, arity: 2, .. })
        ));
        engine.remove_node(add).unwrap();
        assert!(matches!(
            engine.pulse_input(add.port(0), 1),
            Err(EngineError::MissingNode(_))
        ));
    }

    #[test]
    fn test_removed_node_stops_receiving() {
        let (mut engine, console) = engine();
        let a = engine.create_node("Core", "Socket").unwrap();
        let b = engine.create_node("IO", "Print").unwrap();
        engine.connect(a.port(0), b.port(0)).unwrap();
        engine.pulse_input(b.port(0), 7).unwrap();
        engine.remove_node(b).unwrap();
        assert!(!engine.has_pending());
        engine.pulse_input(a.port(0), 1).unwrap();
        engine.run_until_idle().unwrap();
        assert!(console.writes().is_empty());
        assert!(engine.outputs_of(a.port(0)).unwrap().is_empty());
    }

    #[test]
    fn test_removed_id_is_not_reused() {
        let (mut engine, console) = engine();
        let old = engine.create_node("IO", "Print").unwrap();
        engine.remove_node(old).unwrap();
        let fresh = engine.create_node("IO", "Print").unwrap();
        assert_ne!(fresh, old);
        assert!(matches!(
            engine.pulse_input(old.port(0), 1),
            Err(EngineError::MissingNode(_))
        ));
        assert!(matches!(engine.remove_node(old), Err(EngineError::MissingNode(_))));
        assert_eq!(engine.nodes(), vec![fresh]);
        engine.run_until_idle().unwrap();
        assert!(console.writes().is_empty());
    }

    #[test]
    fn test_introspection() {
        let (mut engine, _) = engine();
        let index = engine.create_node("Array", "[]").unwrap();
        assert_eq!(engine.arity(index), Some((2, 1)));
        assert_eq!(engine.node_key(index), Some(NodeKey::new("Array", "Index")));
        let text = engine.add_constant("hi");
        assert_eq!(engine.node_label(text).as_deref(), Some("\"hi\""));
        assert_eq!(engine.nodes(), vec![index, text]);
        assert!(engine.categories().contains(&"IO".to_string()));
        assert!(engine.identifiers("IO").contains(&"ReadLine".to_string()));
    }
}
