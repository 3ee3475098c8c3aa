//! Save documents for prototypes.
//!
//! A project is a list of prototypes. Each placed node in a prototype gets a
//! stable integer index, and edges refer to nodes by that index rather than by
//! id. Loading runs in two passes: every prototype is declared first, so that
//! forward and self references resolve, and only then are templates filled
//! in and wired.
//!
//! ```json
//! {
//!   "prototypes": [{
//!     "category": "User", "identifier": "Double",
//!     "size": { "width": 800, "height": 600 },
//!     "inputs":  [{ "index": 0, "x": 0, "y": 0, "outputs": [[{ "node": 2, "socket": 0 }, { "node": 2, "socket": 1 }]] }],
//!     "outputs": [{ "index": 1, "x": 0, "y": 0, "outputs": [[]] }],
//!     "nodes": {
//!       "native": [{ "index": 2, "x": 0, "y": 0, "category": "Math", "identifier": "Add",
//!                    "outputs": [[{ "node": 1, "socket": 0 }]] }]
//!     }
//!   }]
//! }
//! ```

use crate::core::engine::Engine;
use crate::core::error::{EngineError, Result};
use crate::core::node::{NodeId, NodeKey, Socket};
use crate::core::prototype::builder::PrototypeBuilder;
use crate::core::prototype::{CanvasSize, Prototype};
use crate::core::signal::Signal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSave {
    pub prototypes: Vec<PrototypeSave>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrototypeSave {
    pub category: String,
    pub identifier: String,
    #[serde(default)]
    pub size: CanvasSize,
    /// Boundary inputs, in port order.
    #[serde(default)]
    pub inputs: Vec<PlacedNodeSave>,
    /// Boundary outputs, in port order.
    #[serde(default)]
    pub outputs: Vec<PlacedNodeSave>,
    #[serde(default)]
    pub nodes: InnerNodesSave,
}

/// Inner nodes, bucketed so literal payloads keep their type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InnerNodesSave {
    /// Native nodes and prototype references, by name.
    pub native: Vec<PlacedNodeSave>,
    pub int: Vec<LiteralSave<i64>>,
    pub real: Vec<LiteralSave<f64>>,
    pub string: Vec<LiteralSave<String>>,
    pub nan: Vec<PlacedNodeSave>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacedNodeSave {
    pub index: usize,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Destinations per output port.
    #[serde(default)]
    pub outputs: Vec<Vec<EdgeSave>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralSave<T> {
    #[serde(flatten)]
    pub node: PlacedNodeSave,
    pub value: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSave {
    pub node: usize,
    pub socket: usize,
}

impl ProjectSave {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

impl PrototypeSave {
    fn placed(&self) -> impl Iterator<Item = &PlacedNodeSave> {
        let nodes = &self.nodes;
        self.inputs
            .iter()
            .chain(&self.outputs)
            .chain(&nodes.native)
            .chain(nodes.int.iter().map(|literal| &literal.node))
            .chain(nodes.real.iter().map(|literal| &literal.node))
            .chain(nodes.string.iter().map(|literal| &literal.node))
            .chain(&nodes.nan)
    }
}

impl Prototype {
    /// Captures the template as a save document.
    ///
    /// Fails for templates holding constants JSON cannot express: arrays and
    /// non-finite reals.
    pub fn to_save(&self) -> Result<PrototypeSave> {
        let mut order: Vec<NodeId> = self.inputs().to_vec();
        order.extend_from_slice(self.outputs());
        order.extend(self.inner_nodes());
        let index: HashMap<NodeId, usize> =
            order.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let place = |id: NodeId| -> Result<PlacedNodeSave> {
            let slot = self.graph.try_get(id)?;
            let mut outputs = Vec::with_capacity(slot.output_arity());
            for fan_out in &slot.outputs {
                let edges = fan_out
                    .iter()
                    .filter_map(|to| {
                        index.get(&to.node).map(|node| EdgeSave {
                            node: *node,
                            socket: to.port,
                        })
                    })
                    .collect();
                outputs.push(edges);
            }
            let placement = self.placement(id);
            Ok(PlacedNodeSave {
                index: index.get(&id).copied().unwrap_or_default(),
                x: placement.x,
                y: placement.y,
                category: None,
                identifier: None,
                outputs,
            })
        };

        let mut save = PrototypeSave {
            category: self.key().category.clone(),
            identifier: self.key().identifier.clone(),
            size: self.canvas(),
            inputs: self.inputs().iter().map(|id| place(*id)).collect::<Result<_>>()?,
            outputs: self.outputs().iter().map(|id| place(*id)).collect::<Result<_>>()?,
            nodes: InnerNodesSave::default(),
        };

        for id in self.inner_nodes() {
            let node = place(id)?;
            match self.constant_value(id) {
                Some(Signal::Int(value)) => save.nodes.int.push(LiteralSave { node, value }),
                Some(Signal::Real(value)) if value.is_finite() => {
                    save.nodes.real.push(LiteralSave { node, value })
                }
                Some(Signal::String(value)) => {
                    save.nodes.string.push(LiteralSave { node, value })
                }
                Some(Signal::NaN) => save.nodes.nan.push(node),
                Some(other) => {
                    return Err(EngineError::InvalidSave(format!(
                        "{} holds a {} constant that cannot be saved",
                        self.key(),
                        other.type_name()
                    )));
                }
                None => {
                    let key = self.node_key(id).ok_or(EngineError::MissingNode(id))?;
                    save.nodes.native.push(PlacedNodeSave {
                        category: Some(key.category),
                        identifier: Some(key.identifier),
                        ..node
                    });
                }
            }
        }
        Ok(save)
    }
}

impl Engine {
    pub fn export_prototype(&self, category: &str, identifier: &str) -> Result<PrototypeSave> {
        self.prototype(category, identifier)
            .ok_or_else(|| EngineError::UnknownPrototype(NodeKey::new(category, identifier)))?
            .to_save()
    }

    /// Every registered prototype, sorted by key.
    pub fn export_project(&self) -> Result<ProjectSave> {
        let prototypes = self
            .prototypes()
            .map(Prototype::to_save)
            .collect::<Result<_>>()?;
        Ok(ProjectSave { prototypes })
    }

    /// Registers every prototype in `project`. Names already registered are
    /// rejected with [`EngineError::DuplicateNode`].
    ///
    /// On any error the prototypes declared by this call are removed again,
    /// leaving the registry as it was.
    pub fn import_project(&mut self, project: &ProjectSave) -> Result<()> {
        let mut declared = Vec::new();
        let result = self.import_declared(project, &mut declared);
        if let Err(e) = &result {
            log::debug!("import failed ({}), dropping {} prototypes", e, declared.len());
            for key in declared {
                self.library.prototypes.remove(&key);
            }
        }
        result
    }

    fn import_declared(&mut self, project: &ProjectSave, declared: &mut Vec<NodeKey>) -> Result<()> {
        for save in &project.prototypes {
            self.declare_prototype(
                &save.category,
                &save.identifier,
                save.inputs.len(),
                save.outputs.len(),
            )?;
            declared.push(NodeKey::new(&save.category, &save.identifier));
        }
        for save in &project.prototypes {
            self.edit_prototype(&save.category, &save.identifier, |builder| {
                load_template(builder, save)
            })?;
        }
        log::debug!("imported {} prototypes", project.prototypes.len());
        Ok(())
    }
}

fn load_template(builder: &mut PrototypeBuilder<'_>, save: &PrototypeSave) -> Result<()> {
    let mut ids: HashMap<usize, NodeId> = HashMap::new();
    let mut claim = |index: usize, id: NodeId| -> Result<()> {
        if ids.insert(index, id).is_some() {
            return Err(EngineError::InvalidSave(format!(
                "{}.{} uses node index {} twice",
                save.category, save.identifier, index
            )));
        }
        Ok(())
    };

    for (port, placed) in save.inputs.iter().enumerate() {
        claim(placed.index, builder.input(port)?)?;
    }
    for (port, placed) in save.outputs.iter().enumerate() {
        claim(placed.index, builder.output(port)?)?;
    }
    for placed in &save.nodes.native {
        let (Some(category), Some(identifier)) = (&placed.category, &placed.identifier) else {
            return Err(EngineError::InvalidSave(format!(
                "node {} in {}.{} has no name",
                placed.index, save.category, save.identifier
            )));
        };
        let id = builder.add(category, identifier).map_err(|e| match e {
            EngineError::UnknownNode { .. } => EngineError::InvalidSave(format!(
                "{}.{} uses unregistered node {}.{}",
                save.category, save.identifier, category, identifier
            )),
            other => other,
        })?;
        claim(placed.index, id)?;
    }
    for literal in &save.nodes.int {
        claim(literal.node.index, builder.add_constant(literal.value))?;
    }
    for literal in &save.nodes.real {
        claim(literal.node.index, builder.add_constant(literal.value))?;
    }
    for literal in &save.nodes.string {
        claim(literal.node.index, builder.add_constant(literal.value.as_str()))?;
    }
    for placed in &save.nodes.nan {
        claim(placed.index, builder.add_constant(Signal::NaN))?;
    }

    builder.set_canvas(save.size.width, save.size.height);
    for placed in save.placed() {
        let Some(from) = ids.get(&placed.index).copied() else {
            continue;
        };
        builder.place(from, placed.x, placed.y)?;
        for (port, edges) in placed.outputs.iter().enumerate() {
            for edge in edges {
                let to = ids.get(&edge.node).ok_or_else(|| {
                    EngineError::InvalidSave(format!(
                        "edge from node {} in {}.{} points at missing node {}",
                        placed.index, save.category, save.identifier, edge.node
                    ))
                })?;
                builder.connect(Socket::new(from, port), to.port(edge.socket))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::console::BufferConsole;
    use serde_json::json;

    fn doubler() -> serde_json::Value {
        json!({
            "prototypes": [{
                "category": "User",
                "identifier": "Double",
                "inputs": [{ "index": 0, "outputs": [[{ "node": 2, "socket": 0 }, { "node": 2, "socket": 1 }]] }],
                "outputs": [{ "index": 1, "outputs": [[]] }],
                "nodes": {
                    "native": [{
                        "index": 2, "x": 120, "y": 40,
                        "category": "Math", "identifier": "Add",
                        "outputs": [[{ "node": 1, "socket": 0 }]]
                    }]
                }
            }]
        })
    }

    #[test]
    fn test_import_json_document() {
        let project: ProjectSave = serde_json::from_value(doubler()).unwrap();
        let console = BufferConsole::new();
        let mut engine = Engine::new().with_console(console.clone());
        engine.import_project(&project).unwrap();

        let double = engine.create_node("User", "Double").unwrap();
        let print = engine.create_node("IO", "Print").unwrap();
        engine.connect(double.port(0), print.port(0)).unwrap();
        engine.pulse_input(double.port(0), 21).unwrap();
        engine.run_until_idle().unwrap();
        assert_eq!(console.writes(), vec!["42".to_string()]);

        let proto = engine.prototype("User", "Double").unwrap();
        assert_eq!(proto.canvas(), CanvasSize::default());
        assert_eq!(proto.placement(proto.inner_nodes()[0]).x, 120);
    }

    #[test]
    fn test_export_buckets_literals() {
        let mut engine = Engine::new().with_console(BufferConsole::new());
        engine
            .register_prototype("User", "Literals", 1, 1, |p| {
                let text = p.add_constant("hi");
                let real = p.add_constant(2.5);
                let int = p.add_constant(3);
                let nan = p.add("Constant", "NaN")?;
                p.connect(p.input(0)?.port(0), text.port(0))?;
                p.connect(text.port(0), real.port(0))?;
                p.connect(real.port(0), int.port(0))?;
                p.connect(int.port(0), nan.port(0))?;
                p.connect(nan.port(0), p.output(0)?.port(0))
            })
            .unwrap();

        let save = engine.export_prototype("User", "Literals").unwrap();
        assert_eq!(save.nodes.string[0].value, "hi");
        assert_eq!(save.nodes.real[0].value, 2.5);
        assert_eq!(save.nodes.int[0].value, 3);
        assert_eq!(save.nodes.nan.len(), 1);
        assert!(save.nodes.native.is_empty());
        assert_eq!(save.inputs[0].outputs, vec![vec![EdgeSave { node: 2, socket: 0 }]]);
    }

    #[test]
    fn test_array_constants_cannot_be_saved() {
        let mut engine = Engine::new();
        engine
            .register_prototype("User", "Holder", 0, 0, |p| {
                p.add_constant(Signal::new_array());
                Ok(())
            })
            .unwrap();
        assert!(matches!(
            engine.export_project(),
            Err(EngineError::InvalidSave(_))
        ));
    }

    #[test]
    fn test_bad_documents_are_rejected() {
        let mut dangling = doubler();
        dangling["prototypes"][0]["nodes"]["native"][0]["outputs"][0][0]["node"] = json!(9);
        let project: ProjectSave = serde_json::from_value(dangling).unwrap();
        assert!(matches!(
            Engine::new().import_project(&project),
            Err(EngineError::InvalidSave(_))
        ));

        let mut duplicate = doubler();
        duplicate["prototypes"][0]["nodes"]["native"][0]["index"] = json!(0);
        let project: ProjectSave = serde_json::from_value(duplicate).unwrap();
        assert!(matches!(
            Engine::new().import_project(&project),
            Err(EngineError::InvalidSave(_))
        ));

        assert!(ProjectSave::from_json("{ \"prototypes\": 3 }").is_err());
    }
}
