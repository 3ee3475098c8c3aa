use super::{CanvasSize, Placement, Prototype};
use crate::core::error::{EngineError, Result};
use crate::core::graph::NodeSlot;
use crate::core::library::Library;
use crate::core::native::flow::Constant;
use crate::core::node::{NodeId, NodeKey, NodeLogic, Socket};
use crate::core::signal::Signal;

/// Edits the template of one prototype.
///
/// Handed out by [`Engine::register_prototype`](crate::Engine::register_prototype)
/// and [`Engine::edit_prototype`](crate::Engine::edit_prototype). Ids returned
/// here address the template, not the live graph.
pub struct PrototypeBuilder<'a> {
    proto: &'a mut Prototype,
    library: &'a Library,
}

impl<'a> PrototypeBuilder<'a> {
    pub(crate) fn new(proto: &'a mut Prototype, library: &'a Library) -> Self {
        PrototypeBuilder { proto, library }
    }

    pub fn key(&self) -> &NodeKey {
        self.proto.key()
    }

    /// The placeholder standing for boundary input `port`.
    pub fn input(&self, port: usize) -> Result<NodeId> {
        self.proto.boundary_input(port)
    }

    /// The placeholder standing for boundary output `port`.
    pub fn output(&self, port: usize) -> Result<NodeId> {
        self.proto.boundary_output(port)
    }

    /// Adds a native node or a reference to any registered prototype,
    /// including the one being edited.
    pub fn add(&mut self, category: &str, identifier: &str) -> Result<NodeId> {
        let key = NodeKey::new(category, identifier);
        let slot = self.library.create_slot(&key, Some(&*self.proto))?;
        Ok(self.proto.graph.insert(slot))
    }

    pub fn add_constant(&mut self, value: impl Into<Signal>) -> NodeId {
        self.add_logic(Box::new(Constant::new(value)))
    }

    pub fn add_logic(&mut self, logic: Box<dyn NodeLogic>) -> NodeId {
        self.proto.graph.insert(NodeSlot::native(logic))
    }

    /// Wires two template nodes. Output placeholders cannot be a source:
    /// their fan-out is supplied by whichever reference binds the instance.
    pub fn connect(&mut self, from: Socket, to: Socket) -> Result<()> {
        if self.proto.outputs().contains(&from.node) {
            return Err(EngineError::BoundaryNode(from.node));
        }
        self.proto.graph.connect(from, to)
    }

    pub fn disconnect_all(&mut self, from: Socket) -> Result<()> {
        self.proto.graph.disconnect_all(from)
    }

    pub fn outputs_of(&self, from: Socket) -> Result<Vec<Socket>> {
        self.proto.graph.outputs_of(from)
    }

    /// Removes an inner node. Edges that fed its input `k` are rewired to the
    /// destinations of its output `k`.
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        if self.proto.is_boundary(id) {
            return Err(EngineError::BoundaryNode(id));
        }
        self.proto.graph.splice_out(id)?;
        self.proto.placements.remove(&id);
        Ok(())
    }

    pub fn place(&mut self, id: NodeId, x: i32, y: i32) -> Result<()> {
        self.proto.graph.try_get(id)?;
        self.proto.placements.insert(id, Placement { x, y });
        Ok(())
    }

    pub fn set_canvas(&mut self, width: u32, height: u32) {
        self.proto.canvas = CanvasSize { width, height };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::native::NativeLibrary;

    fn library() -> Library {
        Library::new(NativeLibrary::standard())
    }

    #[test]
    fn test_boundary_lookup() {
        let library = library();
        let mut proto = Prototype::new(NodeKey::new("User", "Pair"), 2, 1);
        let builder = PrototypeBuilder::new(&mut proto, &library);
        assert!(builder.input(1).is_ok());
        assert!(matches!(
            builder.output(1),
            Err(EngineError::NoSuchBoundary { port: 1, .. })
        ));
    }

    #[test]
    fn test_add_resolves_self_reference() {
        let library = library();
        let mut proto = Prototype::new(NodeKey::new("User", "Recurse"), 1, 1);
        let mut builder = PrototypeBuilder::new(&mut proto, &library);
        let inner = builder.add("User", "Recurse").unwrap();
        let input = builder.input(0).unwrap();
        builder.connect(input.port(0), inner.port(0)).unwrap();
        assert!(builder.add("User", "Missing").is_err());
        assert_eq!(proto.node_key(inner), Some(NodeKey::new("User", "Recurse")));
        assert_eq!(proto.inner_nodes(), vec![inner]);
    }

    #[test]
    fn test_boundaries_are_protected() {
        let library = library();
        let mut proto = Prototype::new(NodeKey::new("User", "Id"), 1, 1);
        let mut builder = PrototypeBuilder::new(&mut proto, &library);
        let input = builder.input(0).unwrap();
        let output = builder.output(0).unwrap();
        let add = builder.add("Math", "Add").unwrap();

        assert!(matches!(builder.remove(input), Err(EngineError::BoundaryNode(_))));
        assert!(matches!(
            builder.connect(output.port(0), add.port(0)),
            Err(EngineError::BoundaryNode(_))
        ));
    }

    #[test]
    fn test_remove_splices_edges() {
        let library = library();
        let mut proto = Prototype::new(NodeKey::new("User", "Wrap"), 1, 1);
        let mut builder = PrototypeBuilder::new(&mut proto, &library);
        let input = builder.input(0).unwrap();
        let output = builder.output(0).unwrap();
        let middle = builder.add("Core", "Socket").unwrap();
        builder.connect(input.port(0), middle.port(0)).unwrap();
        builder.connect(middle.port(0), output.port(0)).unwrap();
        builder.place(middle, 40, 60).unwrap();

        builder.remove(middle).unwrap();
        assert_eq!(builder.outputs_of(input.port(0)).unwrap(), vec![output.port(0)]);
        assert_eq!(proto.placement(middle), Placement::default());
    }

    #[test]
    fn test_constants_and_canvas() {
        let library = library();
        let mut proto = Prototype::new(NodeKey::new("User", "Ten"), 1, 1);
        let mut builder = PrototypeBuilder::new(&mut proto, &library);
        let ten = builder.add_constant(10);
        builder.set_canvas(1024, 768);
        assert_eq!(proto.constant_value(ten), Some(Signal::Int(10)));
        assert_eq!(proto.canvas(), CanvasSize { width: 1024, height: 768 });
    }
}
