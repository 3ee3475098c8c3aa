use crate::core::console::Console;
use crate::core::signal::Signal;
use std::any::Any;
use std::fmt;

/// Index of a node inside an arena.
///
/// Ids handed out by the [`Engine`](crate::Engine) address the live graph; ids
/// handed out by a [`PrototypeBuilder`](crate::PrototypeBuilder) address that
/// prototype's template and are only meaningful inside it. Removing a node
/// retires its id for good.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }

    /// The socket for port `port` of this node (input or output, depending on
    /// which side of a connection it is used on).
    pub fn port(self, port: usize) -> Socket {
        Socket::new(self, port)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One endpoint of a connection: a node and one of its port indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Socket {
    pub node: NodeId,
    pub port: usize,
}

impl Socket {
    pub fn new(node: NodeId, port: usize) -> Self {
        Socket { node, port }
    }
}

impl fmt::Display for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.port)
    }
}

/// The `(category, identifier)` pair naming a native node or a prototype.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey {
    pub category: String,
    pub identifier: String,
}

impl NodeKey {
    pub fn new(category: impl Into<String>, identifier: impl Into<String>) -> Self {
        NodeKey {
            category: category.into(),
            identifier: identifier.into(),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.category, self.identifier)
    }
}

/// A helper trait that just provides the `as_any` method, so callers can
/// downcast a `dyn NodeLogic` back to its concrete node type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// What a native node lets its `fire` touch: the console and its own outputs.
pub struct FireContext<'a> {
    console: &'a mut dyn Console,
    emitted: Vec<(usize, Signal)>,
}

impl<'a> FireContext<'a> {
    pub(crate) fn new(console: &'a mut dyn Console) -> Self {
        FireContext {
            console,
            emitted: Vec::new(),
        }
    }

    /// Sends `signal` out of output `port`. Delivery happens as soon as the
    /// firing node returns, in emission order.
    pub fn emit(&mut self, port: usize, signal: Signal) {
        self.emitted.push((port, signal));
    }

    pub fn console(&mut self) -> &mut dyn Console {
        &mut *self.console
    }

    pub(crate) fn into_emitted(self) -> Vec<(usize, Signal)> {
        self.emitted
    }
}

/// Defines the behaviour of a native node.
///
/// Arity is fixed for the lifetime of the logic. `fire` is called by the
/// scheduler once every input slot holds a value; `inputs` has exactly
/// `inputs()` entries.
pub trait NodeLogic: AsAny + 'static {
    /// The name this node is registered and saved under.
    fn key(&self) -> NodeKey;

    fn inputs(&self) -> usize;

    fn outputs(&self) -> usize;

    fn fire(&mut self, inputs: &[Signal], ctx: &mut FireContext<'_>);

    /// Create a boxed clone of this trait object.
    fn clone_box(&self) -> Box<dyn NodeLogic>;

    /// Short human-readable text for introspection.
    fn label(&self) -> String {
        self.key().identifier
    }
}

impl Clone for Box<dyn NodeLogic> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
