//! The built-in node library.
//!
//! Nodes are grouped by category:
//! - `Core`: [`Passthrough`](flow::Passthrough) (`Socket`)
//! - `Constant`: [`Constant`](flow::Constant) literals
//! - `Math`: [`Arithmetic`](math::Arithmetic)
//! - `Compare` and `Type`: [`Comparison`](compare::Comparison), [`TypeBranch`](compare::TypeBranch)
//! - `IO`: [`ConsoleNode`](io::ConsoleNode)
//! - `Array`: [`ArrayNode`](array::ArrayNode)

pub mod array;
pub mod compare;
pub mod flow;
pub mod io;
pub mod math;

use crate::core::error::{EngineError, Result};
use crate::core::node::{NodeKey, NodeLogic};
use crate::core::signal::Signal;
use array::{ArrayNode, ArrayOp};
use compare::{CompareOp, Comparison, TypeBranch, TypeTest};
use flow::{Constant, Passthrough};
use io::{ConsoleNode, IoOp};
use math::{Arithmetic, ArithmeticOp};
use std::collections::BTreeMap;

/// Registered native nodes, each stored as a template that is cloned on use.
#[derive(Default)]
pub struct NativeLibrary {
    templates: BTreeMap<NodeKey, Box<dyn NodeLogic>>,
}

impl NativeLibrary {
    /// An empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every node this crate ships.
    pub fn standard() -> Self {
        let mut library = Self::new();
        let mut add = |logic: Box<dyn NodeLogic>| {
            let key = logic.key();
            library.templates.insert(key, logic);
        };

        add(Box::new(Passthrough));
        add(Box::new(Constant::new(Signal::Int(0))));
        add(Box::new(Constant::new(Signal::Real(0.0))));
        add(Box::new(Constant::new(Signal::String(String::new()))));
        add(Box::new(Constant::new(Signal::NaN)));
        for op in ArithmeticOp::ALL {
            add(Box::new(Arithmetic::new(op)));
        }
        for op in CompareOp::ALL {
            add(Box::new(Comparison::new(op)));
        }
        for test in TypeTest::ALL {
            add(Box::new(TypeBranch::new(test)));
        }
        for op in IoOp::ALL {
            add(Box::new(ConsoleNode::new(op)));
        }
        for op in ArrayOp::ALL {
            add(Box::new(ArrayNode::new(op)));
        }

        library
            .templates
            .insert(NodeKey::new("Array", "[]"), Box::new(ArrayNode::new(ArrayOp::Index)));
        library
    }

    /// Registers `logic` under its own key.
    pub fn register(&mut self, logic: Box<dyn NodeLogic>) -> Result<()> {
        let key = logic.key();
        self.register_as(key, logic)
    }

    /// Registers `logic` under an explicit key, e.g. an alias.
    pub fn register_as(&mut self, key: NodeKey, logic: Box<dyn NodeLogic>) -> Result<()> {
        if self.templates.contains_key(&key) {
            return Err(EngineError::DuplicateNode(key));
        }
        self.templates.insert(key, logic);
        Ok(())
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.templates.contains_key(key)
    }

    /// A fresh node for `key`.
    pub fn create(&self, key: &NodeKey) -> Option<Box<dyn NodeLogic>> {
        self.templates.get(key).map(|template| template.clone_box())
    }

    pub fn keys(&self) -> impl Iterator<Item = &NodeKey> {
        self.templates.keys()
    }
}

#[cfg(test)]
pub(crate) fn fire_with(
    logic: &mut dyn NodeLogic,
    inputs: &[Signal],
    console: crate::core::console::BufferConsole,
) -> Vec<(usize, Signal)> {
    let mut console = console;
    let mut ctx = crate::core::node::FireContext::new(&mut console);
    logic.fire(inputs, &mut ctx);
    ctx.into_emitted()
}

#[cfg(test)]
pub(crate) fn fire_once(logic: &mut dyn NodeLogic, inputs: &[Signal]) -> Vec<(usize, Signal)> {
    fire_with(logic, inputs, crate::core::console::BufferConsole::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_library_contents() {
        let library = NativeLibrary::standard();
        for (category, identifier) in [
            ("Core", "Socket"),
            ("Constant", "Int"),
            ("Constant", "NaN"),
            ("Math", "Modulo"),
            ("Compare", "LessThanOrEqualTo"),
            ("Type", "IsString"),
            ("IO", "ReadKey"),
            ("Array", "Join"),
            ("Array", "[]"),
        ] {
            assert!(
                library.contains(&NodeKey::new(category, identifier)),
                "missing {category}.{identifier}"
            );
        }
        let index = library.create(&NodeKey::new("Array", "[]")).unwrap();
        assert_eq!(index.key(), NodeKey::new("Array", "Index"));
        assert_eq!((index.inputs(), index.outputs()), (2, 1));
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut library = NativeLibrary::standard();
        assert!(matches!(
            library.register(Box::new(Passthrough)),
            Err(EngineError::DuplicateNode(_))
        ));
    }
}
