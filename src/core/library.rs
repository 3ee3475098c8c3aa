use crate::core::error::{EngineError, Result};
use crate::core::graph::NodeSlot;
use crate::core::native::NativeLibrary;
use crate::core::node::NodeKey;
use crate::core::prototype::Prototype;
use std::collections::{BTreeMap, BTreeSet};

/// Everything that can be instantiated by `(category, identifier)`.
pub(crate) struct Library {
    pub natives: NativeLibrary,
    pub prototypes: BTreeMap<NodeKey, Prototype>,
}

impl Library {
    pub fn new(natives: NativeLibrary) -> Self {
        Library {
            natives,
            prototypes: BTreeMap::new(),
        }
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.natives.contains(key) || self.prototypes.contains_key(key)
    }

    /// A new node for `key`: a native clone, or an unbound reference.
    ///
    /// `editing` is the prototype currently taken out of the table for an
    /// edit, so that it can reference itself.
    pub fn create_slot(&self, key: &NodeKey, editing: Option<&Prototype>) -> Result<NodeSlot> {
        if let Some(logic) = self.natives.create(key) {
            return Ok(NodeSlot::native(logic));
        }
        let prototype = self
            .prototypes
            .get(key)
            .or_else(|| editing.filter(|p| p.key() == key));
        match prototype {
            Some(p) => Ok(NodeSlot::reference(key.clone(), p.input_count(), p.output_count())),
            None => Err(EngineError::UnknownNode {
                category: key.category.clone(),
                identifier: key.identifier.clone(),
            }),
        }
    }

    pub fn categories(&self) -> Vec<String> {
        self.keys()
            .map(|key| key.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn identifiers(&self, category: &str) -> Vec<String> {
        self.keys()
            .filter(|key| key.category == category)
            .map(|key| key.identifier.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn keys(&self) -> impl Iterator<Item = &NodeKey> {
        self.natives.keys().chain(self.prototypes.keys())
    }
}
