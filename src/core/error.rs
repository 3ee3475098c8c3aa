use crate::core::node::{NodeId, NodeKey};
use thiserror::Error;

/// Structural failures of the engine API.
///
/// Data-level problems (wrong signal variant, out-of-range index) are never
/// reported here: they degrade to `NaN` or to a node that emits nothing.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no native node or prototype named {category}.{identifier}")]
    UnknownNode {
        category: String,
        identifier: String,
    },

    #[error("prototype {0} is not registered")]
    UnknownPrototype(NodeKey),

    #[error("{0} is already registered")]
    DuplicateNode(NodeKey),

    #[error("node {0} does not exist")]
    MissingNode(NodeId),

    #[error("node {node} has no port {port} (arity {arity})")]
    PortOutOfRange {
        node: NodeId,
        port: usize,
        arity: usize,
    },

    #[error("prototype {prototype} has no boundary port {port}")]
    NoSuchBoundary { prototype: NodeKey, port: usize },

    #[error("node {0} is a prototype boundary and cannot be removed")]
    BoundaryNode(NodeId),

    #[error("graph still had pending work after {0} steps")]
    StepLimitExceeded(u64),

    #[error("invalid literal: {0}")]
    InvalidLiteral(String),

    #[error("invalid save: {0}")]
    InvalidSave(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
