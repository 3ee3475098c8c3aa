//! # Pulsegraph
//!
//! A pulse-driven dataflow engine: a graph of nodes with numbered input and
//! output sockets, where values travel along edges and a node fires once every
//! one of its inputs holds a value.
//!
//! ## Features
//!
//! - **Batched stepping**: each [`Engine::step`] fires exactly the nodes that
//!   were ready when it began, so feedback loops advance one wave at a time
//! - **Dynamic values**: [`Signal`] is NaN, an integer, a real, a string or a
//!   shared mutable array, with numeric promotion and NaN propagation
//! - **Custom nodes**: [`Prototype`]s are reusable subgraphs placed by
//!   reference. Instances are cloned lazily on first use and pooled when idle,
//!   so recursive prototypes stay cheap
//! - **Native library**: math, comparison, type tests, console IO and array
//!   nodes, plus your own through [`NodeLogic`]
//! - **Save documents**: prototypes (de)serialize through serde
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pulsegraph::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let mut engine = Engine::new();
//!
//!     // A prototype that doubles its input.
//!     engine.register_prototype("User", "Double", 1, 1, |p| {
//!         let add = p.add("Math", "Add")?;
//!         p.connect(p.input(0)?.port(0), add.port(0))?;
//!         p.connect(p.input(0)?.port(0), add.port(1))?;
//!         p.connect(add.port(0), p.output(0)?.port(0))
//!     })?;
//!
//!     let double = engine.create_node("User", "Double")?;
//!     let print = engine.create_node("IO", "PrintLine")?;
//!     engine.connect(double.port(0), print.port(0))?;
//!
//!     engine.pulse_input(double.port(0), 21)?;
//!     engine.run_until_idle()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`Engine`]: the live graph, scheduler and registry
//! - [`native`]: the built-in node library
//! - [`prelude`]: commonly used types (import with `use pulsegraph::prelude::*`)

// ============================================================================
// Core Module
// ============================================================================

mod core;

// ============================================================================
// Public Re-exports - Granular Imports
// ============================================================================

// Values
pub use crate::core::signal::{ArrayHandle, Signal};

// Graph structure
pub use crate::core::node::{AsAny, FireContext, NodeId, NodeKey, NodeLogic, Socket};

// Execution
pub use crate::core::config::EngineConfig;
pub use crate::core::console::{BufferConsole, Console, StdConsole, Transcript};
pub use crate::core::engine::Engine;
pub use crate::core::error::{EngineError, Result};

// Custom nodes
pub use crate::core::prototype::builder::PrototypeBuilder;
pub use crate::core::prototype::{CanvasSize, InstanceId, Placement, Prototype};

// Persistence
pub use crate::core::persist::{
    EdgeSave, InnerNodesSave, LiteralSave, PlacedNodeSave, ProjectSave, PrototypeSave,
};

/// The built-in node library, grouped by category.
pub mod native {
    pub use crate::core::native::NativeLibrary;
    pub use crate::core::native::array::{ArrayNode, ArrayOp};
    pub use crate::core::native::compare::{
        CompareOp, Comparison, NEGATIVE, POSITIVE, TypeBranch, TypeTest,
    };
    pub use crate::core::native::flow::{Constant, Passthrough};
    pub use crate::core::native::io::{ConsoleNode, IoOp};
    pub use crate::core::native::math::{Arithmetic, ArithmeticOp};
}

// ============================================================================
// Prelude Module - Convenient Bulk Imports
// ============================================================================

/// The main prelude: everything needed to build and run graphs.
///
/// # Example
/// ```rust
/// use pulsegraph::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        BufferConsole,
        Console,
        Engine,
        EngineConfig,
        EngineError,
        FireContext,
        NodeId,
        NodeKey,
        NodeLogic,
        PrototypeBuilder,
        Result,
        Signal,
        Socket,
    };
}

// ============================================================================
// Re-export commonly used external types for convenience
// ============================================================================

pub use serde_json::Value as JsonValue;

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
