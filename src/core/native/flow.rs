use crate::core::node::{FireContext, NodeKey, NodeLogic};
use crate::core::signal::Signal;

/// Re-emits its single input unchanged. Also serves as the boundary
/// placeholder of every prototype.
#[derive(Clone, Debug, Default)]
pub struct Passthrough;

impl NodeLogic for Passthrough {
    fn key(&self) -> NodeKey {
        NodeKey::new("Core", "Socket")
    }

    fn inputs(&self) -> usize {
        1
    }

    fn outputs(&self) -> usize {
        1
    }

    fn fire(&mut self, inputs: &[Signal], ctx: &mut FireContext<'_>) {
        ctx.emit(0, inputs[0].clone());
    }

    fn clone_box(&self) -> Box<dyn NodeLogic> {
        Box::new(self.clone())
    }
}

/// Ignores the value it is pulsed with and emits a fixed signal.
#[derive(Debug)]
pub struct Constant {
    value: Signal,
}

impl Constant {
    pub fn new(value: impl Into<Signal>) -> Self {
        Constant {
            value: value.into(),
        }
    }

    pub fn value(&self) -> &Signal {
        &self.value
    }
}

// Clones never share an array with their source.
impl Clone for Constant {
    fn clone(&self) -> Self {
        Constant {
            value: self.value.detached(),
        }
    }
}

impl NodeLogic for Constant {
    fn key(&self) -> NodeKey {
        NodeKey::new("Constant", self.value.type_name())
    }

    fn inputs(&self) -> usize {
        1
    }

    fn outputs(&self) -> usize {
        1
    }

    fn fire(&mut self, _inputs: &[Signal], ctx: &mut FireContext<'_>) {
        ctx.emit(0, self.value.clone());
    }

    fn clone_box(&self) -> Box<dyn NodeLogic> {
        Box::new(self.clone())
    }

    fn label(&self) -> String {
        match &self.value {
            Signal::String(text) => format!("\"{text}\""),
            other => other.to_string(),
        }
    }
}
