use crate::core::node::{FireContext, NodeKey, NodeLogic};
use crate::core::signal::Signal;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl ArithmeticOp {
    pub const ALL: [ArithmeticOp; 5] = [
        ArithmeticOp::Add,
        ArithmeticOp::Subtract,
        ArithmeticOp::Multiply,
        ArithmeticOp::Divide,
        ArithmeticOp::Modulo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "Add",
            ArithmeticOp::Subtract => "Subtract",
            ArithmeticOp::Multiply => "Multiply",
            ArithmeticOp::Divide => "Divide",
            ArithmeticOp::Modulo => "Modulo",
        }
    }

    pub fn apply(self, lhs: &Signal, rhs: &Signal) -> Signal {
        match self {
            ArithmeticOp::Add => lhs.add(rhs),
            ArithmeticOp::Subtract => lhs.subtract(rhs),
            ArithmeticOp::Multiply => lhs.multiply(rhs),
            ArithmeticOp::Divide => lhs.divide(rhs),
            ArithmeticOp::Modulo => lhs.modulo(rhs),
        }
    }
}

/// 2-in/1-out: emits `inputs[0] <op> inputs[1]`.
#[derive(Clone, Debug)]
pub struct Arithmetic {
    op: ArithmeticOp,
}

impl Arithmetic {
    pub fn new(op: ArithmeticOp) -> Self {
        Arithmetic { op }
    }
}

impl NodeLogic for Arithmetic {
    fn key(&self) -> NodeKey {
        NodeKey::new("Math", self.op.name())
    }

    fn inputs(&self) -> usize {
        2
    }

    fn outputs(&self) -> usize {
        1
    }

    fn fire(&mut self, inputs: &[Signal], ctx: &mut FireContext<'_>) {
        ctx.emit(0, self.op.apply(&inputs[0], &inputs[1]));
    }

    fn clone_box(&self) -> Box<dyn NodeLogic> {
        Box::new(self.clone())
    }
}
