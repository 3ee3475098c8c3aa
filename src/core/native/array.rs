//! Nodes operating on [`Signal::Array`].
//!
//! Mutating nodes change the array in place and re-emit the same handle.
//! A wrong-typed input, an out-of-range index or an empty array makes the
//! node emit nothing at all.

use crate::core::native::compare::{NEGATIVE, POSITIVE};
use crate::core::node::{FireContext, NodeKey, NodeLogic};
use crate::core::signal::Signal;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrayOp {
    New,
    Length,
    Index,
    Insert,
    Push,
    Pop,
    Unshift,
    Shift,
    Contains,
    IndexOf,
    Join,
}

impl ArrayOp {
    pub const ALL: [ArrayOp; 11] = [
        ArrayOp::New,
        ArrayOp::Length,
        ArrayOp::Index,
        ArrayOp::Insert,
        ArrayOp::Push,
        ArrayOp::Pop,
        ArrayOp::Unshift,
        ArrayOp::Shift,
        ArrayOp::Contains,
        ArrayOp::IndexOf,
        ArrayOp::Join,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ArrayOp::New => "New",
            ArrayOp::Length => "Length",
            ArrayOp::Index => "Index",
            ArrayOp::Insert => "Insert",
            ArrayOp::Push => "Push",
            ArrayOp::Pop => "Pop",
            ArrayOp::Unshift => "Unshift",
            ArrayOp::Shift => "Shift",
            ArrayOp::Contains => "Contains",
            ArrayOp::IndexOf => "IndexOf",
            ArrayOp::Join => "Join",
        }
    }

    /// `(inputs, outputs)`.
    pub fn arity(self) -> (usize, usize) {
        match self {
            ArrayOp::New | ArrayOp::Length => (1, 1),
            ArrayOp::Pop | ArrayOp::Shift => (1, 2),
            ArrayOp::Insert => (3, 1),
            ArrayOp::Contains => (2, 2),
            ArrayOp::Index | ArrayOp::Push | ArrayOp::Unshift | ArrayOp::IndexOf | ArrayOp::Join => {
                (2, 1)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct ArrayNode {
    op: ArrayOp,
}

impl ArrayNode {
    pub fn new(op: ArrayOp) -> Self {
        ArrayNode { op }
    }
}

fn index_arg(signal: &Signal) -> Option<usize> {
    usize::try_from(signal.as_int()?).ok()
}

impl NodeLogic for ArrayNode {
    fn key(&self) -> NodeKey {
        NodeKey::new("Array", self.op.name())
    }

    fn inputs(&self) -> usize {
        self.op.arity().0
    }

    fn outputs(&self) -> usize {
        self.op.arity().1
    }

    fn fire(&mut self, inputs: &[Signal], ctx: &mut FireContext<'_>) {
        if self.op == ArrayOp::New {
            ctx.emit(0, Signal::new_array());
            return;
        }
        let Some(array) = inputs[0].as_array() else {
            return;
        };
        match self.op {
            ArrayOp::New => {}
            ArrayOp::Length => {
                let len = i64::try_from(array.len()).unwrap_or(i64::MAX);
                ctx.emit(0, Signal::Int(len));
            }
            ArrayOp::Index => {
                if let Some(item) = index_arg(&inputs[1]).and_then(|i| array.get(i)) {
                    ctx.emit(0, item);
                }
            }
            ArrayOp::Insert => {
                if let Some(index) = index_arg(&inputs[1]) {
                    if array.insert(index, inputs[2].clone()) {
                        ctx.emit(0, inputs[0].clone());
                    }
                }
            }
            ArrayOp::Push => {
                array.push(inputs[1].clone());
                ctx.emit(0, inputs[0].clone());
            }
            ArrayOp::Unshift => {
                array.unshift(inputs[1].clone());
                ctx.emit(0, inputs[0].clone());
            }
            ArrayOp::Pop => {
                if let Some(last) = array.pop() {
                    ctx.emit(0, inputs[0].clone());
                    ctx.emit(1, last);
                }
            }
            ArrayOp::Shift => {
                if let Some(first) = array.shift() {
                    ctx.emit(0, inputs[0].clone());
                    ctx.emit(1, first);
                }
            }
            ArrayOp::Contains => {
                let branch = if array.contains(&inputs[1]) {
                    POSITIVE
                } else {
                    NEGATIVE
                };
                ctx.emit(branch, inputs[1].clone());
            }
            ArrayOp::IndexOf => {
                if let Some(index) = array.index_of(&inputs[1]) {
                    let index = i64::try_from(index).unwrap_or(i64::MAX);
                    ctx.emit(0, Signal::Int(index));
                }
            }
            ArrayOp::Join => {
                let separator = inputs[1].to_string();
                ctx.emit(0, Signal::String(array.join(&separator)));
            }
        }
    }

    fn clone_box(&self) -> Box<dyn NodeLogic> {
        Box::new(self.clone())
    }
}
