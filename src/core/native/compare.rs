use crate::core::node::{FireContext, NodeKey, NodeLogic};
use crate::core::signal::Signal;

/// Output taken when a predicate holds; the other output is 1.
pub const POSITIVE: usize = 0;
pub const NEGATIVE: usize = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    EqualTo,
    NotEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
}

impl CompareOp {
    pub const ALL: [CompareOp; 6] = [
        CompareOp::EqualTo,
        CompareOp::NotEqualTo,
        CompareOp::GreaterThan,
        CompareOp::GreaterThanOrEqualTo,
        CompareOp::LessThan,
        CompareOp::LessThanOrEqualTo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CompareOp::EqualTo => "EqualTo",
            CompareOp::NotEqualTo => "NotEqualTo",
            CompareOp::GreaterThan => "GreaterThan",
            CompareOp::GreaterThanOrEqualTo => "GreaterThanOrEqualTo",
            CompareOp::LessThan => "LessThan",
            CompareOp::LessThanOrEqualTo => "LessThanOrEqualTo",
        }
    }

    // The "or equal" forms negate the strict opposite, so incomparable
    // operands satisfy them.
    pub fn test(self, lhs: &Signal, rhs: &Signal) -> bool {
        match self {
            CompareOp::EqualTo => lhs.equal_to(rhs),
            CompareOp::NotEqualTo => !lhs.equal_to(rhs),
            CompareOp::GreaterThan => lhs.greater_than(rhs),
            CompareOp::GreaterThanOrEqualTo => !lhs.less_than(rhs),
            CompareOp::LessThan => lhs.less_than(rhs),
            CompareOp::LessThanOrEqualTo => !lhs.greater_than(rhs),
        }
    }
}

/// 2-in/2-out branch: emits the first input on [`POSITIVE`] when the test
/// holds, otherwise on [`NEGATIVE`].
#[derive(Clone, Debug)]
pub struct Comparison {
    op: CompareOp,
}

impl Comparison {
    pub fn new(op: CompareOp) -> Self {
        Comparison { op }
    }
}

impl NodeLogic for Comparison {
    fn key(&self) -> NodeKey {
        NodeKey::new("Compare", self.op.name())
    }

    fn inputs(&self) -> usize {
        2
    }

    fn outputs(&self) -> usize {
        2
    }

    fn fire(&mut self, inputs: &[Signal], ctx: &mut FireContext<'_>) {
        let branch = if self.op.test(&inputs[0], &inputs[1]) {
            POSITIVE
        } else {
            NEGATIVE
        };
        ctx.emit(branch, inputs[0].clone());
    }

    fn clone_box(&self) -> Box<dyn NodeLogic> {
        Box::new(self.clone())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeTest {
    IsInt,
    IsReal,
    IsString,
    IsArray,
    IsNaN,
}

impl TypeTest {
    pub const ALL: [TypeTest; 5] = [
        TypeTest::IsInt,
        TypeTest::IsReal,
        TypeTest::IsString,
        TypeTest::IsArray,
        TypeTest::IsNaN,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TypeTest::IsInt => "IsInt",
            TypeTest::IsReal => "IsReal",
            TypeTest::IsString => "IsString",
            TypeTest::IsArray => "IsArray",
            TypeTest::IsNaN => "IsNaN",
        }
    }

    pub fn test(self, value: &Signal) -> bool {
        matches!(
            (self, value),
            (TypeTest::IsInt, Signal::Int(_))
                | (TypeTest::IsReal, Signal::Real(_))
                | (TypeTest::IsString, Signal::String(_))
                | (TypeTest::IsArray, Signal::Array(_))
                | (TypeTest::IsNaN, Signal::NaN)
        )
    }
}

/// 1-in/2-out branch on the variant of the sole input.
#[derive(Clone, Debug)]
pub struct TypeBranch {
    test: TypeTest,
}

impl TypeBranch {
    pub fn new(test: TypeTest) -> Self {
        TypeBranch { test }
    }
}

impl NodeLogic for TypeBranch {
    fn key(&self) -> NodeKey {
        NodeKey::new("Type", self.test.name())
    }

    fn inputs(&self) -> usize {
        1
    }

    fn outputs(&self) -> usize {
        2
    }

    fn fire(&mut self, inputs: &[Signal], ctx: &mut FireContext<'_>) {
        let branch = if self.test.test(&inputs[0]) {
            POSITIVE
        } else {
            NEGATIVE
        };
        ctx.emit(branch, inputs[0].clone());
    }

    fn clone_box(&self) -> Box<dyn NodeLogic> {
        Box::new(self.clone())
    }
}
