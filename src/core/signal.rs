//! The value model carried by pulses.
//!
//! A [`Signal`] is one of a closed set of variants. Every binary operation is
//! total: incompatible operands produce [`Signal::NaN`] (or `false` for the
//! comparisons) instead of failing. `NaN` doubles as the fallback for every
//! undefined operation, except that adding a string to it concatenates.
//!
//! Arrays are the one variant with identity: an [`ArrayHandle`] is a shared
//! pointer to a single mutable sequence, so every clone of an array signal
//! observes every mutation made through any other clone.

use crate::core::error::EngineError;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// A typed value flowing through the graph.
#[derive(Clone, Debug, Default)]
pub enum Signal {
    /// "Not a valid/typed value"; the result of any undefined operation.
    #[default]
    NaN,
    Int(i64),
    Real(f64),
    String(String),
    Array(ArrayHandle),
}

/// Operands after numeric promotion.
enum Numeric {
    Ints(i64, i64),
    Reals(f64, f64),
}

impl Signal {
    /// Creates a fresh, empty array signal with its own identity.
    pub fn new_array() -> Signal {
        Signal::Array(ArrayHandle::new())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Signal::NaN => "NaN",
            Signal::Int(_) => "Int",
            Signal::Real(_) => "Real",
            Signal::String(_) => "String",
            Signal::Array(_) => "Array",
        }
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, Signal::NaN)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Signal::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Signal::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Signal::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayHandle> {
        match self {
            Signal::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Parses the literal syntax used when placing a constant: a double-quoted
    /// string, an integer, a finite real, or `NaN`.
    pub fn parse_literal(text: &str) -> Option<Signal> {
        let text = text.trim();
        if is_quoted(text) {
            return Some(Signal::String(text[1..text.len() - 1].to_string()));
        }
        if text == "NaN" {
            return Some(Signal::NaN);
        }
        if let Ok(v) = text.parse::<i64>() {
            return Some(Signal::Int(v));
        }
        text.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Signal::Real)
    }

    /// A copy with no array identity shared with `self`.
    ///
    /// Aliasing *inside* the value is preserved: an array reachable twice is
    /// copied once and both positions point at the same copy.
    pub fn detached(&self) -> Signal {
        let mut copies = HashMap::new();
        self.detach_with(&mut copies)
    }

    fn detach_with(&self, copies: &mut HashMap<usize, ArrayHandle>) -> Signal {
        match self {
            Signal::Array(array) => {
                if let Some(copy) = copies.get(&array.identity()) {
                    return Signal::Array(copy.clone());
                }
                let copy = ArrayHandle::new();
                copies.insert(array.identity(), copy.clone());
                let items: Vec<Signal> = array
                    .to_vec()
                    .iter()
                    .map(|item| item.detach_with(copies))
                    .collect();
                copy.0.borrow_mut().extend(items);
                Signal::Array(copy)
            }
            other => other.clone(),
        }
    }

    fn promote(&self, other: &Signal) -> Option<Numeric> {
        match (self, other) {
            (Signal::Int(a), Signal::Int(b)) => Some(Numeric::Ints(*a, *b)),
            (Signal::Int(a), Signal::Real(b)) => Some(Numeric::Reals(*a as f64, *b)),
            (Signal::Real(a), Signal::Int(b)) => Some(Numeric::Reals(*a, *b as f64)),
            (Signal::Real(a), Signal::Real(b)) => Some(Numeric::Reals(*a, *b)),
            _ => None,
        }
    }

    // Integer overflow and integer division by zero yield NaN; reals follow IEEE 754.
    fn arithmetic(
        &self,
        other: &Signal,
        int: fn(i64, i64) -> Option<i64>,
        real: fn(f64, f64) -> f64,
    ) -> Signal {
        match self.promote(other) {
            Some(Numeric::Ints(a, b)) => int(a, b).map_or(Signal::NaN, Signal::Int),
            Some(Numeric::Reals(a, b)) => Signal::Real(real(a, b)),
            None => Signal::NaN,
        }
    }

    pub fn add(&self, other: &Signal) -> Signal {
        match (self, other) {
            (Signal::String(text), rhs) => Signal::String(format!("{text}{rhs}")),
            (Signal::NaN, Signal::String(text)) => Signal::String(format!("{self}{text}")),
            _ => self.arithmetic(other, i64::checked_add, |a, b| a + b),
        }
    }

    pub fn subtract(&self, other: &Signal) -> Signal {
        self.arithmetic(other, i64::checked_sub, |a, b| a - b)
    }

    pub fn multiply(&self, other: &Signal) -> Signal {
        self.arithmetic(other, i64::checked_mul, |a, b| a * b)
    }

    pub fn divide(&self, other: &Signal) -> Signal {
        self.arithmetic(other, i64::checked_div, |a, b| a / b)
    }

    pub fn modulo(&self, other: &Signal) -> Signal {
        self.arithmetic(other, i64::checked_rem, |a, b| a % b)
    }

    /// Structural equality within a variant, numeric across Int/Real, and
    /// identity for arrays.
    pub fn equal_to(&self, other: &Signal) -> bool {
        match (self, other) {
            (Signal::NaN, Signal::NaN) => true,
            (Signal::String(a), Signal::String(b)) => a == b,
            (Signal::Array(a), Signal::Array(b)) => a.same(b),
            _ => match self.promote(other) {
                Some(Numeric::Ints(a, b)) => a == b,
                Some(Numeric::Reals(a, b)) => a == b,
                None => false,
            },
        }
    }

    pub fn greater_than(&self, other: &Signal) -> bool {
        match self.promote(other) {
            Some(Numeric::Ints(a, b)) => a > b,
            Some(Numeric::Reals(a, b)) => a > b,
            None => false,
        }
    }

    pub fn less_than(&self, other: &Signal) -> bool {
        match self.promote(other) {
            Some(Numeric::Ints(a, b)) => a < b,
            Some(Numeric::Reals(a, b)) => a < b,
            None => false,
        }
    }
}

fn is_quoted(text: &str) -> bool {
    if text.len() < 2 || !text.starts_with('"') || !text.ends_with('"') {
        return false;
    }
    let mut chars = text[1..text.len() - 1].chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if chars.next().is_none() {
                    return false;
                }
            }
            '"' => return false,
            _ => {}
        }
    }
    true
}

/// Variant-strict equality: `Int(1) != Real(1.0)` here, unlike [`Signal::equal_to`].
impl PartialEq for Signal {
    fn eq(&self, other: &Signal) -> bool {
        match (self, other) {
            (Signal::NaN, Signal::NaN) => true,
            (Signal::Int(a), Signal::Int(b)) => a == b,
            (Signal::Real(a), Signal::Real(b)) => a == b,
            (Signal::String(a), Signal::String(b)) => a == b,
            (Signal::Array(a), Signal::Array(b)) => a.same(b),
            _ => false,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::NaN => write!(f, "NaN"),
            Signal::Int(v) => write!(f, "{v}"),
            Signal::Real(v) => write!(f, "{v}"),
            Signal::String(v) => write!(f, "{v}"),
            Signal::Array(v) => write!(f, "[Array {:x}]", v.identity()),
        }
    }
}

impl FromStr for Signal {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Signal::parse_literal(s).ok_or_else(|| EngineError::InvalidLiteral(s.to_string()))
    }
}

impl From<i64> for Signal {
    fn from(v: i64) -> Self {
        Signal::Int(v)
    }
}

// Lets untyped integer literals through `impl Into<Signal>`.
impl From<i32> for Signal {
    fn from(v: i32) -> Self {
        Signal::Int(i64::from(v))
    }
}

impl From<f64> for Signal {
    fn from(v: f64) -> Self {
        Signal::Real(v)
    }
}

impl From<&str> for Signal {
    fn from(v: &str) -> Self {
        Signal::String(v.to_string())
    }
}

impl From<String> for Signal {
    fn from(v: String) -> Self {
        Signal::String(v)
    }
}

impl From<Vec<Signal>> for Signal {
    fn from(v: Vec<Signal>) -> Self {
        Signal::Array(ArrayHandle::from_vec(v))
    }
}

/// A shared, mutable, ordered sequence of signals.
///
/// Cloning the handle never copies the sequence.
#[derive(Clone, Default)]
pub struct ArrayHandle(Rc<RefCell<Vec<Signal>>>);

impl ArrayHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(items: Vec<Signal>) -> Self {
        ArrayHandle(Rc::new(RefCell::new(items)))
    }

    /// Address of the backing sequence; stable for the handle's lifetime.
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn same(&self, other: &ArrayHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Signal> {
        self.0.borrow().get(index).cloned()
    }

    pub fn to_vec(&self) -> Vec<Signal> {
        self.0.borrow().clone()
    }

    pub fn push(&self, value: Signal) {
        self.0.borrow_mut().push(value);
    }

    pub fn unshift(&self, value: Signal) {
        self.0.borrow_mut().insert(0, value);
    }

    /// Inserts at `index` (`0..=len`); returns false and leaves the array
    /// untouched when out of range.
    pub fn insert(&self, index: usize, value: Signal) -> bool {
        let mut items = self.0.borrow_mut();
        if index > items.len() {
            return false;
        }
        items.insert(index, value);
        true
    }

    pub fn pop(&self) -> Option<Signal> {
        self.0.borrow_mut().pop()
    }

    pub fn shift(&self) -> Option<Signal> {
        let mut items = self.0.borrow_mut();
        if items.is_empty() {
            None
        } else {
            Some(items.remove(0))
        }
    }

    /// Position of the first element `equal_to` the needle.
    pub fn index_of(&self, needle: &Signal) -> Option<usize> {
        self.to_vec().iter().position(|item| item.equal_to(needle))
    }

    pub fn contains(&self, needle: &Signal) -> bool {
        self.index_of(needle).is_some()
    }

    pub fn join(&self, separator: &str) -> String {
        self.to_vec()
            .iter()
            .map(Signal::to_string)
            .collect::<Vec<_>>()
            .join(separator)
    }
}

// Elements are not printed: an array may contain itself.
impl fmt::Debug for ArrayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayHandle")
            .field("identity", &format_args!("{:x}", self.identity()))
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promotion_table() {
        assert_eq!(Signal::Int(3).add(&Signal::Int(4)), Signal::Int(7));
        assert_eq!(Signal::Int(3).add(&Signal::Real(0.5)), Signal::Real(3.5));
        assert_eq!(Signal::Real(0.5).add(&Signal::Int(3)), Signal::Real(3.5));
        assert_eq!(Signal::Int(7).divide(&Signal::Int(2)), Signal::Int(3));
        assert_eq!(Signal::Int(7).modulo(&Signal::Int(4)), Signal::Int(3));
        assert_eq!(Signal::Real(1.5).multiply(&Signal::Real(2.0)), Signal::Real(3.0));
        assert_eq!(Signal::Int(10).subtract(&Signal::Real(0.5)), Signal::Real(9.5));
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(Signal::from("a").add(&Signal::Int(1)), Signal::from("a1"));
        assert_eq!(Signal::from("x=").add(&Signal::Real(2.5)), Signal::from("x=2.5"));
        assert_eq!(Signal::NaN.add(&Signal::from("!")), Signal::from("NaN!"));
        assert_eq!(Signal::from("a").add(&Signal::NaN), Signal::from("aNaN"));
    }

    #[test]
    fn test_incompatible_operands_yield_nan() {
        assert!(Signal::NaN.add(&Signal::Int(1)).is_nan());
        assert!(Signal::NaN.add(&Signal::NaN).is_nan());
        assert!(Signal::Int(1).add(&Signal::from("a")).is_nan());
        assert!(Signal::from("a").subtract(&Signal::Int(1)).is_nan());
        assert!(Signal::new_array().multiply(&Signal::Int(2)).is_nan());
        assert!(!Signal::from("a").less_than(&Signal::from("b")));
        assert!(!Signal::NaN.greater_than(&Signal::Int(0)));
    }

    #[test]
    fn test_integer_faults_yield_nan() {
        assert!(Signal::Int(1).divide(&Signal::Int(0)).is_nan());
        assert!(Signal::Int(1).modulo(&Signal::Int(0)).is_nan());
        assert!(Signal::Int(i64::MAX).add(&Signal::Int(1)).is_nan());
        assert!(Signal::Int(i64::MIN).divide(&Signal::Int(-1)).is_nan());
        assert_eq!(Signal::Real(1.0).divide(&Signal::Int(0)), Signal::Real(f64::INFINITY));
    }

    #[test]
    fn test_equality() {
        assert!(Signal::NaN.equal_to(&Signal::NaN));
        assert!(Signal::Int(2).equal_to(&Signal::Real(2.0)));
        assert!(!Signal::Int(2).equal_to(&Signal::from("2")));
        assert!(Signal::from("hi").equal_to(&Signal::from("hi")));
        assert_ne!(Signal::Int(2), Signal::Real(2.0));

        let a = Signal::new_array();
        let b = Signal::new_array();
        assert!(a.equal_to(&a.clone()));
        assert!(!a.equal_to(&b));
    }

    #[test]
    fn test_array_aliasing() {
        let array = ArrayHandle::new();
        let alias = array.clone();
        array.push(Signal::Int(5));
        assert_eq!(alias.get(0), Some(Signal::Int(5)));

        let detached = Signal::Array(array.clone()).detached();
        array.push(Signal::Int(6));
        assert_eq!(detached.as_array().map(ArrayHandle::len), Some(1));
    }

    #[test]
    fn test_detached_keeps_inner_aliasing() {
        let outer = ArrayHandle::new();
        outer.push(Signal::Array(outer.clone()));
        let copy = Signal::Array(outer.clone()).detached();
        let copy = copy.as_array().cloned().unwrap();
        assert!(!copy.same(&outer));
        assert!(copy.get(0).unwrap().as_array().unwrap().same(&copy));
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(Signal::parse_literal("\"hi\""), Some(Signal::from("hi")));
        assert_eq!(Signal::parse_literal("\"a\\\"b\""), Some(Signal::from("a\\\"b")));
        assert_eq!(Signal::parse_literal("42"), Some(Signal::Int(42)));
        assert_eq!(Signal::parse_literal("-1.25"), Some(Signal::Real(-1.25)));
        assert_eq!(Signal::parse_literal("NaN"), Some(Signal::NaN));
        assert_eq!(Signal::parse_literal("\"open"), None);
        assert!("nope".parse::<Signal>().is_err());
    }

    #[test]
    fn test_parse_literal_rejects_non_finite_reals() {
        for text in ["inf", "-inf", "infinity", "nan", "1e400"] {
            assert_eq!(Signal::parse_literal(text), None, "{text}");
        }
        assert!("inf".parse::<Signal>().is_err());
        assert_eq!(Signal::parse_literal("1e3"), Some(Signal::Real(1000.0)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Signal::Int(-3).to_string(), "-3");
        assert_eq!(Signal::Real(1.0).to_string(), "1");
        assert_eq!(Signal::NaN.to_string(), "NaN");
        let array = Signal::from(vec![Signal::Int(1), Signal::from("b")]);
        assert!(array.to_string().starts_with("[Array "));
        assert_eq!(array.as_array().unwrap().join(", "), "1, b");
    }
}
