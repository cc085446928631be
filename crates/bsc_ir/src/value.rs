use std::hash::{Hash, Hasher};

/// A 32-bit opaque register id (§3.6's `IRValue`). Registers are never
/// reused within an `IRBuilder`'s lifetime, so identity comparison is
/// exactly the invariant SSA needs: one definition per register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IrValue(pub u32);

/// §3.6's `IRInvalidValue` sentinel, treated as "no value / void" by every
/// consumer that accepts an optional operand (e.g. `Assert`'s message,
/// `Defined`'s target).
pub const IR_INVALID_VALUE: IrValue = IrValue(u32::MAX);

impl IrValue {
    pub fn is_invalid(self) -> bool {
        self == IR_INVALID_VALUE
    }
}

impl Default for IrValue {
    fn default() -> Self {
        IR_INVALID_VALUE
    }
}

/// A compile-time constant loadable via `LoadConst`/usable as a `JumpTable`
/// case key. Mirrors `bsc_ast::CaseValue` plus `None`, since constant
/// folding in the IR needs the literal `none` value that a case label never
/// does.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    None,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::None, Value::None) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Boolean(b) => b.hash(state),
            Value::String(s) => s.hash(state),
            Value::None => {}
        }
    }
}

impl From<bsc_ast::CaseValue> for Value {
    fn from(v: bsc_ast::CaseValue) -> Self {
        match v {
            bsc_ast::CaseValue::Integer(i) => Value::Integer(i),
            bsc_ast::CaseValue::Float(f) => Value::Float(f),
            bsc_ast::CaseValue::Boolean(b) => Value::Boolean(b),
            bsc_ast::CaseValue::String(s) => Value::String(s),
        }
    }
}
