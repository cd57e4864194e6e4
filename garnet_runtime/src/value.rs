//! Runtime values.
//!
//! The value domain is closed: every value is a primitive, a native object
//! (an instance or a module/class), or a foreign value. Dispatch branches on
//! [`ValueKind`] instead of comparing classes against a sentinel.

use crate::foreign::ForeignRef;
use crate::object::class::ClassId;
use crate::object::instance::ObjectRef;
use crate::symbol::Symbol;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Value Kind
// =============================================================================

/// Coarse classification of a value for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Immediate values with a fixed built-in class.
    Primitive,
    /// Heap objects and modules owned by this runtime.
    NativeObject,
    /// Values owned by an embedding host.
    Foreign,
}

// =============================================================================
// Value
// =============================================================================

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Symbol(Symbol),
    String(Arc<str>),
    /// A module or class used as a receiver.
    Module(ClassId),
    Object(ObjectRef),
    Foreign(ForeignRef),
}

impl Value {
    /// Build a string value.
    #[inline]
    pub fn string(s: &str) -> Self {
        Value::String(Arc::from(s))
    }

    /// Classify this value.
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Nil
            | Value::Bool(_)
            | Value::Integer(_)
            | Value::Float(_)
            | Value::Symbol(_)
            | Value::String(_) => ValueKind::Primitive,
            Value::Module(_) | Value::Object(_) => ValueKind::NativeObject,
            Value::Foreign(_) => ValueKind::Foreign,
        }
    }

    /// Check if this value crossed the interop boundary.
    #[inline]
    pub fn is_foreign(&self) -> bool {
        matches!(self, Value::Foreign(_))
    }

    /// Ruby truthiness: everything except `nil` and `false`.
    #[inline]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    pub fn as_symbol(&self) -> Option<Symbol> {
        match self {
            Value::Symbol(s) => Some(*s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    #[inline]
    pub fn as_module(&self) -> Option<ClassId> {
        match self {
            Value::Module(id) => Some(*id),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Identity comparison (`equal?`).
    ///
    /// Immediates compare by value; heap and foreign values by pointer.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Foreign(a), Value::Foreign(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Value::String(a), Value::String(b)) => Arc::ptr_eq(a, b),
            _ => self == other,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Module(a), Value::Module(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Foreign(a), Value::Foreign(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Symbol(s) => write!(f, ":{}", s),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Module(id) => write!(f, "#<Module {}>", id.raw()),
            Value::Object(o) => write!(f, "#<Object class={} at {:p}>", o.class().raw(), Arc::as_ptr(o)),
            Value::Foreign(x) => write!(f, "#<Foreign {}>", x.type_name()),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Symbol> for Value {
    fn from(s: Symbol) -> Self {
        Value::Symbol(s)
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}
