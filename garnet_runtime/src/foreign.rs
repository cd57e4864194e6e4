//! Interop boundary for values owned by an embedding host.
//!
//! Foreign values never take part in class-based method dispatch. A call on
//! one is handed to [`ForeignObject::invoke`]; whatever the host reports back
//! as a [`ForeignError`] is translated by the dispatcher into a Ruby-level
//! `TypeError`.

use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Shared handle to a foreign value.
pub type ForeignRef = Arc<dyn ForeignObject>;

/// Errors reported by a foreign host.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForeignError {
    /// The host value has no member with this name.
    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),

    /// The member exists but cannot be invoked.
    #[error("member '{member}' of {type_name} is not invocable")]
    NotInvocable { type_name: String, member: String },

    /// The member was invoked with the wrong number of arguments.
    #[error("arity mismatch: expected {expected}, got {actual}")]
    Arity { expected: usize, actual: usize },

    /// An argument could not be converted to a host value.
    #[error("unsupported argument type: {0}")]
    UnsupportedType(String),

    /// Any other host-side failure.
    #[error("{0}")]
    Host(String),
}

/// A value living on the other side of the interop boundary.
pub trait ForeignObject: Send + Sync + fmt::Debug {
    /// Host-side type name, used in diagnostics.
    fn type_name(&self) -> &str;

    /// Whether the host value exposes a member called `name`.
    fn has_member(&self, name: &str) -> bool;

    /// Invoke the member `name` with `args`.
    fn invoke(&self, name: &str, args: &[Value]) -> Result<Value, ForeignError>;
}
