//! Ruby-level and internal errors.
//!
//! `NoMethodError`, `TypeError`, `ArgumentError` and `NameError` surface to
//! Ruby code as catchable exceptions. [`RubyError::InternalInvariantViolation`]
//! is an unrecoverable runtime fault: it means the runtime itself is broken
//! (for example the base `method_missing` has been removed).

use crate::symbol::Symbol;
use crate::value::Value;
use thiserror::Error;

/// Result type for runtime operations.
pub type RubyResult<T> = Result<T, RubyError>;

// =============================================================================
// No Method Reason
// =============================================================================

/// Why a call ended in `NoMethodError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoMethodReason {
    /// No callable method with this name in the ancestor chain.
    Undefined,
    /// A private method was called with an explicit receiver.
    PrivateCalled,
    /// A protected method was called from outside its hierarchy.
    ProtectedCalled,
}

impl NoMethodReason {
    fn describe(&self, name: &Symbol) -> String {
        match self {
            NoMethodReason::Undefined => format!("undefined method '{}'", name),
            NoMethodReason::PrivateCalled => format!("private method '{}' called", name),
            NoMethodReason::ProtectedCalled => format!("protected method '{}' called", name),
        }
    }
}

// =============================================================================
// Ruby Error
// =============================================================================

/// Errors raised by dispatch and the object model.
#[derive(Debug, Clone, Error)]
pub enum RubyError {
    /// Ordinary lookup and `method_missing` both failed.
    #[error("{} for {receiver}", .reason.describe(.name))]
    NoMethodError {
        /// Human-readable description of the receiver.
        receiver: String,
        /// The attempted method name.
        name: Symbol,
        /// Arguments of the failed call.
        args: Vec<Value>,
        reason: NoMethodReason,
    },

    #[error("{0}")]
    TypeError(String),

    #[error("{0}")]
    ArgumentError(String),

    #[error("{message}")]
    NameError { name: Symbol, message: String },

    /// Raised by a safepoint action interrupting the current thread.
    #[error("interrupted: {0}")]
    Interrupt(String),

    #[error("internal invariant violated: {0}")]
    InternalInvariantViolation(String),
}

impl RubyError {
    /// Ruby exception class name for this error.
    pub fn class_name(&self) -> &'static str {
        match self {
            RubyError::NoMethodError { .. } => "NoMethodError",
            RubyError::TypeError(_) => "TypeError",
            RubyError::ArgumentError(_) => "ArgumentError",
            RubyError::NameError { .. } => "NameError",
            RubyError::Interrupt(_) => "Interrupt",
            RubyError::InternalInvariantViolation(_) => "InternalError",
        }
    }

    /// Whether this error must abort the operation instead of being rescued.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, RubyError::InternalInvariantViolation(_))
    }

    /// Build an `ArgumentError` for a wrong argument count.
    pub fn wrong_arity(given: usize, expected: &str) -> Self {
        RubyError::ArgumentError(format!(
            "wrong number of arguments (given {}, expected {})",
            given, expected
        ))
    }

    /// Build a `NameError` for a method missing from a module.
    pub fn undefined_method_in(name: Symbol, module_name: &str) -> Self {
        RubyError::NameError {
            name,
            message: format!("undefined method '{}' for class '{}'", name, module_name),
        }
    }
}
