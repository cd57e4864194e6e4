//! The seam between method bodies and the dispatch engine.
//!
//! Method implementations live in this crate's tables but frequently need to
//! re-enter dispatch (`send`, `respond_to?`, the default `method_missing`).
//! The engine in `garnet_vm` implements [`RuntimeHost`] and hands itself to
//! every [`Invocation`](crate::object::method::Invocation).

use crate::core_library::CoreLibrary;
use crate::error::RubyResult;
use crate::object::class::ClassId;
use crate::object::method::{Block, MethodEntry};
use crate::object::registry::ClassArena;
use crate::symbol::Symbol;
use crate::value::Value;
use std::sync::Arc;

/// Services a running method body may call back into.
pub trait RuntimeHost {
    /// The class arena.
    fn classes(&self) -> &ClassArena;

    /// Built-in class IDs.
    fn core(&self) -> &CoreLibrary;

    /// Effective (singleton-aware) class of `value`.
    fn effective_class_of(&self, value: &Value) -> ClassId;

    /// Dispatch `name` on `receiver` without a call-site cache.
    ///
    /// `ignore_visibility` selects `send` semantics; otherwise `public_send`.
    fn send(
        &self,
        receiver: &Value,
        name: Symbol,
        args: &[Value],
        block: Option<&Block>,
        ignore_visibility: bool,
    ) -> RubyResult<Value>;

    /// Whether `receiver` has a callable method `name`, not consulting
    /// `respond_to_missing?`.
    fn responds_to(&self, receiver: &Value, name: Symbol, include_private: bool)
    -> RubyResult<bool>;

    /// Find `name` on `receiver` ignoring visibility.
    ///
    /// Undefined tombstones and absence both yield `None`.
    fn find_method(&self, receiver: &Value, name: Symbol) -> Option<Arc<MethodEntry>>;
}
