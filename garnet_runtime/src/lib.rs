//! Object model for the Garnet runtime.
//!
//! This crate provides:
//! - The closed value domain (primitives, native objects, foreign values)
//! - Interned symbols and the well-known core symbols
//! - The class arena: module/class records indexed by stable IDs, each with
//!   its own method table and generation counter
//! - Ancestor linearization (superclass chain plus included modules)
//! - Core class bootstrap (`BasicObject`, `Object`, `Kernel`, ...)
//! - The error taxonomy shared by every layer above
//!
//! Method dispatch itself (inline caches, lookup, `method_missing`) lives in
//! `garnet_vm`; this crate only exposes the raw tables it consumes.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod core_library;
pub mod error;
pub mod foreign;
pub mod host;
pub mod object;
pub mod symbol;
pub mod value;

// Re-export commonly used items
pub use core_library::CoreLibrary;
pub use error::{NoMethodReason, RubyError, RubyResult};
pub use foreign::{ForeignError, ForeignObject, ForeignRef};
pub use host::RuntimeHost;
pub use object::class::{ClassFlags, ClassId, ModuleRecord};
pub use object::instance::{ObjectRef, RObject};
pub use object::method::{Block, CallTarget, Invocation, MethodEntry, MethodFlags, Visibility};
pub use object::registry::ClassArena;
pub use symbol::{CoreSymbols, Symbol, core_symbols, intern};
pub use value::{Value, ValueKind};
