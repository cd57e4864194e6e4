//! Method entries and call targets.

use crate::error::RubyResult;
use crate::host::RuntimeHost;
use crate::object::class::ClassId;
use crate::symbol::Symbol;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// Visibility
// =============================================================================

/// Method visibility.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public = 0,
    Protected = 1,
    Private = 2,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        })
    }
}

// =============================================================================
// Method Flags
// =============================================================================

bitflags::bitflags! {
    /// Flags describing a method entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MethodFlags: u8 {
        /// Tombstone left by `undef_method`: stops the ancestor walk.
        const UNDEFINED = 1 << 0;
        /// Platform stub; `respond_to?` reports false for it.
        const UNIMPLEMENTED = 1 << 1;
        /// Installed by the core library.
        const BUILTIN = 1 << 2;
    }
}

// =============================================================================
// Call Target
// =============================================================================

/// A block passed to a call.
pub type Block = Arc<dyn Fn(&[Value]) -> RubyResult<Value> + Send + Sync>;

/// Everything a method body sees when invoked.
pub struct Invocation<'a> {
    pub host: &'a dyn RuntimeHost,
    pub method: &'a MethodEntry,
    pub receiver: &'a Value,
    pub args: &'a [Value],
    pub block: Option<&'a Block>,
}

/// Native method body.
pub type MethodFn = dyn Fn(&Invocation<'_>) -> RubyResult<Value> + Send + Sync;

static NEXT_TARGET_ID: AtomicU64 = AtomicU64::new(1);

/// Invocable body of a method.
///
/// Aliases and visibility changes copy the entry but share the target, so
/// `id` identifies the implementation independently of the name it is
/// reached by.
#[derive(Clone)]
pub struct CallTarget {
    id: u64,
    body: Arc<MethodFn>,
}

impl CallTarget {
    /// Wrap a native function as a call target.
    pub fn native<F>(body: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> RubyResult<Value> + Send + Sync + 'static,
    {
        Self {
            id: NEXT_TARGET_ID.fetch_add(1, Ordering::Relaxed),
            body: Arc::new(body),
        }
    }

    /// A target that ignores its arguments and returns `value`.
    pub fn constant(value: Value) -> Self {
        Self::native(move |_| Ok(value.clone()))
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn call(&self, invocation: &Invocation<'_>) -> RubyResult<Value> {
        (self.body)(invocation)
    }
}

impl fmt::Debug for CallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallTarget#{}", self.id)
    }
}

// =============================================================================
// Method Entry
// =============================================================================

/// One entry in a module's method table.
///
/// Entries are immutable once published; redefinition replaces the `Arc`.
#[derive(Debug, Clone)]
pub struct MethodEntry {
    name: Symbol,
    owner: ClassId,
    visibility: Visibility,
    target: Option<CallTarget>,
    flags: MethodFlags,
    generation: u64,
}

impl MethodEntry {
    /// Create an entry for a callable method.
    pub fn new(
        name: Symbol,
        owner: ClassId,
        visibility: Visibility,
        target: CallTarget,
        flags: MethodFlags,
        generation: u64,
    ) -> Self {
        Self {
            name,
            owner,
            visibility,
            target: Some(target),
            flags: flags - MethodFlags::UNDEFINED,
            generation,
        }
    }

    /// Create an `undef_method` tombstone.
    pub fn undefined(name: Symbol, owner: ClassId, generation: u64) -> Self {
        Self {
            name,
            owner,
            visibility: Visibility::Public,
            target: None,
            flags: MethodFlags::UNDEFINED,
            generation,
        }
    }

    /// Copy of this entry with a different visibility, owned by `owner`.
    pub fn with_visibility(&self, owner: ClassId, visibility: Visibility, generation: u64) -> Self {
        Self {
            owner,
            visibility,
            generation,
            ..self.clone()
        }
    }

    /// Copy of this entry under another name, owned by `owner`.
    pub fn aliased(&self, name: Symbol, owner: ClassId, generation: u64) -> Self {
        Self {
            name,
            owner,
            generation,
            ..self.clone()
        }
    }

    #[inline]
    pub fn name(&self) -> Symbol {
        self.name
    }

    #[inline]
    pub fn owner(&self) -> ClassId {
        self.owner
    }

    #[inline]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[inline]
    pub fn flags(&self) -> MethodFlags {
        self.flags
    }

    /// Global generation at which this entry was published.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn target(&self) -> Option<&CallTarget> {
        self.target.as_ref()
    }

    #[inline]
    pub fn is_undefined(&self) -> bool {
        self.flags.contains(MethodFlags::UNDEFINED)
    }

    #[inline]
    pub fn is_unimplemented(&self) -> bool {
        self.flags.contains(MethodFlags::UNIMPLEMENTED)
    }

    /// Invoke this method.
    ///
    /// Tombstones are never returned by lookup as callable, so reaching one
    /// here is a runtime bug.
    pub fn invoke(
        &self,
        host: &dyn RuntimeHost,
        receiver: &Value,
        args: &[Value],
        block: Option<&Block>,
    ) -> RubyResult<Value> {
        let target = self.target.as_ref().ok_or_else(|| {
            crate::error::RubyError::InternalInvariantViolation(format!(
                "attempted to invoke undefined method '{}'",
                self.name
            ))
        })?;
        target.call(&Invocation {
            host,
            method: self,
            receiver,
            args,
            block,
        })
    }
}
