//! Call-site cache state machine.
//!
//! ```text
//!                    ┌─────────────┐
//!                    │    Empty    │
//!                    └──────┬──────┘
//!                           │ first successful lookup
//!                    ╔══════▼══════╗
//!                    ║ Monomorphic ║
//!                    ╚══════╤══════╝
//!                           │ miss on a new class
//!                    ╔══════▼══════╗
//!                    ║ Polymorphic ║  (up to N entries)
//!                    ╚══════╤══════╝
//!                           │ entry N + 1
//!                    ┌──────▼──────┐
//!                    │ Megamorphic │  (terminal, no entries)
//!                    └─────────────┘
//! ```
//!
//! States are values. Transitions are functions from the old state to a new
//! one; the owning call site swaps the result in under its write lock, so a
//! reader never observes a half-built chain.

use garnet_runtime::{ClassId, MethodEntry, Symbol};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Entries
// =============================================================================

/// What an entry tests: the receiver's effective class and the method name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheGuard {
    pub class: ClassId,
    pub name: Symbol,
}

impl CacheGuard {
    #[inline]
    pub const fn new(class: ClassId, name: Symbol) -> Self {
        Self { class, name }
    }
}

/// What a guard hit resolves to.
#[derive(Debug, Clone)]
pub enum CachedTarget {
    /// A callable method.
    Method(Arc<MethodEntry>),
    /// Lookup found nothing callable. Only installed by `respond_to?` sites.
    NotFound,
}

impl CachedTarget {
    #[inline]
    pub fn method(&self) -> Option<&Arc<MethodEntry>> {
        match self {
            CachedTarget::Method(entry) => Some(entry),
            CachedTarget::NotFound => None,
        }
    }
}

/// One guarded specialization. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    guard: CacheGuard,
    target: CachedTarget,
    /// Generation of the guarded class when the lookup began.
    generation: u64,
}

impl CacheEntry {
    pub fn new(guard: CacheGuard, target: CachedTarget, generation: u64) -> Self {
        Self {
            guard,
            target,
            generation,
        }
    }

    #[inline]
    pub fn guard(&self) -> CacheGuard {
        self.guard
    }

    #[inline]
    pub fn target(&self) -> &CachedTarget {
        &self.target
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Check if the guard holds for `class` and `name`.
    #[inline(always)]
    pub fn matches(&self, class: ClassId, name: Symbol) -> bool {
        self.guard.class == class && self.guard.name == name
    }

    /// Check if the entry is still valid at `current` generation.
    #[inline(always)]
    pub fn is_fresh(&self, current: u64) -> bool {
        self.generation == current
    }
}

/// Chain storage; four entries stay inline.
pub type CacheChain = SmallVec<[CacheEntry; 4]>;

// =============================================================================
// State
// =============================================================================

/// Coarse state of a call site, for stats and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheStateKind {
    Empty,
    Monomorphic,
    Polymorphic,
    Megamorphic,
}

impl fmt::Display for CacheStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheStateKind::Empty => "empty",
            CacheStateKind::Monomorphic => "monomorphic",
            CacheStateKind::Polymorphic => "polymorphic",
            CacheStateKind::Megamorphic => "megamorphic",
        })
    }
}

/// Cache state of one call site.
#[derive(Debug, Clone, Default)]
pub enum CacheState {
    #[default]
    Empty,
    Monomorphic(CacheEntry),
    /// Two or more entries in insertion order.
    Polymorphic(CacheChain),
    /// Too many receiver classes; every call goes uncached.
    Megamorphic,
}

impl CacheState {
    #[inline]
    pub fn kind(&self) -> CacheStateKind {
        match self {
            CacheState::Empty => CacheStateKind::Empty,
            CacheState::Monomorphic(_) => CacheStateKind::Monomorphic,
            CacheState::Polymorphic(_) => CacheStateKind::Polymorphic,
            CacheState::Megamorphic => CacheStateKind::Megamorphic,
        }
    }

    /// Entries in insertion order.
    #[inline]
    pub fn entries(&self) -> &[CacheEntry] {
        match self {
            CacheState::Empty | CacheState::Megamorphic => &[],
            CacheState::Monomorphic(entry) => std::slice::from_ref(entry),
            CacheState::Polymorphic(chain) => chain,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    #[inline]
    pub fn is_megamorphic(&self) -> bool {
        matches!(self, CacheState::Megamorphic)
    }

    /// First entry whose guard holds, in insertion order.
    #[inline]
    pub fn find_entry(&self, class: ClassId, name: Symbol) -> Option<&CacheEntry> {
        self.entries().iter().find(|entry| entry.matches(class, name))
    }

    fn from_chain(chain: CacheChain) -> Self {
        match chain.len() {
            0 => CacheState::Empty,
            1 => chain
                .into_iter()
                .next()
                .map_or(CacheState::Empty, CacheState::Monomorphic),
            _ => CacheState::Polymorphic(chain),
        }
    }

    /// Drop entries whose class has moved past their generation.
    ///
    /// `current` returns the guarded class's generation, or `None` if the
    /// class no longer exists.
    pub fn retain_fresh<F>(&self, current: F) -> CacheState
    where
        F: Fn(ClassId) -> Option<u64>,
    {
        if self.is_megamorphic() {
            return CacheState::Megamorphic;
        }
        let chain: CacheChain = self
            .entries()
            .iter()
            .filter(|entry| current(entry.guard.class).is_some_and(|g| entry.is_fresh(g)))
            .cloned()
            .collect();
        Self::from_chain(chain)
    }

    /// Append `entry`, or degrade when the chain already holds `limit`
    /// entries.
    ///
    /// An entry with the same guard wins over `entry`, so two threads
    /// installing the same miss leave one entry behind.
    pub fn with_entry(&self, entry: CacheEntry, limit: usize) -> CacheState {
        if self.is_megamorphic() {
            return CacheState::Megamorphic;
        }
        if self.find_entry(entry.guard.class, entry.guard.name).is_some() {
            return self.clone();
        }
        if self.len() >= limit {
            return CacheState::Megamorphic;
        }
        let mut chain: CacheChain = self.entries().iter().cloned().collect();
        chain.push(entry);
        Self::from_chain(chain)
    }
}
