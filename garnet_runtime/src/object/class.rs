//! Module and class records.
//!
//! A [`ModuleRecord`] represents a class, a module, or a singleton class.
//! It owns its method table and a generation stamp. The stamp changes
//! whenever anything that can affect a lookup rooted at this record
//! changes: a method table write on the record itself or on any of its
//! ancestors, or a change to the ancestor chain.
//!
//! # Thread Safety
//!
//! Reads of the method table take a shared `RwLock`; the generation is an
//! atomic read with acquire ordering. Writes go through
//! [`ClassArena`](super::registry::ClassArena), which serializes them under
//! its definition lock and publishes the new generation with release
//! ordering after the table write.

use crate::object::method::MethodEntry;
use crate::symbol::Symbol;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

// =============================================================================
// Class ID
// =============================================================================

/// Stable index of a module record in its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

// =============================================================================
// Class Flags
// =============================================================================

bitflags::bitflags! {
    /// Flags describing a module record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ClassFlags: u32 {
        /// Record is a module (includable, not instantiable).
        const MODULE = 1 << 0;
        /// Record is a singleton class attached to one receiver.
        const SINGLETON = 1 << 1;
        /// Instances are immediates and cannot carry singleton classes.
        const IMMEDIATE = 1 << 2;
        /// Marker class for values from the interop boundary.
        const FOREIGN = 1 << 3;
    }
}

/// Included modules, in inclusion order.
pub type Includes = SmallVec<[ClassId; 4]>;

/// Linearized ancestor list (self first).
pub type Ancestors = Arc<[ClassId]>;

#[derive(Debug)]
struct CachedAncestors {
    epoch: u64,
    list: Ancestors,
}

// =============================================================================
// Module Record
// =============================================================================

/// A class, module, or singleton class.
#[derive(Debug)]
pub struct ModuleRecord {
    id: ClassId,
    name: Arc<str>,
    flags: ClassFlags,
    superclass: RwLock<Option<ClassId>>,
    includes: RwLock<Includes>,
    methods: RwLock<FxHashMap<Symbol, Arc<MethodEntry>>>,
    generation: AtomicU64,
    ancestors: RwLock<Option<CachedAncestors>>,
    /// Singleton class of this module when it is used as a receiver.
    singleton: OnceLock<ClassId>,
}

impl ModuleRecord {
    pub(crate) fn new(
        id: ClassId,
        name: Arc<str>,
        flags: ClassFlags,
        superclass: Option<ClassId>,
        generation: u64,
    ) -> Self {
        Self {
            id,
            name,
            flags,
            superclass: RwLock::new(superclass),
            includes: RwLock::new(Includes::new()),
            methods: RwLock::new(FxHashMap::default()),
            generation: AtomicU64::new(generation),
            ancestors: RwLock::new(None),
            singleton: OnceLock::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn id(&self) -> ClassId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn flags(&self) -> ClassFlags {
        self.flags
    }

    #[inline]
    pub fn is_module(&self) -> bool {
        self.flags.contains(ClassFlags::MODULE)
    }

    #[inline]
    pub fn is_singleton(&self) -> bool {
        self.flags.contains(ClassFlags::SINGLETON)
    }

    #[inline]
    pub fn superclass(&self) -> Option<ClassId> {
        *self.superclass.read()
    }

    /// Included modules in inclusion order.
    pub fn includes(&self) -> Includes {
        self.includes.read().clone()
    }

    /// Singleton class of this module, if one has been created.
    #[inline]
    pub fn singleton_class(&self) -> Option<ClassId> {
        self.singleton.get().copied()
    }

    pub(crate) fn singleton_slot(&self) -> &OnceLock<ClassId> {
        &self.singleton
    }

    // =========================================================================
    // Method Table (read side)
    // =========================================================================

    /// Look up `name` in this record's own table only.
    #[inline]
    pub fn lookup_raw(&self, name: Symbol) -> Option<Arc<MethodEntry>> {
        self.methods.read().get(&name).cloned()
    }

    /// Check if this record's own table has an entry (tombstones included).
    #[inline]
    pub fn defines(&self, name: Symbol) -> bool {
        self.methods.read().contains_key(&name)
    }

    /// Current generation stamp.
    #[inline]
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    // =========================================================================
    // Write side (arena only)
    // =========================================================================

    pub(crate) fn insert_method(&self, entry: Arc<MethodEntry>) {
        self.methods.write().insert(entry.name(), entry);
    }

    pub(crate) fn remove_method(&self, name: Symbol) -> Option<Arc<MethodEntry>> {
        self.methods.write().remove(&name)
    }

    pub(crate) fn set_superclass(&self, superclass: Option<ClassId>) {
        *self.superclass.write() = superclass;
    }

    pub(crate) fn push_include(&self, module: ClassId) {
        self.includes.write().push(module);
    }

    pub(crate) fn publish_generation(&self, generation: u64) {
        self.generation.store(generation, Ordering::Release);
    }

    pub(crate) fn cached_ancestors(&self, epoch: u64) -> Option<Ancestors> {
        self.ancestors
            .read()
            .as_ref()
            .filter(|cached| cached.epoch == epoch)
            .map(|cached| cached.list.clone())
    }

    pub(crate) fn store_ancestors(&self, epoch: u64, list: Ancestors) {
        *self.ancestors.write() = Some(CachedAncestors { epoch, list });
    }
}
