//! Class arena: module records indexed by stable IDs.
//!
//! Every method-table and hierarchy mutation goes through this type. Writes
//! are serialized by one definition lock and each publishes a fresh value of
//! the global generation counter:
//!
//! - A method-table write on module `M` stamps `M` and every record whose
//!   ancestor list contains `M`. Unrelated classes keep their stamp, so
//!   their caches stay warm.
//! - An ancestry change (`include`, superclass reassignment) advances the
//!   hierarchy epoch and stamps every record.
//!
//! Readers never lock for staleness checks: a cache compares the stamp it
//! recorded at install time with [`ModuleRecord::current_generation`].

use crate::error::{RubyError, RubyResult};
use crate::object::ancestors::{linearize, would_cycle};
use crate::object::class::{Ancestors, ClassFlags, ClassId, ModuleRecord};
use crate::object::instance::RObject;
use crate::object::method::{CallTarget, MethodEntry, MethodFlags, Visibility};
use crate::symbol::Symbol;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Arena of module records.
pub struct ClassArena {
    /// Records indexed by `ClassId`.
    classes: RwLock<Vec<Arc<ModuleRecord>>>,
    /// Global method-table generation; strictly increases on every write.
    generation: AtomicU64,
    /// Advances whenever any ancestor chain may have changed.
    hierarchy_epoch: AtomicU64,
    /// Serializes all method-table and hierarchy writes.
    definition_lock: Mutex<()>,
}

impl ClassArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self {
            classes: RwLock::new(Vec::new()),
            generation: AtomicU64::new(1),
            hierarchy_epoch: AtomicU64::new(1),
            definition_lock: Mutex::new(()),
        }
    }

    // =========================================================================
    // Read Access
    // =========================================================================

    /// Look up a record by ID.
    #[inline]
    pub fn get(&self, id: ClassId) -> Option<Arc<ModuleRecord>> {
        self.classes.read().get(id.index()).cloned()
    }

    /// Look up a record that must exist.
    pub fn record(&self, id: ClassId) -> RubyResult<Arc<ModuleRecord>> {
        self.get(id).ok_or_else(|| {
            RubyError::InternalInvariantViolation(format!("unknown class id {}", id.raw()))
        })
    }

    /// Name of a record, for diagnostics.
    pub fn name_of(&self, id: ClassId) -> String {
        self.get(id)
            .map(|record| record.name().to_string())
            .unwrap_or_else(|| format!("#<Class:{}>", id.raw()))
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    /// Check if the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current global method-table generation.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Current hierarchy epoch.
    #[inline]
    pub fn hierarchy_epoch(&self) -> u64 {
        self.hierarchy_epoch.load(Ordering::Acquire)
    }

    /// Linearized ancestors of `id`, self first.
    ///
    /// Cached on the record for the current hierarchy epoch.
    pub fn ancestors(&self, id: ClassId) -> Ancestors {
        let epoch = self.hierarchy_epoch();
        let Some(record) = self.get(id) else {
            return Arc::from(Vec::new());
        };
        if let Some(list) = record.cached_ancestors(epoch) {
            return list;
        }
        let list: Ancestors = Arc::from(linearize(self, &record));
        record.store_ancestors(epoch, list.clone());
        list
    }

    /// Whether `module` appears in the ancestors of `class`.
    pub fn is_ancestor(&self, class: ClassId, module: ClassId) -> bool {
        self.ancestors(class).contains(&module)
    }

    /// First entry for `name` along the ancestors of `class`, tombstones
    /// included.
    fn resolve_in_ancestors(&self, class: ClassId, name: Symbol) -> Option<Arc<MethodEntry>> {
        self.ancestors(class)
            .iter()
            .find_map(|&ancestor| self.get(ancestor).and_then(|r| r.lookup_raw(name)))
    }

    // =========================================================================
    // Record Creation
    // =========================================================================

    /// Define a class.
    pub fn define_class(&self, name: &str, superclass: Option<ClassId>) -> ClassId {
        self.define_with_flags(name, superclass, ClassFlags::empty())
    }

    /// Define a module.
    pub fn define_module(&self, name: &str) -> ClassId {
        self.define_with_flags(name, None, ClassFlags::MODULE)
    }

    /// Define a record with explicit flags.
    ///
    /// A new record cannot appear in any existing ancestor list, so no
    /// generation is published.
    pub fn define_with_flags(
        &self,
        name: &str,
        superclass: Option<ClassId>,
        flags: ClassFlags,
    ) -> ClassId {
        self.create(Arc::from(name), superclass, flags)
    }

    fn create(&self, name: Arc<str>, superclass: Option<ClassId>, flags: ClassFlags) -> ClassId {
        let mut classes = self.classes.write();
        let id = ClassId::from_raw(classes.len() as u32);
        classes.push(Arc::new(ModuleRecord::new(
            id,
            name,
            flags,
            superclass,
            self.generation(),
        )));
        id
    }

    /// Singleton class of an instance, created on first request.
    pub fn singleton_class_for_object<F>(&self, object: &RObject, name: F) -> ClassId
    where
        F: FnOnce() -> String,
    {
        if let Some(id) = object.singleton_class() {
            return id;
        }
        let _guard = self.definition_lock.lock();
        *object.singleton_slot().get_or_init(|| {
            let id = self.create(Arc::from(name()), Some(object.class()), ClassFlags::SINGLETON);
            debug!(singleton = id.raw(), class = object.class().raw(), "attached singleton class");
            id
        })
    }

    /// Singleton class (metaclass) of a module, created on first request.
    ///
    /// The caller picks `superclass` so that class methods inherit along the
    /// superclass chain.
    pub fn singleton_class_for_module(
        &self,
        module: ClassId,
        superclass: ClassId,
    ) -> RubyResult<ClassId> {
        let record = self.record(module)?;
        if let Some(id) = record.singleton_class() {
            return Ok(id);
        }
        let _guard = self.definition_lock.lock();
        Ok(*record.singleton_slot().get_or_init(|| {
            let name = format!("#<Class:{}>", record.name());
            let id = self.create(Arc::from(name), Some(superclass), ClassFlags::SINGLETON);
            debug!(singleton = id.raw(), module = module.raw(), "attached metaclass");
            id
        }))
    }

    // =========================================================================
    // Method Table Writes
    // =========================================================================

    /// Define (or redefine) a public-API method on `owner`.
    pub fn define_method(
        &self,
        owner: ClassId,
        name: Symbol,
        visibility: Visibility,
        target: CallTarget,
    ) -> RubyResult<Arc<MethodEntry>> {
        self.define_method_with_flags(owner, name, visibility, target, MethodFlags::empty())
    }

    /// Define (or redefine) a method with explicit flags.
    pub fn define_method_with_flags(
        &self,
        owner: ClassId,
        name: Symbol,
        visibility: Visibility,
        target: CallTarget,
        flags: MethodFlags,
    ) -> RubyResult<Arc<MethodEntry>> {
        let record = self.record(owner)?;
        let _guard = self.definition_lock.lock();
        let generation = self.next_generation();
        let entry = Arc::new(MethodEntry::new(name, owner, visibility, target, flags, generation));
        record.insert_method(entry.clone());
        self.publish_method_change(owner, generation);
        Ok(entry)
    }

    /// Remove `owner`'s own entry for `name`; lookup continues to ancestors.
    pub fn remove_method(&self, owner: ClassId, name: Symbol) -> RubyResult<()> {
        let record = self.record(owner)?;
        let _guard = self.definition_lock.lock();
        if record.remove_method(name).is_none() {
            return Err(RubyError::NameError {
                name,
                message: format!("method '{}' not defined in {}", name, record.name()),
            });
        }
        let generation = self.next_generation();
        self.publish_method_change(owner, generation);
        Ok(())
    }

    /// Install an `undef_method` tombstone for `name` on `owner`.
    pub fn undef_method(&self, owner: ClassId, name: Symbol) -> RubyResult<()> {
        let record = self.record(owner)?;
        let _guard = self.definition_lock.lock();
        match self.resolve_in_ancestors(owner, name) {
            Some(entry) if !entry.is_undefined() => {}
            _ => return Err(RubyError::undefined_method_in(name, record.name())),
        }
        let generation = self.next_generation();
        record.insert_method(Arc::new(MethodEntry::undefined(name, owner, generation)));
        self.publish_method_change(owner, generation);
        Ok(())
    }

    /// Copy the method reachable as `old_name` to `new_name` on `owner`.
    pub fn alias_method(&self, owner: ClassId, new_name: Symbol, old_name: Symbol) -> RubyResult<()> {
        let record = self.record(owner)?;
        let _guard = self.definition_lock.lock();
        let original = match self.resolve_in_ancestors(owner, old_name) {
            Some(entry) if !entry.is_undefined() => entry,
            _ => return Err(RubyError::undefined_method_in(old_name, record.name())),
        };
        let generation = self.next_generation();
        record.insert_method(Arc::new(original.aliased(new_name, owner, generation)));
        self.publish_method_change(owner, generation);
        Ok(())
    }

    /// Change the visibility of `name` as seen through `owner`.
    ///
    /// An inherited method gets a copy in `owner` with the new visibility;
    /// the ancestor's entry is untouched.
    pub fn set_visibility(&self, owner: ClassId, name: Symbol, visibility: Visibility) -> RubyResult<()> {
        let record = self.record(owner)?;
        let _guard = self.definition_lock.lock();
        let existing = match self.resolve_in_ancestors(owner, name) {
            Some(entry) if !entry.is_undefined() => entry,
            _ => return Err(RubyError::undefined_method_in(name, record.name())),
        };
        let generation = self.next_generation();
        record.insert_method(Arc::new(existing.with_visibility(owner, visibility, generation)));
        self.publish_method_change(owner, generation);
        Ok(())
    }

    // =========================================================================
    // Hierarchy Writes
    // =========================================================================

    /// Include `module` into `target`.
    pub fn include_module(&self, target: ClassId, module: ClassId) -> RubyResult<()> {
        let target_record = self.record(target)?;
        let module_record = self.record(module)?;
        if !module_record.is_module() {
            return Err(RubyError::TypeError(format!(
                "wrong argument type {} (expected Module)",
                module_record.name()
            )));
        }

        let _guard = self.definition_lock.lock();
        if self.is_ancestor(target, module) {
            return Ok(());
        }
        if would_cycle(self, target, module) {
            return Err(RubyError::ArgumentError("cyclic include detected".into()));
        }
        target_record.push_include(module);
        self.publish_hierarchy_change();
        Ok(())
    }

    /// Reassign the superclass of `class`.
    pub fn set_superclass(&self, class: ClassId, superclass: ClassId) -> RubyResult<()> {
        let record = self.record(class)?;
        let super_record = self.record(superclass)?;
        if record.is_module() || super_record.is_module() {
            return Err(RubyError::TypeError(format!(
                "superclass must be a Class ({} given)",
                super_record.name()
            )));
        }

        let _guard = self.definition_lock.lock();
        if would_cycle(self, class, superclass) {
            return Err(RubyError::ArgumentError(format!(
                "superclass {} would create a cycle",
                super_record.name()
            )));
        }
        record.set_superclass(Some(superclass));
        self.publish_hierarchy_change();
        Ok(())
    }

    // =========================================================================
    // Generation Publishing (definition lock held)
    // =========================================================================

    fn next_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire) + 1
    }

    /// Stamp `owner` and every record that inherits from or includes it.
    fn publish_method_change(&self, owner: ClassId, generation: u64) {
        self.generation.store(generation, Ordering::Release);

        // Snapshot: `ancestors` re-enters the classes lock.
        let classes: Vec<Arc<ModuleRecord>> = self.classes.read().clone();
        let mut stamped = 0usize;
        for record in &classes {
            if record.id() == owner || self.ancestors(record.id()).contains(&owner) {
                record.publish_generation(generation);
                stamped += 1;
            }
        }
        trace!(owner = owner.raw(), generation, stamped, "published method table change");
    }

    /// Advance the hierarchy epoch and stamp every record.
    fn publish_hierarchy_change(&self) {
        let epoch = self.hierarchy_epoch.fetch_add(1, Ordering::AcqRel) + 1;
        let generation = self.next_generation();
        self.generation.store(generation, Ordering::Release);

        let classes: Vec<Arc<ModuleRecord>> = self.classes.read().clone();
        for record in &classes {
            record.publish_generation(generation);
        }
        debug!(epoch, generation, classes = classes.len(), "global invalidation after hierarchy change");
    }
}

impl Default for ClassArena {
    fn default() -> Self {
        Self::new()
    }
}
