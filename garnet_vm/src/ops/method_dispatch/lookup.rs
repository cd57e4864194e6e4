//! Method resolution along the ancestor chain.
//!
//! One walk, two filters. [`MethodLookup::walk`] finds the first entry for a
//! name in the effective class's ancestors (self, included modules in
//! reverse inclusion order, superclass chain). [`MethodLookup::lookup`] then
//! applies the call site's visibility filter;
//! [`MethodLookup::lookup_ignoring_visibility`] does not.
//!
//! An `undef_method` tombstone stops the walk: the name is undefined for
//! this class even if an ancestor further up defines it.

use super::config::DispatchConfiguration;
use super::method_cache::MethodCache;
use garnet_runtime::{ClassArena, ClassId, MethodEntry, Symbol, Visibility};
use std::sync::Arc;

/// Result of the raw ancestor walk.
#[derive(Debug, Clone)]
pub enum WalkResult {
    /// First entry found is callable.
    Defined(Arc<MethodEntry>),
    /// First entry found is a tombstone.
    Undefined,
    /// No ancestor has an entry.
    Absent,
}

/// Result of a visibility-filtered lookup.
#[derive(Debug, Clone)]
pub enum LookupResult {
    Found(Arc<MethodEntry>),
    /// A method exists but the configuration's visibility filter rejects it.
    Hidden(Arc<MethodEntry>),
    Undefined,
    Absent,
}

impl LookupResult {
    #[inline]
    pub fn found(self) -> Option<Arc<MethodEntry>> {
        match self {
            LookupResult::Found(entry) => Some(entry),
            _ => None,
        }
    }

    #[inline]
    pub fn is_found(&self) -> bool {
        matches!(self, LookupResult::Found(_))
    }
}

/// Resolves names against the class arena, optionally through a
/// [`MethodCache`].
#[derive(Clone, Copy)]
pub struct MethodLookup<'a> {
    classes: &'a ClassArena,
    cache: Option<&'a MethodCache>,
}

impl<'a> MethodLookup<'a> {
    pub fn new(classes: &'a ClassArena, cache: Option<&'a MethodCache>) -> Self {
        Self { classes, cache }
    }

    /// First entry for `name` in the ancestors of `class`.
    pub fn walk(&self, class: ClassId, name: Symbol) -> WalkResult {
        let Some(cache) = self.cache else {
            return self.walk_uncached(class, name);
        };
        let Some(record) = self.classes.get(class) else {
            return WalkResult::Absent;
        };

        // Read before walking: a concurrent redefinition then makes this
        // entry stale instead of wrongly current.
        let generation = record.current_generation();
        if let Some(result) = cache.get(class, name, generation) {
            return result;
        }
        let result = self.walk_uncached(class, name);
        cache.insert(class, name, generation, result.clone());
        result
    }

    fn walk_uncached(&self, class: ClassId, name: Symbol) -> WalkResult {
        for &ancestor in self.classes.ancestors(class).iter() {
            let Some(record) = self.classes.get(ancestor) else {
                continue;
            };
            if let Some(entry) = record.lookup_raw(name) {
                return if entry.is_undefined() {
                    WalkResult::Undefined
                } else {
                    WalkResult::Defined(entry)
                };
            }
        }
        WalkResult::Absent
    }

    /// Resolve `name` under `config`'s visibility filter.
    pub fn lookup(&self, class: ClassId, name: Symbol, config: &DispatchConfiguration) -> LookupResult {
        Self::filter(self.walk(class, name), |visibility| config.allows(visibility))
    }

    /// Resolve `name` regardless of visibility.
    pub fn lookup_ignoring_visibility(&self, class: ClassId, name: Symbol) -> LookupResult {
        Self::filter(self.walk(class, name), |_| true)
    }

    #[inline]
    fn filter<F>(walk: WalkResult, visible: F) -> LookupResult
    where
        F: Fn(Visibility) -> bool,
    {
        match walk {
            WalkResult::Defined(entry) if visible(entry.visibility()) => LookupResult::Found(entry),
            WalkResult::Defined(entry) => LookupResult::Hidden(entry),
            WalkResult::Undefined => LookupResult::Undefined,
            WalkResult::Absent => LookupResult::Absent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garnet_runtime::{CallTarget, CoreLibrary, Value, intern};

    struct Fixture {
        arena: ClassArena,
        core: CoreLibrary,
        cache: MethodCache,
    }

    fn fixture() -> Fixture {
        let arena = ClassArena::new();
        let core = CoreLibrary::bootstrap(&arena).unwrap();
        Fixture {
            arena,
            core,
            cache: MethodCache::new(),
        }
    }

    fn constant(i: i64) -> CallTarget {
        CallTarget::constant(Value::Integer(i))
    }

    #[test]
    fn test_most_specific_wins() {
        let f = fixture();
        let base = f.arena.define_class("Base", Some(f.core.object));
        let derived = f.arena.define_class("Derived", Some(base));
        let name = intern("who");
        f.arena.define_method(base, name, Visibility::Public, constant(1)).unwrap();
        let own = f.arena.define_method(derived, name, Visibility::Public, constant(2)).unwrap();

        let lookup = MethodLookup::new(&f.arena, None);
        let found = lookup.lookup(derived, name, &DispatchConfiguration::PUBLIC).found().unwrap();
        assert!(Arc::ptr_eq(&found, &own));
    }

    #[test]
    fn test_included_module_beats_superclass() {
        let f = fixture();
        let base = f.arena.define_class("Base", Some(f.core.object));
        let mixin = f.arena.define_module("Mixin");
        let derived = f.arena.define_class("Derived", Some(base));
        f.arena.include_module(derived, mixin).unwrap();
        let name = intern("greet");
        f.arena.define_method(base, name, Visibility::Public, constant(1)).unwrap();
        let from_mixin = f.arena.define_method(mixin, name, Visibility::Public, constant(2)).unwrap();

        let lookup = MethodLookup::new(&f.arena, None);
        let found = lookup.lookup_ignoring_visibility(derived, name).found().unwrap();
        assert!(Arc::ptr_eq(&found, &from_mixin));
    }

    #[test]
    fn test_private_is_hidden_unless_ignoring_visibility() {
        let f = fixture();
        let c = f.arena.define_class("C", Some(f.core.object));
        let name = intern("secret");
        f.arena.define_method(c, name, Visibility::Private, constant(1)).unwrap();

        let lookup = MethodLookup::new(&f.arena, None);
        let hidden = lookup.lookup(c, name, &DispatchConfiguration::PUBLIC);
        assert!(matches!(hidden, LookupResult::Hidden(ref entry) if entry.visibility() == Visibility::Private));
        assert!(lookup.lookup(c, name, &DispatchConfiguration::PRIVATE).is_found());
    }

    #[test]
    fn test_protected_visible_to_protected_config() {
        let f = fixture();
        let c = f.arena.define_class("C", Some(f.core.object));
        let name = intern("guarded");
        f.arena.define_method(c, name, Visibility::Protected, constant(1)).unwrap();

        let lookup = MethodLookup::new(&f.arena, None);
        let public = lookup.lookup(c, name, &DispatchConfiguration::PUBLIC);
        assert!(matches!(public, LookupResult::Hidden(ref entry) if entry.visibility() == Visibility::Protected));
        assert!(lookup.lookup(c, name, &DispatchConfiguration::PROTECTED).is_found());
    }

    #[test]
    fn test_tombstone_is_distinct_from_absence() {
        let f = fixture();
        let base = f.arena.define_class("Base", Some(f.core.object));
        let derived = f.arena.define_class("Derived", Some(base));
        let name = intern("gone");
        f.arena.define_method(base, name, Visibility::Public, constant(1)).unwrap();
        f.arena.undef_method(derived, name).unwrap();

        let lookup = MethodLookup::new(&f.arena, None);
        assert!(matches!(lookup.lookup_ignoring_visibility(derived, name), LookupResult::Undefined));
        assert!(lookup.lookup_ignoring_visibility(base, name).is_found());
        assert!(matches!(
            lookup.lookup_ignoring_visibility(derived, intern("never_defined")),
            LookupResult::Absent
        ));
    }

    #[test]
    fn test_cached_walk_matches_uncached_and_invalidates() {
        let f = fixture();
        let c = f.arena.define_class("C", Some(f.core.object));
        let name = intern("value");
        let first = f.arena.define_method(c, name, Visibility::Public, constant(1)).unwrap();

        let cached = MethodLookup::new(&f.arena, Some(&f.cache));
        let plain = MethodLookup::new(&f.arena, None);
        let a = cached.lookup_ignoring_visibility(c, name).found().unwrap();
        let b = cached.lookup_ignoring_visibility(c, name).found().unwrap();
        assert!(Arc::ptr_eq(&a, &first));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(f.cache.stats().0, 1);

        let second = f.arena.define_method(c, name, Visibility::Public, constant(2)).unwrap();
        let c1 = cached.lookup_ignoring_visibility(c, name).found().unwrap();
        let c2 = plain.lookup_ignoring_visibility(c, name).found().unwrap();
        assert!(Arc::ptr_eq(&c1, &second));
        assert!(Arc::ptr_eq(&c2, &second));
    }
}
