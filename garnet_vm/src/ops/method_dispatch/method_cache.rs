//! Class-level lookup cache.
//!
//! Resolving a name walks the receiver's ancestor list, which is linear in
//! hierarchy depth. This cache memoizes the walk per `(class, name)` pair so
//! call sites on different lines, and sites that have gone megamorphic,
//! share resolution work.
//!
//! # Cache Hierarchy
//!
//! 1. **Call-site cache** - per site, guard chain
//! 2. **Lookup cache (this)** - per context, keyed by class and name
//! 3. **Ancestor walk** - full lookup, populates caches
//!
//! # Invalidation
//!
//! Entries are stamped with the class generation observed before the walk.
//! A lookup presenting a different generation is a miss, so redefinition
//! never needs to find and evict entries. Stale entries are overwritten on
//! the next insert.
//!
//! # Thread Safety
//!
//! Uses `parking_lot::RwLock` for concurrent reads with exclusive inserts.

use super::lookup::WalkResult;
use garnet_runtime::{ClassId, Symbol};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};

type CacheKey = (ClassId, Symbol);

#[derive(Debug, Clone)]
struct CachedWalk {
    generation: u64,
    result: WalkResult,
}

/// Per-context memo of ancestor walks.
pub struct MethodCache {
    cache: RwLock<FxHashMap<CacheKey, CachedWalk>>,

    /// Cache hit counter
    hits: AtomicU64,

    /// Cache miss counter (absent and stale)
    misses: AtomicU64,

    /// Lookups that found an entry from an older generation
    invalidations: AtomicU64,
}

impl MethodCache {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(FxHashMap::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Cached walk for `(class, name)` if it was recorded at `generation`.
    #[inline]
    pub fn get(&self, class: ClassId, name: Symbol, generation: u64) -> Option<WalkResult> {
        let guard = self.cache.read();
        match guard.get(&(class, name)) {
            Some(cached) if cached.generation == generation => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(cached.result.clone())
            }
            Some(_) => {
                self.invalidations.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Record a walk performed at `generation`.
    ///
    /// A newer entry already present is kept.
    pub fn insert(&self, class: ClassId, name: Symbol, generation: u64, result: WalkResult) {
        let mut guard = self.cache.write();
        match guard.get(&(class, name)) {
            Some(existing) if existing.generation > generation => {}
            _ => {
                guard.insert((class, name), CachedWalk { generation, result });
            }
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.cache.write().clear();
    }

    /// `(hits, misses, invalidations)`.
    pub fn stats(&self) -> (u64, u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.invalidations.load(Ordering::Relaxed),
        )
    }

    /// Hit rate as a percentage; 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MethodCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garnet_runtime::intern;

    fn class(raw: u32) -> ClassId {
        ClassId::from_raw(raw)
    }

    #[test]
    fn test_miss_on_empty() {
        let cache = MethodCache::new();
        assert!(cache.get(class(1), intern("m"), 1).is_none());
        assert_eq!(cache.stats(), (0, 1, 0));
    }

    #[test]
    fn test_hit_at_same_generation() {
        let cache = MethodCache::new();
        cache.insert(class(1), intern("m"), 4, WalkResult::Absent);
        assert!(matches!(cache.get(class(1), intern("m"), 4), Some(WalkResult::Absent)));
        assert!(cache.get(class(2), intern("m"), 4).is_none());
        assert!(cache.get(class(1), intern("n"), 4).is_none());
    }

    #[test]
    fn test_generation_mismatch_is_invalidation() {
        let cache = MethodCache::new();
        cache.insert(class(1), intern("m"), 4, WalkResult::Absent);
        assert!(cache.get(class(1), intern("m"), 5).is_none());
        let (hits, misses, invalidations) = cache.stats();
        assert_eq!((hits, misses, invalidations), (0, 1, 1));
    }

    #[test]
    fn test_older_insert_does_not_replace_newer() {
        let cache = MethodCache::new();
        cache.insert(class(1), intern("m"), 6, WalkResult::Absent);
        cache.insert(class(1), intern("m"), 5, WalkResult::Absent);
        assert!(cache.get(class(1), intern("m"), 6).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_hit_rate_and_clear() {
        let cache = MethodCache::new();
        assert_eq!(cache.hit_rate(), 0.0);
        cache.get(class(1), intern("m"), 1);
        cache.insert(class(1), intern("m"), 1, WalkResult::Absent);
        cache.get(class(1), intern("m"), 1);
        assert!((cache.hit_rate() - 50.0).abs() < 0.1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
